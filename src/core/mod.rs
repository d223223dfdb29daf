pub mod archive;
pub mod description;
pub mod engine;
pub mod evaluator;
pub mod graph;
pub mod refine;
pub mod registry;
pub mod transformer;

pub use crate::core::archive::{Archivable, ArchivedObject, Archiver, Unarchiver};
pub use crate::core::description::{Describable, ObjectDescription};
pub use crate::core::graph::Model;
pub use crate::core::transformer::ModelTransformer;
pub use crate::domain::ports::{ConfigProvider, Node, Pipeline, Storage};
pub use crate::utils::error::Result;
