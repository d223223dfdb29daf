pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::JsonArchive;
pub use app::pipelines::ArchivePipeline;
pub use core::{engine::IrEngine, Model, ModelTransformer, ObjectDescription};
pub use utils::error::{IrError, Result};
