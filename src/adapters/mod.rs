pub mod json_archive;

pub use json_archive::JsonArchive;
