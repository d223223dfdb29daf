pub mod archive_pipeline;

pub use archive_pipeline::{build_linear_predictor_model, ArchivePipeline, EvaluationReport};
