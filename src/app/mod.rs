pub mod math;
pub mod nodes;
pub mod pipelines;
pub mod predictors;
