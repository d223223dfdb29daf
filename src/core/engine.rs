use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use tracing::info;

pub struct IrEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> IrEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<String> {
        info!("Starting pipeline run");

        // Extract
        let model = self.pipeline.extract()?;
        info!(nodes = model.len(), "Model loaded");

        // Transform
        let result = self.pipeline.transform(model)?;
        info!(
            nodes = result.model.len(),
            passes = result.passes,
            converged = result.converged,
            outputs = result.outputs.len(),
            "Model transformed and evaluated"
        );

        // Load
        let output_path = self.pipeline.load(result)?;
        info!(path = %output_path, "Output saved");

        Ok(output_path)
    }
}
