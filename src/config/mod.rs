pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::{IrError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PASSES: usize = crate::core::refine::DEFAULT_MAX_PASSES;
pub const MAX_PASSES_LIMIT: usize = 64;
pub const DEFAULT_DEMO_WEIGHTS: [f64; 3] = [1.0, 2.0, 3.0];
pub const DEFAULT_DEMO_BIAS: f64 = 0.5;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "pipeline-ir")]
#[command(about = "Load, refine, evaluate and archive computation pipeline models")]
pub struct CliConfig {
    #[arg(long, help = "Model archive to load (builds the linear predictor model when omitted)")]
    pub model: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, help = "Refine high-level nodes into primitive nodes")]
    pub refine: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_PASSES)]
    pub max_passes: usize,

    #[arg(long, help = "Check that refined outputs equal the original outputs")]
    pub verify: bool,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub inputs: Vec<f64>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = DEFAULT_DEMO_WEIGHTS)]
    pub weights: Vec<f64>,

    #[arg(long, allow_hyphen_values = true, default_value_t = DEFAULT_DEMO_BIAS)]
    pub bias: f64,

    #[arg(long, help = "Print the description of every node before running")]
    pub describe: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn model_path(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn refine_enabled(&self) -> bool {
        self.refine
    }

    fn max_passes(&self) -> usize {
        self.max_passes
    }

    fn verify_refinement(&self) -> bool {
        self.verify
    }

    fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    fn demo_weights(&self) -> &[f64] {
        &self.weights
    }

    fn demo_bias(&self) -> f64 {
        self.bias
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_range("max_passes", self.max_passes, 1, MAX_PASSES_LIMIT)?;

        match &self.model {
            Some(model) => {
                validation::validate_path("model", model)?;
                validation::validate_file_extensions("model", std::slice::from_ref(model), &["json"])?;
            }
            None => validation::validate_positive_number("weights", self.weights.len(), 1)?,
        }

        if self.verify && !self.refine {
            return Err(IrError::ConfigValidationError {
                field: "verify".to_string(),
                message: "--verify requires --refine".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse_from(["pipeline-ir"]);
        assert_eq!(config.model_path(), None);
        assert_eq!(config.output_path(), "./output");
        assert_eq!(config.max_passes(), DEFAULT_MAX_PASSES);
        assert_eq!(config.demo_weights(), &DEFAULT_DEMO_WEIGHTS);
        assert!(config.inputs().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inputs_and_flags() {
        let config = CliConfig::parse_from([
            "pipeline-ir",
            "--refine",
            "--verify",
            "--inputs",
            "1,-2.5,3",
            "--bias",
            "-1",
        ]);
        assert!(config.refine_enabled());
        assert!(config.verify_refinement());
        assert_eq!(config.inputs(), &[1.0, -2.5, 3.0]);
        assert_eq!(config.demo_bias(), -1.0);
    }

    #[test]
    fn test_validation_errors() {
        let config = CliConfig::parse_from(["pipeline-ir", "--max-passes", "0"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["pipeline-ir", "--model", "model.xml"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verify_requires_refine() {
        let config = CliConfig::parse_from(["pipeline-ir", "--verify"]);
        assert!(matches!(
            config.validate(),
            Err(IrError::ConfigValidationError { .. })
        ));

        let config = CliConfig::parse_from(["pipeline-ir", "--refine", "--verify"]);
        assert!(config.validate().is_ok());
    }
}
