use crate::config::{DEFAULT_DEMO_BIAS, DEFAULT_DEMO_WEIGHTS, DEFAULT_MAX_PASSES, MAX_PASSES_LIMIT};
use crate::core::ConfigProvider;
use crate::utils::error::{IrError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub refine: RefineConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: Option<String>,
    pub demo: Option<DemoModelConfig>,
}

/// 沒有指定模型檔時建立的線性預測器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoModelConfig {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl Default for DemoModelConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_DEMO_WEIGHTS.to_vec(),
            bias: DEFAULT_DEMO_BIAS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefineConfig {
    pub enabled: Option<bool>,
    pub max_passes: Option<usize>,
    pub verify: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub inputs: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub model_file: Option<String>,
    pub report_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IrError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| IrError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        if config.model.path.is_none() && config.model.demo.is_none() {
            config.model.demo = Some(DemoModelConfig::default());
        }
        Ok(config)
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IrError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        // 驗證輸出路徑
        validation::validate_path("output.path", &self.output.path)?;
        if let Some(model_file) = &self.output.model_file {
            validation::validate_file_extensions("output.model_file", std::slice::from_ref(model_file), &["json"])?;
        }
        if let Some(report_file) = &self.output.report_file {
            validation::validate_file_extensions("output.report_file", std::slice::from_ref(report_file), &["json"])?;
        }

        // 驗證模型來源
        match (&self.model.path, &self.model.demo) {
            (Some(path), _) => {
                validation::validate_path("model.path", path)?;
                validation::validate_file_extensions("model.path", std::slice::from_ref(path), &["json"])?;
            }
            (None, Some(demo)) => {
                validation::validate_positive_number("model.demo.weights", demo.weights.len(), 1)?;
            }
            (None, None) => {
                return Err(IrError::MissingConfigError {
                    field: "model.path".to_string(),
                });
            }
        }

        validation::validate_range("refine.max_passes", self.max_passes(), 1, MAX_PASSES_LIMIT)?;

        if self.verify_refinement() && !self.refine_enabled() {
            return Err(IrError::ConfigValidationError {
                field: "refine.verify".to_string(),
                message: "verification requires refine.enabled = true".to_string(),
            });
        }

        Ok(())
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn model_path(&self) -> Option<&str> {
        self.model.path.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn refine_enabled(&self) -> bool {
        self.refine.enabled.unwrap_or(true)
    }

    fn max_passes(&self) -> usize {
        self.refine.max_passes.unwrap_or(DEFAULT_MAX_PASSES)
    }

    fn verify_refinement(&self) -> bool {
        self.refine.verify.unwrap_or(false)
    }

    fn inputs(&self) -> &[f64] {
        &self.evaluation.inputs
    }

    fn demo_weights(&self) -> &[f64] {
        self.model.demo.as_ref().map(|d| d.weights.as_slice()).unwrap_or(&[])
    }

    fn demo_bias(&self) -> f64 {
        self.model.demo.as_ref().map(|d| d.bias).unwrap_or(0.0)
    }

    fn model_file_name(&self) -> &str {
        self.output.model_file.as_deref().unwrap_or("model.json")
    }

    fn report_file_name(&self) -> &str {
        self.output.report_file.as_deref().unwrap_or("evaluation.json")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[pipeline]
name = "linear"
description = "Linear predictor lowering"
version = "1.0.0"

[model.demo]
weights = [1.0, 2.0, 3.0]
bias = 0.5

[refine]
enabled = true
max_passes = 4
verify = true

[evaluation]
inputs = [1.0, 1.0, 1.0]

[output]
path = "./test-output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "linear");
        assert_eq!(config.model_path(), None);
        assert_eq!(config.demo_weights(), &[1.0, 2.0, 3.0]);
        assert_eq!(config.demo_bias(), 0.5);
        assert_eq!(config.max_passes(), 4);
        assert!(config.verify_refinement());
        assert_eq!(config.inputs(), &[1.0, 1.0, 1.0]);
        assert_eq!(config.model_file_name(), "model.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_model_section_uses_demo_defaults() {
        let toml_content = r#"
[pipeline]
name = "defaults"
description = "defaults"
version = "1.0"

[output]
path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.demo_weights(), &DEFAULT_DEMO_WEIGHTS);
        assert!(config.refine_enabled());
        assert_eq!(config.max_passes(), DEFAULT_MAX_PASSES);
        assert!(!config.verbose());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PIPELINE_IR_TEST_MODEL_DIR", "/tmp/models");

        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[model]
path = "${PIPELINE_IR_TEST_MODEL_DIR}/model.json"

[output]
path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.model_path(), Some("/tmp/models/model.json"));

        std::env::remove_var("PIPELINE_IR_TEST_MODEL_DIR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[model]
path = "model.xml"

[output]
path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[refine]
enabled = false
verify = true

[output]
path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(IrError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"
description = "File test"
version = "1.0"

[output]
path = "./output"
report_file = "report.json"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
        assert_eq!(config.report_file_name(), "report.json");
    }
}
