use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Not found: {name}")]
    NotFound { name: String },

    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unknown type: {type_name}")]
    UnknownType { type_name: String },

    #[error("Cyclic reference: node {node} references node {referenced}, which is not inserted before it")]
    CyclicReference { node: usize, referenced: usize },

    #[error("Input node {node} has no bound value")]
    UnboundInput { node: usize },

    #[error("Compute error: {message}")]
    Compute { message: String },

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Value {value} does not fit in an archived {type_name}")]
    OutOfRange { value: String, type_name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

/// 錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Graph,
    Reflection,
    Archive,
    Configuration,
    System,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IrError {
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        IrError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        IrError::NotFound { name: name.into() }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        IrError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn transform(message: impl Into<String>) -> Self {
        IrError::Transform {
            message: message.into(),
        }
    }

    pub fn compute(message: impl Into<String>) -> Self {
        IrError::Compute {
            message: message.into(),
        }
    }

    pub fn out_of_range(value: impl ToString, type_name: impl Into<String>) -> Self {
        IrError::OutOfRange {
            value: value.to_string(),
            type_name: type_name.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IrError::DimensionMismatch { .. }
            | IrError::CyclicReference { .. }
            | IrError::UnboundInput { .. }
            | IrError::Compute { .. }
            | IrError::Transform { .. } => ErrorCategory::Graph,
            IrError::NotFound { .. } | IrError::TypeMismatch { .. } => ErrorCategory::Reflection,
            IrError::UnknownType { .. }
            | IrError::OutOfRange { .. }
            | IrError::SerializationError(_) => ErrorCategory::Archive,
            IrError::ConfigError { .. }
            | IrError::ConfigValidationError { .. }
            | IrError::InvalidConfigValueError { .. }
            | IrError::MissingConfigError { .. } => ErrorCategory::Configuration,
            IrError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            IrError::UnboundInput { .. } => ErrorSeverity::Medium,
            IrError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            IrError::DimensionMismatch { .. } => {
                "Check that connected port sizes agree with the node's expected dimension"
            }
            IrError::NotFound { .. } => "Check the property or port name",
            IrError::TypeMismatch { .. } => "Check the element type of the connected ports or stored values",
            IrError::UnknownType { .. } => {
                "Register the node type in the serialization context before reading the archive"
            }
            IrError::CyclicReference { .. } => {
                "Nodes may only reference outputs of nodes inserted before them"
            }
            IrError::UnboundInput { .. } => "Provide input values with --inputs",
            IrError::Compute { .. } => "Check input values for overflow or division by zero",
            IrError::Transform { .. } => "Make sure every node maps all of its output ports",
            IrError::OutOfRange { .. } => "Keep stored integers within the 64-bit signed range",
            IrError::IoError(_) => "Check that the file exists and permissions are correct",
            IrError::SerializationError(_) => "Check that the archive is valid JSON produced by this tool",
            IrError::ConfigError { .. }
            | IrError::ConfigValidationError { .. }
            | IrError::InvalidConfigValueError { .. }
            | IrError::MissingConfigError { .. } => "Fix the configuration and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Graph => format!("Pipeline graph error: {}", self),
            ErrorCategory::Reflection => format!("Object description error: {}", self),
            ErrorCategory::Archive => format!("Archive error: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, IrError>;
