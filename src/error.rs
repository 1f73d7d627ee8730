//! # Error Handling
//!
//! One error type for the whole sprite pipeline, carrying enough context to explain a
//! failed job to whoever submitted it.
//!
//! ## Architecture
//!
//! - **Error Types**: one variant per failure domain (configuration, presets, the external
//!   generator, layout, assembly, I/O, codecs, validation, job state)
//! - **Error Context**: timestamp, operation, free-form context, recovery suggestion,
//!   severity, metadata
//! - **Error Chaining**: wrapped library errors are exposed through `source()`
//!
//! ## Propagation
//!
//! Generator and assembly errors abort the job that raised them. Background removal never
//! produces an error at all: a strategy that fails is logged and the next one is tried.
//!
//! ## Usage
//!
//! ```rust
//! use sprite_forge::error::{HasRecoverySuggestion, SpriteError};
//!
//! let error = SpriteError::generator("bria", Some(401), "invalid api_token")
//!     .with_context("generating idle sheet")
//!     .with_recovery_suggestion("Check BRIA_API_KEY");
//!
//! assert_eq!(error.category(), "generator");
//! assert_eq!(error.recovery_suggestion(), Some("Check BRIA_API_KEY"));
//! ```

use std::{collections::HashMap, error::Error as StdError, fmt, path::Path, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that fail the current job
    Error,
    /// Errors that stop the process from doing any work (bad configuration)
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn fatal() -> Self {
        Self {
            severity: ErrorSeverity::Fatal,
            ..Self::default()
        }
    }
}

/// Base error type for the sprite pipeline
#[derive(Debug)]
pub enum SpriteError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Preset lookup or parsing errors
    Preset {
        name: String,
        reason: String,
        context: ErrorContext,
    },
    /// The external sheet generator failed or was unreachable
    Generator {
        provider: String,
        status: Option<u16>,
        reason: String,
        context: ErrorContext,
    },
    /// A sheet could not be partitioned into cells
    Layout {
        frame_count: u32,
        reason: String,
        context: ErrorContext,
    },
    /// Sheet, combined sheet or GIF could not be assembled
    Assembly {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Pixel processing errors
    Processing {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// Image decode/encode errors
    Image {
        operation: String,
        source: image::ImageError,
        context: ErrorContext,
    },
    /// Animation encoding errors
    Encode {
        format: String,
        reason: String,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Invalid job state transitions
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl SpriteError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::fatal(),
        }
    }

    /// Create a preset error
    pub fn preset(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Preset {
            name: name.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a generator error
    pub fn generator(
        provider: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Generator {
            provider: provider.into(),
            status,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a layout error
    pub fn layout(frame_count: u32, reason: impl Into<String>) -> Self {
        Self::Layout {
            frame_count,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an assembly error
    pub fn assembly(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Assembly {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a processing error
    pub fn processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(operation: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.display().to_string()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an image codec error
    pub fn image(operation: impl Into<String>, source: image::ImageError) -> Self {
        Self::Image {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an animation encoding error
    pub fn encode(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Preset { context, .. } => context,
            Self::Generator { context, .. } => context,
            Self::Layout { context, .. } => context,
            Self::Assembly { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Image { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Preset { context, .. } => context,
            Self::Generator { context, .. } => context,
            Self::Layout { context, .. } => context,
            Self::Assembly { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Image { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Preset { .. } => "preset",
            Self::Generator { .. } => "generator",
            Self::Layout { .. } => "layout",
            Self::Assembly { .. } => "assembly",
            Self::Processing { .. } => "processing",
            Self::Io { .. } => "io",
            Self::Image { .. } => "image",
            Self::Encode { .. } => "encode",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for SpriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpriteError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            SpriteError::Preset { name, reason, .. } => {
                write!(f, "Preset '{}' unusable: {}", name, reason)
            }
            SpriteError::Generator {
                provider,
                status,
                reason,
                ..
            } => {
                if let Some(status) = status {
                    write!(
                        f,
                        "Sheet generation via {} failed (HTTP {}): {}",
                        provider, status, reason
                    )
                } else {
                    write!(f, "Sheet generation via {} failed: {}", provider, reason)
                }
            }
            SpriteError::Layout {
                frame_count,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Cannot lay out {} frames on sheet: {}",
                    frame_count, reason
                )
            }
            SpriteError::Assembly {
                operation, reason, ..
            } => {
                write!(f, "Assembly failed during {}: {}", operation, reason)
            }
            SpriteError::Processing {
                operation, reason, ..
            } => {
                write!(f, "Processing failed during {}: {}", operation, reason)
            }
            SpriteError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            SpriteError::Image {
                operation, source, ..
            } => {
                write!(f, "Image error during {}: {}", operation, source)
            }
            SpriteError::Encode { format, reason, .. } => {
                write!(f, "{} encoding failed: {}", format, reason)
            }
            SpriteError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            SpriteError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            SpriteError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for SpriteError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Image { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type SpriteResult<T> = Result<T, SpriteError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for SpriteError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for SpriteError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

impl From<std::io::Error> for SpriteError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for SpriteError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for SpriteError {
    fn from(error: image::ImageError) -> Self {
        Self::image("unknown", error)
    }
}

impl From<gif::EncodingError> for SpriteError {
    fn from(error: gif::EncodingError) -> Self {
        Self::encode("gif", error.to_string())
    }
}

impl From<reqwest::Error> for SpriteError {
    fn from(error: reqwest::Error) -> Self {
        let status = error.status().map(|s| s.as_u16());
        Self::generator("http", status, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = SpriteError::config("edge_dominance_percent", "0", "must be in 1..=100");
        assert_eq!(error.category(), "config");
        assert_eq!(error.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn test_error_with_context() {
        let error = SpriteError::assembly("make_sheet", "no frames")
            .with_context("assembling run")
            .with_recovery_suggestion("check the requested frame count")
            .with_metadata("animation", "run");

        assert_eq!(error.category(), "assembly");
        assert_eq!(error.severity(), ErrorSeverity::Error);
        assert_eq!(
            error.recovery_suggestion(),
            Some("check the requested frame count")
        );
        assert_eq!(error.context().context.as_deref(), Some("assembling run"));
        assert_eq!(
            error.context().metadata.get("animation").map(String::as_str),
            Some("run")
        );
    }

    #[test]
    fn test_generator_display_includes_status() {
        let error = SpriteError::generator("bria", Some(503), "upstream busy");
        assert_eq!(
            error.to_string(),
            "Sheet generation via bria failed (HTTP 503): upstream busy"
        );
    }

    #[test]
    fn test_io_source_is_chained() {
        let error = SpriteError::io_at(
            "write sheet",
            Path::new("/tmp/x.png"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.source().is_some());
        assert!(error.to_string().contains("/tmp/x.png"));
    }
}
