//! Structured error types for folio.
//!
//! Only boundary failures are errors: a descriptor that does not parse, a
//! file that cannot be read, or a backend that cannot encode what it was
//! given. Template and layout anomalies degrade silently and are reported
//! through [`crate::diagnostics::Diagnostics`] instead.

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// The unified error type returned by all public folio entry points.
#[derive(Debug, Error)]
pub enum FolioError {
    /// The (resolved) descriptor failed to parse as a folio document.
    #[error("Failed to parse document: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A template or variables file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    Font(String),

    /// An image handed to the backend could not be decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// Strict mode was requested and the build produced warnings.
    #[error("Strict mode: {} warning(s), first: {}", .0.len(), first_message(.0))]
    Strict(Vec<Diagnostic>),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default()
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or a loop that expanded into invalid JSON.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the descriptor shape. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}
