// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for CityPulse

use thiserror::Error;

/// Result type alias for CityPulse operations
pub type Result<T> = std::result::Result<T, CityPulseError>;

/// CityPulse error types
#[derive(Error, Debug)]
pub enum CityPulseError {
    #[error("{0}")]
    Validation(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Could not read {name}: {reason}")]
    FileRead { name: String, reason: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl CityPulseError {
    /// Fold any failure raised during an analysis call into `Analysis`
    pub fn into_analysis(self) -> Self {
        match self {
            err @ (Self::Analysis(_) | Self::Validation(_)) => err,
            Self::Api(e) if e.is_timeout() => Self::Analysis("the reasoning service timed out".to_string()),
            other => Self::Analysis(other.to_string()),
        }
    }

    /// Fold any failure raised during a transcription call into `Transcription`
    pub fn into_transcription(self) -> Self {
        match self {
            err @ Self::Transcription(_) => err,
            other => Self::Transcription(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_analysis_wraps_foreign_errors() {
        let err = CityPulseError::Config("missing key".to_string()).into_analysis();
        assert!(matches!(err, CityPulseError::Analysis(_)));
        assert_eq!(err.to_string(), "Analysis failed: Configuration error: missing key");
    }

    #[test]
    fn test_into_analysis_keeps_analysis_errors() {
        let err = CityPulseError::Analysis("bad reply".to_string()).into_analysis();
        assert_eq!(err.to_string(), "Analysis failed: bad reply");
    }

    #[test]
    fn test_into_transcription() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = CityPulseError::FileSystem(io).into_transcription();
        assert!(matches!(err, CityPulseError::Transcription(_)));
    }
}
