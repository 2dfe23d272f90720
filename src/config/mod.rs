// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for CityPulse

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{CityPulseError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Reasoning service configuration
    pub ai_engine: EngineConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,

    /// File ingestion settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub url: String,
    pub models: ModelConfig,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    pub reasoning: String,
    #[serde(default = "default_transcription_model")]
    pub transcription: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_analysis_prompt")]
    pub analysis: String,
    #[serde(default = "default_transcription_prompt")]
    pub transcription: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestionConfig {
    /// Rows kept when flattening binary spreadsheets to text
    #[serde(default = "default_spreadsheet_rows")]
    pub spreadsheet_rows: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Largest accepted request body (uploads, recordings)
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

// Default value functions
fn default_timeout() -> u64 { 60 }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_transcription_model() -> String { "gemini-2.5-flash".to_string() }
fn default_spreadsheet_rows() -> usize { 500 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_max_upload_mb() -> usize { 64 }

fn default_analysis_prompt() -> String {
    "You are an urban systems analyst. Study the attached city datasets, images and \
     documents together with the field notes. Identify the most pressing urban problems, \
     their root causes backed by evidence from the data and established research, and \
     practical intervention strategies. Respond with JSON only. Produce exactly 3 \
     keyInsights and exactly 2 risks, each a single short sentence. Give one \
     primaryRecommendation. For every problem list the affectedZones and a severity of \
     High, Medium or Low. Finish with a prototype describing the logic, pseudocode and \
     implementationNotes of a small tool that would test the recommendation.".to_string()
}

fn default_transcription_prompt() -> String {
    "Transcribe this audio recording verbatim. Return only the transcript text, \
     without commentary or speaker labels.".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_engine: EngineConfig {
                url: "https://generativelanguage.googleapis.com".to_string(),
                models: ModelConfig {
                    reasoning: "gemini-2.5-pro".to_string(),
                    transcription: default_transcription_model(),
                },
                api_key_env: default_api_key_env(),
                timeout_secs: default_timeout(),
            },
            prompts: PromptConfig::default(),
            ingestion: IngestionConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            analysis: default_analysis_prompt(),
            transcription: default_transcription_prompt(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            spreadsheet_rows: default_spreadsheet_rows(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl EngineConfig {
    /// Per-request timeout applied around every reasoning call
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CityPulseError::Config(format!(
                "API key not set: export {}",
                self.api_key_env
            ))),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| CityPulseError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.ai_engine.url.trim().is_empty() {
            return Err(CityPulseError::Config("ai_engine.url is empty".to_string()));
        }
        if self.ai_engine.models.reasoning.trim().is_empty() {
            return Err(CityPulseError::Config("ai_engine.models.reasoning is empty".to_string()));
        }
        if self.ai_engine.timeout_secs == 0 {
            return Err(CityPulseError::Config("ai_engine.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.ai_engine.timeout_secs, 60);
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.web.port = 9191;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.web.port, 9191);
        assert_eq!(loaded.ai_engine.models.reasoning, config.ai_engine.models.reasoning);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"ai_engine": {"url": "http://localhost:9000", "models": {"reasoning": "local"}}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.ai_engine.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.ai_engine.models.transcription, "gemini-2.5-flash");
        assert!(config.prompts.analysis.contains("exactly 3"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.ai_engine.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(CityPulseError::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = AppConfig::default();
        config.ai_engine.api_key_env = "CITYPULSE_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(config.ai_engine.api_key().is_err());
    }
}
