// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini API client for hosted multimodal inference

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{schema, AudioClip, ReasoningService};
use crate::analysis::AnalysisResult;
use crate::ingest::{ContentEncoding, UploadedFile};
use crate::{AppConfig, CityPulseError, Result};

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    reasoning_model: String,
    transcription_model: String,
    analysis_prompt: String,
    transcription_prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

/// Build the single multi-part analysis request
///
/// Order: instruction, then every file, then the context notes.
pub(crate) fn build_analysis_request(
    instruction: &str,
    files: &[UploadedFile],
    context: &str,
) -> GenerateContentRequest {
    let mut parts = vec![Part::text(instruction)];

    for file in files {
        match file.encoding {
            ContentEncoding::Text => parts.push(Part::text(format!(
                "File: {} ({})\n{}",
                file.name, file.media_type, file.content
            ))),
            ContentEncoding::Base64 => {
                parts.push(Part::text(format!("File: {} ({})", file.name, file.media_type)));
                parts.push(Part::inline(&file.media_type, file.content.clone()));
            }
        }
    }

    if !context.trim().is_empty() {
        parts.push(Part::text(format!("Urban context notes:\n{}", context)));
    }

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema::analysis_schema(),
        }),
    }
}

/// Build a transcription request for one recording
pub(crate) fn build_transcription_request(instruction: &str, audio: &AudioClip) -> GenerateContentRequest {
    use base64::{engine::general_purpose, Engine as _};

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part::text(instruction),
                Part::inline(&audio.media_type, general_purpose::STANDARD.encode(&audio.bytes)),
            ],
        }],
        generation_config: None,
    }
}

/// Concatenate the text parts of the first candidate
fn reply_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(CityPulseError::Service(format!("request blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| CityPulseError::Service("response contained no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CityPulseError::Service(format!(
            "empty response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured variable
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.ai_engine.api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(config: &AppConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.ai_engine.timeout())
            .build()
            .map_err(|e| CityPulseError::Config(format!("Failed to create HTTP client: {}", e)))?;

        // Normalize URL
        let base_url = config
            .ai_engine
            .url
            .trim_end_matches('/')
            .trim_end_matches("/v1beta")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            reasoning_model: config.ai_engine.models.reasoning.clone(),
            transcription_model: config.ai_engine.models.transcription.clone(),
            analysis_prompt: config.prompts.analysis.clone(),
            transcription_prompt: config.prompts.transcription.clone(),
        })
    }

    /// Check the endpoint is reachable and the key is accepted
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                CityPulseError::Service(format!("Cannot connect to {}: {}", self.base_url, e))
            })?;

        if !response.status().is_success() {
            return Err(CityPulseError::Service(format!(
                "{} returned status {}",
                self.base_url,
                response.status()
            )));
        }

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let models: ModelsResponse = response.json().await?;
        Ok(models
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    /// Check if a specific model is available
    pub async fn model_available(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == model))
    }

    /// Send one request and return the reply text
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        debug!("Sending request to Gemini: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(CityPulseError::Service(format!(
                "Gemini returned status {}: {}",
                status, detail
            )));
        }

        let result: GenerateContentResponse = response.json().await?;
        reply_text(result)
    }
}

#[async_trait]
impl ReasoningService for GeminiClient {
    fn name(&self) -> &str {
        &self.reasoning_model
    }

    async fn analyze(&self, files: &[UploadedFile], context: &str) -> Result<AnalysisResult> {
        info!("Requesting analysis of {} files", files.len());

        let request = build_analysis_request(&self.analysis_prompt, files, context);
        let reply = self
            .generate(&self.reasoning_model, &request)
            .await
            .map_err(CityPulseError::into_analysis)?;

        AnalysisResult::from_reply(&reply)
    }

    async fn transcribe(&self, audio: &AudioClip) -> Result<String> {
        info!("Requesting transcription of {} bytes ({})", audio.bytes.len(), audio.media_type);

        let request = build_transcription_request(&self.transcription_prompt, audio);
        let reply = self
            .generate(&self.transcription_model, &request)
            .await
            .map_err(CityPulseError::into_transcription)?;

        Ok(reply.trim().to_string())
    }
}
