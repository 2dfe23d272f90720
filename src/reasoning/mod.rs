// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Reasoning service boundary
//!
//! The workspace only talks to the model through [`ReasoningService`], so the
//! hosted client can be swapped for a fake in tests.

pub mod gemini;
pub mod schema;

use async_trait::async_trait;
use std::path::Path;

use crate::analysis::AnalysisResult;
use crate::ingest::UploadedFile;
use crate::{CityPulseError, Result};

pub use gemini::GeminiClient;

/// A recorded audio blob waiting for transcription
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Load a recording from disk, typing it by extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let media_type = audio_media_type(&ext).ok_or_else(|| {
            CityPulseError::Transcription(format!("unsupported audio format: {:?}", path))
        })?;

        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, media_type))
    }
}

pub(crate) fn audio_media_type(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "webm" => "audio/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        _ => return None,
    })
}

/// External model that turns city data into structured analysis
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Name shown in logs and the dashboard header
    fn name(&self) -> &str;

    /// Run one analysis over the given files and context notes
    async fn analyze(&self, files: &[UploadedFile], context: &str) -> Result<AnalysisResult>;

    /// Turn a recording into plain text
    async fn transcribe(&self, audio: &AudioClip) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Scripted stand-in for the hosted model
    pub(crate) struct FakeReasoner {
        reply: std::result::Result<AnalysisResult, String>,
        transcript: std::result::Result<String, String>,
        gate: Option<Arc<Notify>>,
        pub analyze_calls: AtomicUsize,
        pub transcribe_calls: AtomicUsize,
        pub seen: Mutex<Vec<(Vec<String>, String)>>,
    }

    impl FakeReasoner {
        pub fn returning(result: AnalysisResult) -> Self {
            Self {
                reply: Ok(result),
                transcript: Ok("fake transcript".to_string()),
                gate: None,
                analyze_calls: AtomicUsize::new(0),
                transcribe_calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            let mut fake = Self::returning(crate::analysis::tests::sample_result());
            fake.reply = Err(message.to_string());
            fake.transcript = Err(message.to_string());
            fake
        }

        pub fn with_transcript(mut self, transcript: &str) -> Self {
            self.transcript = Ok(transcript.to_string());
            self
        }

        /// Hold every call until the gate is notified
        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn analyze_count(&self) -> usize {
            self.analyze_calls.load(Ordering::SeqCst)
        }

        pub fn transcribe_count(&self) -> usize {
            self.transcribe_calls.load(Ordering::SeqCst)
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
    }

    #[async_trait]
    impl ReasoningService for FakeReasoner {
        fn name(&self) -> &str {
            "fake"
        }

        async fn analyze(&self, files: &[UploadedFile], context: &str) -> Result<AnalysisResult> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((files.iter().map(|f| f.name.clone()).collect(), context.to_string()));
            self.wait_gate().await;
            self.reply.clone().map_err(CityPulseError::Analysis)
        }

        async fn transcribe(&self, _audio: &AudioClip) -> Result<String> {
            self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            self.transcript.clone().map_err(CityPulseError::Transcription)
        }
    }
}
