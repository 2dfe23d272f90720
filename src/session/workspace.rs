// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Workspace: owns the session and performs its effects

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{Action, Effect, Outcome, Session, SessionSnapshot};
use crate::analysis::AnalysisResult;
use crate::config::IngestionConfig;
use crate::ingest::{self, IngestFailure, IngestReport, RawSelection};
use crate::reasoning::{AudioClip, ReasoningService};
use crate::{AppConfig, CityPulseError, Result};

/// Result of pressing the run trigger
#[derive(Debug)]
pub enum RunOutcome {
    Completed(AnalysisResult),
    /// A request is already in flight; nothing happened
    Busy,
}

/// Result of submitting a recording
#[derive(Debug)]
pub enum TranscribeOutcome {
    Completed(String),
    Busy,
}

/// One user's workspace: session state plus the injected reasoning service
///
/// The session lock is never held while waiting on the service. Service
/// calls run on their own task, so a caller that goes away mid-request still
/// leaves the session settled.
pub struct Workspace {
    session: Arc<Mutex<Session>>,
    service: Arc<dyn ReasoningService>,
    ingestion: IngestionConfig,
    timeout: Duration,
}

impl Workspace {
    pub fn new(service: Arc<dyn ReasoningService>, config: &AppConfig) -> Self {
        Self::with_timeout(service, config.ingestion.clone(), config.ai_engine.timeout())
    }

    pub fn with_timeout(
        service: Arc<dyn ReasoningService>,
        ingestion: IngestionConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            service,
            ingestion,
            timeout,
        }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Apply a plain state change
    pub async fn dispatch(&self, action: Action) -> Outcome {
        self.session.lock().await.reduce(action)
    }

    /// Ingest selections and merge the readable ones into the session
    pub async fn add_files(&self, selections: Vec<RawSelection>) -> IngestReport {
        let ingestion = self.ingestion.clone();
        let names: Vec<String> = selections.iter().map(|s| s.name.clone()).collect();

        let report = match tokio::task::spawn_blocking(move || ingest::add_files(selections, &ingestion)).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Ingestion task failed: {}", e);
                IngestReport {
                    files: Vec::new(),
                    failures: names
                        .into_iter()
                        .map(|name| IngestFailure {
                            name,
                            reason: format!("ingestion failed: {}", e),
                        })
                        .collect(),
                }
            }
        };

        let mut session = self.session.lock().await;
        session.reduce(Action::AddFiles(report.files.clone()));
        session.reduce(Action::ReportIngestFailures(report.failures.clone()));
        report
    }

    /// Returns false when no file had that id
    pub async fn remove_file(&self, id: &str) -> bool {
        matches!(self.dispatch(Action::RemoveFile(id.to_string())).await, Outcome::Applied)
    }

    /// Press the run trigger
    ///
    /// Fails with `Validation` when there is nothing to analyse and with
    /// `Analysis` when the service errors, times out or replies badly. Both
    /// messages are also recorded in the session.
    pub async fn run_analysis(&self) -> Result<RunOutcome> {
        let (files, context) = match self.dispatch(Action::TriggerAnalysis).await {
            Outcome::Run(Effect::Analyze { files, context }) => (files, context),
            Outcome::Rejected(message) => return Err(CityPulseError::Validation(message)),
            _ => return Ok(RunOutcome::Busy),
        };

        info!(
            "Running analysis via {} ({} files, {} chars of context)",
            self.service.name(),
            files.len(),
            context.len()
        );

        let session = self.session.clone();
        let service = self.service.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let settled = match tokio::time::timeout(timeout, service.analyze(&files, &context)).await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.into_analysis()),
                Err(_) => Err(CityPulseError::Analysis(format!(
                    "no response within {} seconds",
                    timeout.as_secs()
                ))),
            };

            let action = match &settled {
                Ok(result) => {
                    info!("Analysis complete: {} problems", result.problems.len());
                    Action::AnalysisSettled(Ok(result.clone()))
                }
                Err(e) => {
                    warn!("{}", e);
                    Action::AnalysisSettled(Err(e.to_string()))
                }
            };
            session.lock().await.reduce(action);
            settled
        });

        match task.await {
            Ok(settled) => settled.map(RunOutcome::Completed),
            Err(e) => {
                let err = CityPulseError::Analysis(format!("analysis task failed: {}", e));
                self.dispatch(Action::AnalysisSettled(Err(err.to_string()))).await;
                Err(err)
            }
        }
    }

    /// Transcribe a recording and append it to the context notes
    pub async fn transcribe(&self, clip: AudioClip) -> Result<TranscribeOutcome> {
        let clip = match self.dispatch(Action::SubmitRecording(clip)).await {
            Outcome::Run(Effect::Transcribe(clip)) => clip,
            _ => return Ok(TranscribeOutcome::Busy),
        };

        let session = self.session.clone();
        let service = self.service.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let settled = match tokio::time::timeout(timeout, service.transcribe(&clip)).await {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    Err(CityPulseError::Transcription("no speech recognised".to_string()))
                }
                Ok(Ok(text)) => Ok(text.trim().to_string()),
                Ok(Err(e)) => Err(e.into_transcription()),
                Err(_) => Err(CityPulseError::Transcription(format!(
                    "no response within {} seconds",
                    timeout.as_secs()
                ))),
            };

            let action = match &settled {
                Ok(text) => Action::TranscriptionSettled(Ok(text.clone())),
                Err(e) => {
                    warn!("{}", e);
                    Action::TranscriptionSettled(Err(e.to_string()))
                }
            };
            session.lock().await.reduce(action);
            settled
        });

        match task.await {
            Ok(settled) => settled.map(TranscribeOutcome::Completed),
            Err(e) => {
                let err = CityPulseError::Transcription(format!("transcription task failed: {}", e));
                self.dispatch(Action::TranscriptionSettled(Err(err.to_string()))).await;
                Err(err)
            }
        }
    }
}
