// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Session state and the reducer that updates it
//!
//! All session data lives in one [`Session`] value. It only changes through
//! [`Session::reduce`], which returns what happened and, when a trigger needs
//! an external call, the [`Effect`] to perform. Performing effects is the job
//! of [`Workspace`].

pub mod workspace;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::context::ContextText;
use crate::ingest::{FileKind, IngestFailure, UploadedFile};
use crate::reasoning::AudioClip;

pub use workspace::{RunOutcome, TranscribeOutcome, Workspace};

/// Shown when analysis is triggered with nothing to analyse
pub const EMPTY_INPUT_MESSAGE: &str = "Please provide some files or urban context notes.";

/// Phase of the analysis workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Idle,
    Loading,
    Result,
    Error,
}

/// Analysis workflow state
#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    loading: bool,
    result: Option<AnalysisResult>,
    error: Option<String>,
    analyzed_at: Option<DateTime<Utc>>,
}

impl AnalysisState {
    pub fn phase(&self) -> AnalysisPhase {
        if self.loading {
            AnalysisPhase::Loading
        } else if self.error.is_some() {
            AnalysisPhase::Error
        } else if self.result.is_some() {
            AnalysisPhase::Result
        } else {
            AnalysisPhase::Idle
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Latest successful result; kept on screen when a re-run fails
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn analyzed_at(&self) -> Option<DateTime<Utc>> {
        self.analyzed_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    #[default]
    Idle,
    Recording,
    Transcribing,
    Done,
}

/// State of the current recording cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionState {
    pub is_recording: bool,
    pub text: String,
    pub status: TranscriptionStatus,
}

/// Everything the user has built up in one workspace session
#[derive(Debug, Clone, Default)]
pub struct Session {
    files: Vec<UploadedFile>,
    ingest_failures: Vec<IngestFailure>,
    context: ContextText,
    analysis: AnalysisState,
    transcription: TranscriptionState,
    transcription_error: Option<String>,
}

/// Inputs to the reducer
#[derive(Debug, Clone)]
pub enum Action {
    AddFiles(Vec<UploadedFile>),
    /// Replace the failures shown for the latest upload
    ReportIngestFailures(Vec<IngestFailure>),
    RemoveFile(String),
    SetContext(String),
    AppendContext(String),
    ClearContext,
    TriggerAnalysis,
    AnalysisSettled(Result<AnalysisResult, String>),
    StartRecording,
    SubmitRecording(AudioClip),
    TranscriptionSettled(Result<String, String>),
}

/// External work requested by a transition
#[derive(Debug, Clone)]
pub enum Effect {
    Analyze { files: Vec<UploadedFile>, context: String },
    Transcribe(AudioClip),
}

/// What the reducer did with an action
#[derive(Debug)]
pub enum Outcome {
    Applied,
    /// Action had no effect on state
    Ignored,
    /// Guard failed; the message is also stored in state
    Rejected(String),
    Run(Effect),
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn ingest_failures(&self) -> &[IngestFailure] {
        &self.ingest_failures
    }

    pub fn context(&self) -> &ContextText {
        &self.context
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn transcription(&self) -> &TranscriptionState {
        &self.transcription
    }

    pub fn transcription_error(&self) -> Option<&str> {
        self.transcription_error.as_deref()
    }

    /// Whether the run trigger should be enabled
    pub fn can_run(&self) -> bool {
        !self.analysis.loading
    }

    pub fn reduce(&mut self, action: Action) -> Outcome {
        match action {
            Action::AddFiles(files) => {
                if files.is_empty() {
                    return Outcome::Ignored;
                }
                self.files.extend(files);
                Outcome::Applied
            }
            Action::ReportIngestFailures(failures) => {
                self.ingest_failures = failures;
                Outcome::Applied
            }
            Action::RemoveFile(id) => {
                let before = self.files.len();
                self.files.retain(|f| f.id != id);
                if self.files.len() == before {
                    Outcome::Ignored
                } else {
                    Outcome::Applied
                }
            }
            Action::SetContext(text) => {
                self.context.set(text);
                Outcome::Applied
            }
            Action::AppendContext(fragment) => {
                self.context.append(&fragment);
                Outcome::Applied
            }
            Action::ClearContext => {
                self.context.clear();
                Outcome::Applied
            }
            Action::TriggerAnalysis => self.trigger_analysis(),
            Action::AnalysisSettled(settled) => {
                if !self.analysis.loading {
                    debug!("Dropping analysis settlement outside of loading");
                    return Outcome::Ignored;
                }
                self.analysis.loading = false;
                match settled {
                    Ok(result) => {
                        self.analysis.result = Some(result);
                        self.analysis.analyzed_at = Some(Utc::now());
                    }
                    Err(message) => self.analysis.error = Some(message),
                }
                Outcome::Applied
            }
            Action::StartRecording => {
                if self.transcription.status == TranscriptionStatus::Transcribing {
                    return Outcome::Ignored;
                }
                self.transcription = TranscriptionState {
                    is_recording: true,
                    text: String::new(),
                    status: TranscriptionStatus::Recording,
                };
                self.transcription_error = None;
                Outcome::Applied
            }
            Action::SubmitRecording(clip) => {
                if self.transcription.status == TranscriptionStatus::Transcribing {
                    return Outcome::Ignored;
                }
                self.transcription = TranscriptionState {
                    is_recording: false,
                    text: String::new(),
                    status: TranscriptionStatus::Transcribing,
                };
                self.transcription_error = None;
                Outcome::Run(Effect::Transcribe(clip))
            }
            Action::TranscriptionSettled(settled) => {
                if self.transcription.status != TranscriptionStatus::Transcribing {
                    return Outcome::Ignored;
                }
                match settled {
                    Ok(text) => {
                        self.context.append(&text);
                        self.transcription = TranscriptionState {
                            is_recording: false,
                            text,
                            status: TranscriptionStatus::Done,
                        };
                    }
                    Err(message) => {
                        self.transcription = TranscriptionState::default();
                        self.transcription_error = Some(message);
                    }
                }
                Outcome::Applied
            }
        }
    }

    fn trigger_analysis(&mut self) -> Outcome {
        if self.analysis.loading {
            return Outcome::Ignored;
        }
        if self.files.is_empty() && self.context.is_blank() {
            self.analysis.error = Some(EMPTY_INPUT_MESSAGE.to_string());
            return Outcome::Rejected(EMPTY_INPUT_MESSAGE.to_string());
        }

        self.analysis.loading = true;
        self.analysis.error = None;
        Outcome::Run(Effect::Analyze {
            files: self.files.clone(),
            context: self.context.as_str().to_string(),
        })
    }

    /// Serializable view for the front-end
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.analysis.phase(),
            can_run: self.can_run(),
            files: self.files.iter().map(FileSummary::from).collect(),
            ingest_failures: self.ingest_failures.clone(),
            context: self.context.as_str().to_string(),
            result: self.analysis.result.clone(),
            error: self.analysis.error.clone(),
            analyzed_at: self.analysis.analyzed_at,
            transcription: self.transcription.clone(),
            transcription_error: self.transcription_error.clone(),
        }
    }
}

/// File listing entry without the content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub media_type: String,
    pub size_bytes: usize,
}

impl From<&UploadedFile> for FileSummary {
    fn from(file: &UploadedFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            kind: file.kind,
            media_type: file.media_type.clone(),
            size_bytes: file.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: AnalysisPhase,
    pub can_run: bool,
    pub files: Vec<FileSummary>,
    pub ingest_failures: Vec<IngestFailure>,
    pub context: String,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub transcription: TranscriptionState,
    pub transcription_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_result;
    use crate::ingest::{add_files, RawSelection};

    fn files(names: &[&str]) -> Vec<UploadedFile> {
        let selections = names
            .iter()
            .map(|n| RawSelection::from_bytes(*n, b"a,b\n".to_vec(), None))
            .collect();
        add_files(selections, &Default::default()).files
    }

    #[test]
    fn test_empty_trigger_rejected() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("   ".to_string()));

        match session.reduce(Action::TriggerAnalysis) {
            Outcome::Rejected(msg) => assert_eq!(msg, EMPTY_INPUT_MESSAGE),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(session.analysis().phase(), AnalysisPhase::Error);
        assert!(!session.analysis().is_loading());
    }

    #[test]
    fn test_trigger_with_context_only() {
        let mut session = Session::new();
        session.reduce(Action::AppendContext("flooding on Main St".to_string()));

        match session.reduce(Action::TriggerAnalysis) {
            Outcome::Run(Effect::Analyze { files, context }) => {
                assert!(files.is_empty());
                assert_eq!(context, "flooding on Main St");
            }
            other => panic!("expected analyze effect, got {:?}", other),
        }
        assert_eq!(session.analysis().phase(), AnalysisPhase::Loading);
        assert!(!session.can_run());
    }

    #[test]
    fn test_trigger_inert_while_loading() {
        let mut session = Session::new();
        session.reduce(Action::AddFiles(files(&["zoning.csv"])));
        assert!(matches!(session.reduce(Action::TriggerAnalysis), Outcome::Run(_)));

        let before = session.snapshot();
        assert!(matches!(session.reduce(Action::TriggerAnalysis), Outcome::Ignored));
        let after = session.snapshot();
        assert_eq!(before.phase, after.phase);
        assert_eq!(before.error, after.error);
    }

    #[test]
    fn test_settle_success_then_failure_keeps_result() {
        let mut session = Session::new();
        session.reduce(Action::AddFiles(files(&["zoning.csv"])));

        session.reduce(Action::TriggerAnalysis);
        session.reduce(Action::AnalysisSettled(Ok(sample_result())));
        assert_eq!(session.analysis().phase(), AnalysisPhase::Result);
        assert!(session.analysis().analyzed_at().is_some());

        session.reduce(Action::TriggerAnalysis);
        assert_eq!(session.analysis().phase(), AnalysisPhase::Loading);
        session.reduce(Action::AnalysisSettled(Err("Analysis failed: timeout".to_string())));

        assert_eq!(session.analysis().phase(), AnalysisPhase::Error);
        assert_eq!(session.analysis().error(), Some("Analysis failed: timeout"));
        assert_eq!(session.analysis().result(), Some(&sample_result()));
    }

    #[test]
    fn test_rerun_clears_error() {
        let mut session = Session::new();
        session.reduce(Action::TriggerAnalysis);
        assert_eq!(session.analysis().phase(), AnalysisPhase::Error);

        session.reduce(Action::SetContext("noise complaints".to_string()));
        session.reduce(Action::TriggerAnalysis);
        assert_eq!(session.analysis().error(), None);
        assert_eq!(session.analysis().phase(), AnalysisPhase::Loading);
    }

    #[test]
    fn test_stale_settlement_ignored() {
        let mut session = Session::new();
        let outcome = session.reduce(Action::AnalysisSettled(Ok(sample_result())));
        assert!(matches!(outcome, Outcome::Ignored));
        assert_eq!(session.analysis().phase(), AnalysisPhase::Idle);
    }

    #[test]
    fn test_remove_file_preserves_order() {
        let mut session = Session::new();
        session.reduce(Action::AddFiles(files(&["a.csv", "b.csv", "c.csv", "d.csv"])));
        let target = session.files()[1].id.clone();

        assert!(matches!(session.reduce(Action::RemoveFile(target)), Outcome::Applied));

        let names: Vec<&str> = session.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "c.csv", "d.csv"]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut session = Session::new();
        session.reduce(Action::AddFiles(files(&["a.csv", "b.csv"])));

        let outcome = session.reduce(Action::RemoveFile("nope".to_string()));
        assert!(matches!(outcome, Outcome::Ignored));
        assert_eq!(session.files().len(), 2);
    }

    #[test]
    fn test_transcription_cycle_appends_context() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("alpha".to_string()));

        session.reduce(Action::StartRecording);
        assert!(session.transcription().is_recording);
        assert_eq!(session.transcription().status, TranscriptionStatus::Recording);

        let clip = AudioClip::new(vec![0; 4], "audio/webm");
        assert!(matches!(
            session.reduce(Action::SubmitRecording(clip.clone())),
            Outcome::Run(Effect::Transcribe(_))
        ));
        assert!(matches!(session.reduce(Action::SubmitRecording(clip)), Outcome::Ignored));

        session.reduce(Action::TranscriptionSettled(Ok("beta".to_string())));
        assert_eq!(session.context().as_str(), "alpha beta");
        assert_eq!(session.transcription().status, TranscriptionStatus::Done);
        assert_eq!(session.transcription().text, "beta");
    }

    #[test]
    fn test_transcription_failure_keeps_context() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("existing notes".to_string()));
        session.reduce(Action::SubmitRecording(AudioClip::new(vec![1], "audio/wav")));

        session.reduce(Action::TranscriptionSettled(Err("Transcription failed: 500".to_string())));

        assert_eq!(session.context().as_str(), "existing notes");
        assert_eq!(session.transcription(), &TranscriptionState::default());
        assert_eq!(session.transcription_error(), Some("Transcription failed: 500"));
        // Analysis flow is untouched
        assert_eq!(session.analysis().phase(), AnalysisPhase::Idle);
    }

    #[test]
    fn test_snapshot_omits_content() {
        let mut session = Session::new();
        session.reduce(Action::AddFiles(files(&["zoning.csv"])));

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["can_run"], true);
        assert_eq!(json["files"][0]["name"], "zoning.csv");
        assert_eq!(json["files"][0]["kind"], "tabular");
        assert!(json["files"][0].get("content").is_none());
    }
}
