//! Evaluation orchestrator — drives one session through the screening flow.
//!
//! Flow: upload → extract (blocking pool) → evaluate: build prompt →
//!       model call (with deadline) → parse verdict → decide.
//!
//! This is the only place a component failure becomes user-facing text.
//! Nothing here retries: one explicit trigger, one backend call.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::llm_client::{EvaluationClient, EvaluationClientError};
use crate::screening::catalog::{RoleId, UnknownRoleError};
use crate::screening::extractor::{DocumentTextExtractor, ExtractedText, ExtractionError};
use crate::screening::prompts::build_prompt;
use crate::screening::session::{ApplicationSession, DocumentIdentity, SessionState};
use crate::screening::verdict::{parse_verdict, MalformedVerdictError, Verdict};

const MSG_EXTRACTED: &str = "Resume processed successfully!";
const MSG_UNCHANGED: &str = "This resume has already been processed.";
const MSG_EXTRACTION_FAILED: &str = "Could not process the PDF. Please try again.";
const MSG_SELECTED: &str = "Congratulations! Your skills match our requirements.";
const MSG_REJECTED: &str = "Unfortunately, your skills don't match our requirements.";
const MSG_CONTRACT: &str =
    "We could not process the evaluation result. Please try analyzing your resume again.";

// ────────────────────────────────────────────────────────────────────────────
// Failure taxonomy
// ────────────────────────────────────────────────────────────────────────────

/// Who can fix a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Re-upload or pick another role.
    Input,
    /// Transient; trigger evaluation again.
    Backend,
    /// Backend or prompt drift.
    Contract,
}

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    UnknownRole(#[from] UnknownRoleError),

    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model backend returned no assistant message")]
    NoResponse,

    #[error(transparent)]
    MalformedVerdict(#[from] MalformedVerdictError),
}

impl From<EvaluationClientError> for ScreeningError {
    fn from(e: EvaluationClientError) -> Self {
        match e {
            EvaluationClientError::ModelUnavailable(msg) => ScreeningError::ModelUnavailable(msg),
            EvaluationClientError::NoResponse => ScreeningError::NoResponse,
        }
    }
}

impl ScreeningError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ScreeningError::Extraction(_) | ScreeningError::UnknownRole(_) => ErrorClass::Input,
            ScreeningError::ModelUnavailable(_) | ScreeningError::NoResponse => {
                ErrorClass::Backend
            }
            ScreeningError::MalformedVerdict(_) => ErrorClass::Contract,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScreeningError::Extraction(_) => "extraction",
            ScreeningError::UnknownRole(_) => "unknown_role",
            ScreeningError::ModelUnavailable(_) => "model_unavailable",
            ScreeningError::NoResponse => "no_response",
            ScreeningError::MalformedVerdict(_) => "malformed_verdict",
        }
    }

    fn user_feedback(&self) -> String {
        match self {
            ScreeningError::Extraction(_) => MSG_EXTRACTION_FAILED.to_string(),
            ScreeningError::UnknownRole(e) => {
                let known: Vec<_> = RoleId::ALL.iter().map(|r| r.as_str()).collect();
                format!("{e}. Choose one of: {}.", known.join(", "))
            }
            ScreeningError::ModelUnavailable(_) | ScreeningError::NoResponse => {
                format!("Error analyzing resume: {self}")
            }
            ScreeningError::MalformedVerdict(_) => MSG_CONTRACT.to_string(),
        }
    }
}

/// Request for exactly one evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    role: RoleId,
    resume_text: ExtractedText,
}

impl EvaluationRequest {
    pub fn new(role: RoleId, resume_text: ExtractedText) -> Result<Self, ExtractionError> {
        if resume_text.is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(Self { role, resume_text })
    }
}

/// Asked to do something the session's current state does not allow.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot evaluate a session in state '{0}'; upload a readable resume first or reset")]
pub struct InvalidTransition(pub &'static str);

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// A failure as the user sees it. `selected` is always false.
#[derive(Debug, Clone, Serialize)]
pub struct FailureNotice {
    pub kind: &'static str,
    pub class: ErrorClass,
    pub selected: bool,
    pub feedback: String,
}

impl From<&ScreeningError> for FailureNotice {
    fn from(e: &ScreeningError) -> Self {
        Self {
            kind: e.kind(),
            class: e.class(),
            selected: false,
            feedback: e.user_feedback(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Extracted { message: &'static str, characters: usize },
    Unchanged { message: &'static str },
    Failed(FailureNotice),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Decided {
        selected: bool,
        message: &'static str,
        verdict: Verdict,
    },
    Failed(FailureNotice),
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct EvaluationOrchestrator {
    extractor: Arc<dyn DocumentTextExtractor>,
    client: Arc<dyn EvaluationClient>,
    evaluation_timeout: Duration,
}

impl EvaluationOrchestrator {
    pub fn new(
        extractor: Arc<dyn DocumentTextExtractor>,
        client: Arc<dyn EvaluationClient>,
        evaluation_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            client,
            evaluation_timeout,
        }
    }

    /// Accepts a document for the session and extracts its text.
    ///
    /// A different document discards all prior text and verdict. The same
    /// document again is a no-op unless its last extraction failed.
    pub async fn upload_document(
        &self,
        session: &mut ApplicationSession,
        file_name: &str,
        document: Bytes,
    ) -> UploadOutcome {
        let identity = DocumentIdentity::of(file_name, &document);

        let already_have_it = session
            .document
            .as_ref()
            .is_some_and(|current| current.same_document(&identity));
        if already_have_it
            && matches!(
                session.state,
                SessionState::TextReady | SessionState::Decided { .. }
            )
        {
            info!(session_id = %session.id, "Same document uploaded again; keeping current state");
            return UploadOutcome::Unchanged {
                message: MSG_UNCHANGED,
            };
        }

        session.clear();
        session.document = Some(identity);
        session.transition(SessionState::TextPending);

        let extractor = Arc::clone(&self.extractor);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .unwrap_or_else(|e| Err(ExtractionError::Decode(format!("extraction task failed: {e}"))));

        match extracted {
            Ok(text) => {
                let characters = text.char_count();
                info!(session_id = %session.id, characters, "Resume text extracted");
                session.resume_text = Some(text);
                session.transition(SessionState::TextReady);
                UploadOutcome::Extracted {
                    message: MSG_EXTRACTED,
                    characters,
                }
            }
            Err(e) => {
                warn!(session_id = %session.id, file_name, "Resume extraction failed: {e}");
                session.resume_text = Some(ExtractedText::empty());
                session.transition(SessionState::ExtractionFailed);
                UploadOutcome::Failed(FailureNotice::from(&ScreeningError::from(e)))
            }
        }
    }

    /// Runs one evaluation of the session's resume against `role_id`.
    ///
    /// Only valid from `TextReady`. On failure the session stays in `TextReady`
    /// with its text intact so the user can retry.
    pub async fn evaluate(
        &self,
        session: &mut ApplicationSession,
        role_id: &str,
    ) -> Result<EvaluationOutcome, InvalidTransition> {
        if session.state != SessionState::TextReady {
            return Err(InvalidTransition(session.state.label()));
        }

        let request = match self.request_for(session, role_id) {
            Ok(request) => request,
            Err(e) => return Ok(self.report_failure(session, &e)),
        };

        info!(
            session_id = %session.id,
            role = %request.role,
            model = self.client.model(),
            "Starting resume evaluation"
        );

        let in_flight = InFlight::begin(session);
        match self.run(&request).await {
            Ok(verdict) => {
                let selected = verdict.selected;
                info!(
                    session_id = %in_flight.session.id,
                    selected,
                    matching = verdict.matching_skills.len(),
                    missing = verdict.missing_skills.len(),
                    "Resume evaluation decided"
                );
                in_flight.decide(verdict.clone());
                Ok(EvaluationOutcome::Decided {
                    selected,
                    message: if selected { MSG_SELECTED } else { MSG_REJECTED },
                    verdict,
                })
            }
            Err(e) => {
                drop(in_flight);
                Ok(self.report_failure(session, &e))
            }
        }
    }

    /// Returns the session to `Idle`, clearing every field tied to the application.
    pub fn reset(&self, session: &mut ApplicationSession) {
        info!(session_id = %session.id, from = session.state.label(), "Session reset");
        session.clear();
    }

    fn request_for(
        &self,
        session: &ApplicationSession,
        role_id: &str,
    ) -> Result<EvaluationRequest, ScreeningError> {
        let role = role_id.parse::<RoleId>()?;
        let text = session.resume_text.clone().unwrap_or_default();
        Ok(EvaluationRequest::new(role, text)?)
    }

    async fn run(&self, request: &EvaluationRequest) -> Result<Verdict, ScreeningError> {
        let prompt = build_prompt(request.resume_text.as_str(), request.role.requirements());

        let raw = tokio::time::timeout(self.evaluation_timeout, self.client.evaluate(&prompt))
            .await
            .map_err(|_| {
                ScreeningError::ModelUnavailable(format!(
                    "no answer within {}s",
                    self.evaluation_timeout.as_secs()
                ))
            })??;

        Ok(parse_verdict(&raw)?)
    }

    fn report_failure(&self, session: &ApplicationSession, e: &ScreeningError) -> EvaluationOutcome {
        match e {
            ScreeningError::MalformedVerdict(m) => error!(
                session_id = %session.id,
                raw = %m.raw,
                "Backend returned a malformed verdict: {}",
                m.reason
            ),
            _ => warn!(
                session_id = %session.id,
                kind = e.kind(),
                "Resume evaluation failed: {e}"
            ),
        }
        EvaluationOutcome::Failed(FailureNotice::from(e))
    }
}

/// Marks a session `Evaluating` for as long as it lives. Dropped without a
/// decision (failure, or the caller abandoned the future) it puts the session
/// back to `TextReady`.
struct InFlight<'a> {
    session: &'a mut ApplicationSession,
}

impl<'a> InFlight<'a> {
    fn begin(session: &'a mut ApplicationSession) -> Self {
        session.transition(SessionState::Evaluating);
        Self { session }
    }

    fn decide(self, verdict: Verdict) {
        let selected = verdict.selected;
        self.session.analysis_complete = true;
        self.session.is_selected = selected;
        self.session.verdict = Some(verdict);
        self.session.transition(SessionState::Decided { selected });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.session.state == SessionState::Evaluating {
            self.session.transition(SessionState::TextReady);
        }
    }
}
