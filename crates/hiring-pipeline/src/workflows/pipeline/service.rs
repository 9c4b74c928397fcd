use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::authorizer::{Denial, PipelineAction};
use super::domain::{
    Actor, CandidateId, CandidateRecord, CandidateStatus, EventDecision, EventId, EventPatch,
    EventPayload, EventRecord,
};
use super::gating::{GateView, GatingPolicy};
use super::repository::{
    ConsentDocument, DocumentStore, DocumentStoreError, FeedbackLinkNotice, FeedbackNotifier,
    PipelineRepository, RepositoryError,
};
use super::transition::{EventNamePolicy, TransitionEngine, TransitionError};

/// Event as presented to one actor, with the actions that actor may take on it.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub record: EventRecord,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_resolve: bool,
}

/// Authoritative snapshot of a candidate, its events, and the derived gates.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineView {
    pub candidate: CandidateRecord,
    pub events: Vec<EventView>,
    pub gates: GateView,
}

impl PipelineView {
    pub fn event(&self, id: &EventId) -> Option<&EventView> {
        self.events.iter().find(|event| &event.record.id == id)
    }
}

/// Service composing the repository, collaborators, transition engine, and gating policy.
///
/// Each call handles exactly one actor intent against exactly one record and answers with a
/// reloaded [`PipelineView`]. Conflicts are surfaced, never retried.
pub struct PipelineOrchestrator<R, D, N> {
    repository: Arc<R>,
    documents: Arc<D>,
    notifier: Arc<N>,
    engine: TransitionEngine,
    gating: GatingPolicy,
    feedback_base_url: String,
}

static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_event_id() -> EventId {
    let id = EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EventId(format!("evt-{id:06}"))
}

impl<R, D, N> PipelineOrchestrator<R, D, N>
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        documents: Arc<D>,
        notifier: Arc<N>,
        config: &crate::config::PipelineConfig,
    ) -> Self {
        Self::with_parts(
            repository,
            documents,
            notifier,
            TransitionEngine::new(config.event_names),
            GatingPolicy::new(config.consent_min_approvals),
            config.feedback_base_url.clone(),
        )
    }

    pub(crate) fn with_parts(
        repository: Arc<R>,
        documents: Arc<D>,
        notifier: Arc<N>,
        engine: TransitionEngine,
        gating: GatingPolicy,
        feedback_base_url: String,
    ) -> Self {
        Self {
            repository,
            documents,
            notifier,
            engine,
            gating,
            feedback_base_url: feedback_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn name_policy(&self) -> EventNamePolicy {
        self.engine.name_policy()
    }

    pub fn gating(&self) -> &GatingPolicy {
        &self.gating
    }

    /// Load a candidate with its events and the gates as seen by `actor`.
    pub fn view(
        &self,
        candidate_id: &CandidateId,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        let events = self.repository.events_for(candidate_id)?;
        Ok(self.compose(candidate, events, actor))
    }

    pub fn create_event(
        &self,
        candidate_id: &CandidateId,
        payload: EventPayload,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        let record = self
            .engine
            .create_event(&candidate, payload, actor, next_event_id())?;
        let stored = self.repository.insert_event(record, candidate.version)?;

        info!(
            candidate = %candidate_id,
            event = %stored.id,
            name = %stored.event_name,
            actor = %actor.id,
            "interview event scheduled"
        );
        self.notify_interviewer(&stored);
        self.view(candidate_id, actor)
    }

    pub fn edit_event(
        &self,
        event_id: &EventId,
        patch: EventPatch,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let event = self.load_event(event_id)?;
        let updated = self.engine.edit_event(&event, patch, actor)?;
        let rescheduled = updated.interviewer != event.interviewer
            || updated.interview_date != event.interview_date;
        let stored = self.repository.replace_event(updated)?;

        info!(event = %event_id, actor = %actor.id, "interview event edited");
        if rescheduled {
            self.notify_interviewer(&stored);
        }
        self.view(&stored.candidate_id, actor)
    }

    pub fn delete_event(
        &self,
        event_id: &EventId,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let event = self.load_event(event_id)?;
        self.engine.delete_event(&event, actor)?;
        let removed = self.repository.remove_event(event_id, event.version)?;

        info!(event = %event_id, actor = %actor.id, "interview event deleted");
        self.view(&removed.candidate_id, actor)
    }

    pub fn resolve_event(
        &self,
        event_id: &EventId,
        decision: EventDecision,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let event = self.load_event(event_id)?;
        let resolved = self.engine.resolve_event(&event, decision, actor)?;
        let stored = self.repository.replace_event(resolved)?;

        info!(
            event = %event_id,
            status = stored.status.label(),
            actor = %actor.id,
            "interview event resolved"
        );
        self.view(&stored.candidate_id, actor)
    }

    /// Feedback collaborator hook: marks a pending event as `submitted`.
    pub fn record_feedback_submitted(
        &self,
        event_id: &EventId,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let event = self.load_event(event_id)?;
        if let Some(submitted) = self.engine.record_feedback_submitted(&event, actor)? {
            self.repository.replace_event(submitted)?;
            info!(event = %event_id, "interview feedback submitted");
        }
        self.view(&event.candidate_id, actor)
    }

    pub fn reject_candidate(
        &self,
        candidate_id: &CandidateId,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        if let Some(rejected) = self.engine.reject_candidate(&candidate, actor)? {
            self.repository.replace_candidate(rejected)?;
            info!(candidate = %candidate_id, actor = %actor.id, "candidate rejected");
        }
        self.view(candidate_id, actor)
    }

    pub fn initiate_onboarding(
        &self,
        candidate_id: &CandidateId,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        if let Some(updated) = self
            .engine
            .initiate_onboarding(&candidate, actor, Utc::now())?
        {
            self.repository.replace_candidate(updated)?;
            info!(candidate = %candidate_id, actor = %actor.id, "onboarding initiated");
        }
        self.view(candidate_id, actor)
    }

    /// Status change asserted by the feedback or onboarding collaborators.
    pub fn observe_candidate_status(
        &self,
        candidate_id: &CandidateId,
        next: CandidateStatus,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        if let Some(updated) = self.engine.observe_candidate_status(&candidate, next, actor)? {
            self.repository.replace_candidate(updated)?;
            info!(
                candidate = %candidate_id,
                status = next.label(),
                "candidate status observed"
            );
        }
        self.view(candidate_id, actor)
    }

    pub fn append_remark(
        &self,
        candidate_id: &CandidateId,
        title: &str,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        let updated = self
            .engine
            .append_remark(&candidate, title, actor, Utc::now())?;
        self.repository.replace_candidate(updated)?;
        self.view(candidate_id, actor)
    }

    /// Stores the consent document and records its reference on the candidate.
    pub fn upload_consent_form(
        &self,
        candidate_id: &CandidateId,
        document: ConsentDocument,
        actor: &Actor,
    ) -> Result<PipelineView, PipelineError> {
        let candidate = self.load_candidate(candidate_id)?;
        let events = self.repository.events_for(candidate_id)?;
        self.engine
            .ensure_consent_allowed(&candidate, &events, &self.gating, actor)?;

        let reference = self.documents.store(candidate_id, document)?;
        let written = self
            .engine
            .attach_consent_form(&candidate, &events, &self.gating, reference.clone(), actor)
            .map_err(PipelineError::from)
            .and_then(|updated| {
                self.repository
                    .replace_candidate_given_events(updated, &events)
                    .map_err(PipelineError::from)
            });
        if let Err(error) = written {
            warn!(
                candidate = %candidate_id,
                document = %reference.0,
                %error,
                "consent form stored but not attached"
            );
            return Err(error);
        }

        info!(candidate = %candidate_id, actor = %actor.id, "consent form recorded");
        self.view(candidate_id, actor)
    }

    fn compose(
        &self,
        candidate: CandidateRecord,
        events: Vec<EventRecord>,
        actor: &Actor,
    ) -> PipelineView {
        let gates = self.gating.evaluate(&candidate, &events, actor);
        let authorizer = self.engine.authorizer();
        let events = events
            .into_iter()
            .map(|record| EventView {
                can_edit: authorizer.can_act(actor, PipelineAction::EditEvent(&record)),
                can_delete: authorizer.can_act(actor, PipelineAction::DeleteEvent(&record)),
                can_resolve: authorizer.can_act(actor, PipelineAction::ResolveEvent(&record)),
                record,
            })
            .collect();

        PipelineView {
            candidate,
            events,
            gates,
        }
    }

    fn load_candidate(&self, id: &CandidateId) -> Result<CandidateRecord, PipelineError> {
        self.repository
            .fetch_candidate(id)?
            .ok_or_else(|| PipelineError::NotFound(format!("candidate {id}")))
    }

    fn load_event(&self, id: &EventId) -> Result<EventRecord, PipelineError> {
        self.repository
            .fetch_event(id)?
            .ok_or_else(|| PipelineError::NotFound(format!("event {id}")))
    }

    fn notify_interviewer(&self, event: &EventRecord) {
        if event.interviewer.is_empty() {
            return;
        }

        let notice = FeedbackLinkNotice {
            event_id: event.id.clone(),
            candidate_id: event.candidate_id.clone(),
            event_name: event.event_name.clone(),
            interviewer: event.interviewer.clone(),
            interview_date: event.interview_date,
            feedback_url: format!("{}/{}", self.feedback_base_url, event.id),
        };
        if let Err(error) = self.notifier.deliver(notice) {
            warn!(event = %event.id, %error, "feedback link delivery failed");
        }
    }
}

/// Error raised by the pipeline orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("forbidden: {0}")]
    Forbidden(Denial),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentStoreError),
}

impl From<TransitionError> for PipelineError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::Forbidden(denial) => PipelineError::Forbidden(denial),
            TransitionError::InvalidInput(message) => PipelineError::InvalidInput(message),
            TransitionError::Conflict(message) => PipelineError::Conflict(message),
        }
    }
}

impl From<RepositoryError> for PipelineError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => {
                PipelineError::Conflict("record changed since it was read; reload and retry".into())
            }
            RepositoryError::NotFound => {
                PipelineError::NotFound("record no longer exists".to_string())
            }
            other => PipelineError::Repository(other),
        }
    }
}
