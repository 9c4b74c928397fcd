use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::pipeline::domain::{
    Actor, ActorId, CandidateId, CandidateRecord, CandidateStatus, DocumentRef, EventDecision,
    EventId, EventPayload, EventRecord, EventStatus, Role,
};
use crate::workflows::pipeline::gating::GatingPolicy;
use crate::workflows::pipeline::repository::{
    ConsentDocument, DocumentStore, DocumentStoreError, FeedbackLinkNotice, FeedbackNotifier,
    NotificationError, PipelineRepository, RepositoryError,
};
use crate::workflows::pipeline::transition::TransitionEngine;
use crate::workflows::pipeline::{InMemoryPipelineRepository, PipelineOrchestrator};

pub(super) const CANDIDATE: &str = "cand-001";
pub(super) const FEEDBACK_BASE_URL: &str = "https://hire.example/feedback/";

pub(super) fn owner() -> Actor {
    Actor::new("u1", Role::Recruiter)
}

pub(super) fn other_recruiter() -> Actor {
    Actor::new("u2", Role::Recruiter)
}

pub(super) fn sourcing() -> Actor {
    Actor::new("s1", Role::Sourcing)
}

pub(super) fn feedback_service() -> Actor {
    Actor::new("feedback-svc", Role::Integration)
}

pub(super) fn candidate_id() -> CandidateId {
    CandidateId(CANDIDATE.to_string())
}

pub(super) fn assigned_candidate() -> CandidateRecord {
    CandidateRecord::new(CANDIDATE, "Ada Lovelace").assigned(&ActorId("u1".to_string()))
}

pub(super) fn candidate_with_status(status: CandidateStatus) -> CandidateRecord {
    let mut candidate = assigned_candidate();
    candidate.status = status;
    candidate
}

pub(super) fn payload(name: &str) -> EventPayload {
    EventPayload {
        event_name: Some(name.to_string()),
        interviewer: "Dana Reviewer".to_string(),
        organization: Some("Acme Corp".to_string()),
        interview_date: "2025-05-01T10:00:00Z".to_string(),
        meeting_link: Some("https://meet.example/round".to_string()),
    }
}

pub(super) fn event_with_status(id: &str, scheduled_by: &str, status: EventStatus) -> EventRecord {
    let mut event = TransitionEngine::default()
        .create_event(
            &assigned_candidate(),
            payload("Screening"),
            &owner(),
            EventId(id.to_string()),
        )
        .expect("fixture event");
    event.scheduled_by = ActorId(scheduled_by.to_string());
    event.status = status;
    event
}

pub(super) fn events_with(statuses: &[EventStatus]) -> Vec<EventRecord> {
    statuses
        .iter()
        .enumerate()
        .map(|(index, status)| event_with_status(&format!("e-{index}"), "u1", *status))
        .collect()
}

pub(super) type TestOrchestrator =
    PipelineOrchestrator<InMemoryPipelineRepository, MemoryDocuments, MemoryNotifier>;

pub(super) struct Harness {
    pub(super) service: TestOrchestrator,
    pub(super) repository: Arc<InMemoryPipelineRepository>,
    pub(super) documents: Arc<MemoryDocuments>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

pub(super) fn harness() -> Harness {
    harness_with(TransitionEngine::default(), MemoryNotifier::default())
}

pub(super) fn harness_with(engine: TransitionEngine, notifier: MemoryNotifier) -> Harness {
    let repository = Arc::new(
        InMemoryPipelineRepository::with_candidates([assigned_candidate()])
            .expect("seed candidate"),
    );
    let documents = Arc::new(MemoryDocuments::default());
    let notifier = Arc::new(notifier);
    let service = PipelineOrchestrator::with_parts(
        repository.clone(),
        documents.clone(),
        notifier.clone(),
        engine,
        GatingPolicy::default(),
        FEEDBACK_BASE_URL.to_string(),
    );
    Harness {
        service,
        repository,
        documents,
        notifier,
    }
}

impl Harness {
    /// Schedules an event as the owner and returns its id.
    pub(super) fn schedule(&self, name: &str) -> EventId {
        let before: Vec<EventId> = self
            .repository
            .events_for(&candidate_id())
            .expect("list events")
            .into_iter()
            .map(|event| event.id)
            .collect();
        let view = self
            .service
            .create_event(&candidate_id(), payload(name), &owner())
            .expect("owner schedules event");
        view.events
            .iter()
            .map(|event| event.record.id.clone())
            .find(|id| !before.contains(id))
            .expect("new event in view")
    }

    /// Schedules, receives feedback for, and resolves an event.
    pub(super) fn resolved(&self, name: &str, decision: EventDecision) -> EventId {
        let id = self.schedule(name);
        self.service
            .record_feedback_submitted(&id, &feedback_service())
            .expect("feedback recorded");
        self.service
            .resolve_event(&id, decision, &owner())
            .expect("owner resolves event");
        id
    }
}

pub(super) fn consent_document() -> ConsentDocument {
    ConsentDocument {
        file_name: "consent.pdf".to_string(),
        content_type: mime::APPLICATION_PDF,
        bytes: b"%PDF-1.7 signed".to_vec(),
    }
}

#[derive(Default)]
pub(super) struct MemoryDocuments {
    stored: Mutex<HashMap<String, ConsentDocument>>,
}

impl MemoryDocuments {
    pub(super) fn count(&self) -> usize {
        self.stored.lock().expect("document mutex poisoned").len()
    }
}

impl DocumentStore for MemoryDocuments {
    fn store(
        &self,
        candidate: &CandidateId,
        document: ConsentDocument,
    ) -> Result<DocumentRef, DocumentStoreError> {
        let mut stored = self.stored.lock().expect("document mutex poisoned");
        let key = format!("memory://{}/{}/{}", candidate, stored.len() + 1, document.file_name);
        stored.insert(key.clone(), document);
        Ok(DocumentRef(key))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    notices: Mutex<Vec<FeedbackLinkNotice>>,
    fail: bool,
}

impl MemoryNotifier {
    pub(super) fn failing() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn notices(&self) -> Vec<FeedbackLinkNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl FeedbackNotifier for MemoryNotifier {
    fn deliver(&self, notice: FeedbackLinkNotice) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Transport("smtp offline".to_string()));
        }
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl PipelineRepository for UnavailableRepository {
    fn fetch_candidate(
        &self,
        _id: &CandidateId,
    ) -> Result<Option<CandidateRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn events_for(&self, _candidate: &CandidateId) -> Result<Vec<EventRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_event(&self, _id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_candidate(
        &self,
        _record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_event(
        &self,
        _record: EventRecord,
        _candidate_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_candidate(
        &self,
        _record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_candidate_given_events(
        &self,
        _record: CandidateRecord,
        _observed_events: &[EventRecord],
    ) -> Result<CandidateRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_event(&self, _record: EventRecord) -> Result<EventRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove_event(
        &self,
        _id: &EventId,
        _expected_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

type Hook = Box<dyn FnOnce(&InMemoryPipelineRepository) + Send>;

/// Delegates to an in-memory store and runs a one-shot hook right after a read returns, so a
/// competing write can land between an orchestrator's read and its conditional write.
pub(super) struct InterleavingRepository {
    inner: Arc<InMemoryPipelineRepository>,
    after_fetch_candidate: Mutex<Option<Hook>>,
    after_events_for: Mutex<Option<Hook>>,
}

impl InterleavingRepository {
    pub(super) fn new(inner: Arc<InMemoryPipelineRepository>) -> Self {
        Self {
            inner,
            after_fetch_candidate: Mutex::new(None),
            after_events_for: Mutex::new(None),
        }
    }

    pub(super) fn after_fetch_candidate(
        self,
        hook: impl FnOnce(&InMemoryPipelineRepository) + Send + 'static,
    ) -> Self {
        *self.after_fetch_candidate.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
        self
    }

    pub(super) fn after_events_for(
        self,
        hook: impl FnOnce(&InMemoryPipelineRepository) + Send + 'static,
    ) -> Self {
        *self.after_events_for.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
        self
    }

    fn fire(&self, slot: &Mutex<Option<Hook>>) {
        let hook = slot.lock().expect("hook mutex poisoned").take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
    }
}

impl PipelineRepository for InterleavingRepository {
    fn fetch_candidate(
        &self,
        id: &CandidateId,
    ) -> Result<Option<CandidateRecord>, RepositoryError> {
        let candidate = self.inner.fetch_candidate(id)?;
        self.fire(&self.after_fetch_candidate);
        Ok(candidate)
    }

    fn events_for(&self, candidate: &CandidateId) -> Result<Vec<EventRecord>, RepositoryError> {
        let events = self.inner.events_for(candidate)?;
        self.fire(&self.after_events_for);
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        self.inner.fetch_event(id)
    }

    fn insert_candidate(
        &self,
        record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        self.inner.insert_candidate(record)
    }

    fn insert_event(
        &self,
        record: EventRecord,
        candidate_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        self.inner.insert_event(record, candidate_version)
    }

    fn replace_candidate(
        &self,
        record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        self.inner.replace_candidate(record)
    }

    fn replace_candidate_given_events(
        &self,
        record: CandidateRecord,
        observed_events: &[EventRecord],
    ) -> Result<CandidateRecord, RepositoryError> {
        self.inner
            .replace_candidate_given_events(record, observed_events)
    }

    fn replace_event(&self, record: EventRecord) -> Result<EventRecord, RepositoryError> {
        self.inner.replace_event(record)
    }

    fn remove_event(
        &self,
        id: &EventId,
        expected_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        self.inner.remove_event(id, expected_version)
    }
}

pub(super) fn interleaved_service(
    repository: InterleavingRepository,
    documents: Arc<MemoryDocuments>,
) -> PipelineOrchestrator<InterleavingRepository, MemoryDocuments, MemoryNotifier> {
    PipelineOrchestrator::with_parts(
        Arc::new(repository),
        documents,
        Arc::new(MemoryNotifier::default()),
        TransitionEngine::default(),
        GatingPolicy::default(),
        FEEDBACK_BASE_URL.to_string(),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
