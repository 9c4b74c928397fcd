use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, CandidateRecord, DocumentRef, EventId, EventName, EventRecord};

/// Storage abstraction for candidates and their events.
///
/// `replace_*` and `remove_event` are conditional: they succeed only when the stored record's
/// `version` still equals the version the caller read, and they bump the version on success.
/// A mismatch is a `Conflict`; a vanished record is `NotFound`.
///
/// `insert_event` is conditional on the owning candidate's version, and
/// `replace_candidate_given_events` additionally requires the candidate's event history to be
/// exactly the `(id, version)` set the caller evaluated. Both checks and the write happen as
/// one atomic step.
pub trait PipelineRepository: Send + Sync {
    fn fetch_candidate(&self, id: &CandidateId)
        -> Result<Option<CandidateRecord>, RepositoryError>;
    fn events_for(&self, candidate: &CandidateId) -> Result<Vec<EventRecord>, RepositoryError>;
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError>;
    fn insert_candidate(&self, record: CandidateRecord)
        -> Result<CandidateRecord, RepositoryError>;
    fn insert_event(
        &self,
        record: EventRecord,
        candidate_version: u64,
    ) -> Result<EventRecord, RepositoryError>;
    fn replace_candidate(
        &self,
        record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError>;
    fn replace_candidate_given_events(
        &self,
        record: CandidateRecord,
        observed_events: &[EventRecord],
    ) -> Result<CandidateRecord, RepositoryError>;
    fn replace_event(&self, record: EventRecord) -> Result<EventRecord, RepositoryError>;
    fn remove_event(
        &self,
        id: &EventId,
        expected_version: u64,
    ) -> Result<EventRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("stored record changed since it was read")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Uploaded consent form handed to the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentDocument {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

/// File store accepting consent uploads and returning an opaque reference.
///
/// Documents are stored before the candidate write commits. When that write loses a
/// conflict the stored document is not referenced by any candidate; the orchestrator logs its
/// reference at `warn` so the store can collect it.
pub trait DocumentStore: Send + Sync {
    fn store(
        &self,
        candidate: &CandidateId,
        document: ConsentDocument,
    ) -> Result<DocumentRef, DocumentStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document rejected: {0}")]
    Rejected(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Feedback link delivered to an interviewer when a round is scheduled or rescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLinkNotice {
    pub event_id: EventId,
    pub candidate_id: CandidateId,
    pub event_name: EventName,
    pub interviewer: String,
    pub interview_date: DateTime<Utc>,
    pub feedback_url: String,
}

/// Outbound channel for feedback links (e-mail, chat, ...).
pub trait FeedbackNotifier: Send + Sync {
    fn deliver(&self, notice: FeedbackLinkNotice) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
