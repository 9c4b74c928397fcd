use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::pipeline::{
    ActorId, CandidateId, CandidateRecord, ConsentDocument, DocumentRef, DocumentStore,
    DocumentStoreError, FeedbackLinkNotice, FeedbackNotifier, InMemoryPipelineRepository,
    NotificationError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Upload accepted by [`InMemoryDocumentStore`], with its content type settled.
#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    pub(crate) candidate: CandidateId,
    pub(crate) content_type: mime::Mime,
    pub(crate) size: usize,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, StoredDocument>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn store(
        &self,
        candidate: &CandidateId,
        document: ConsentDocument,
    ) -> Result<DocumentRef, DocumentStoreError> {
        let content_type = if document.content_type == mime::APPLICATION_OCTET_STREAM {
            mime_guess::from_path(&document.file_name).first_or_octet_stream()
        } else {
            document.content_type
        };
        if content_type.type_() != mime::APPLICATION && content_type.type_() != mime::IMAGE {
            return Err(DocumentStoreError::Rejected(format!(
                "unsupported consent document type {content_type}"
            )));
        }

        let mut guard = self
            .documents
            .lock()
            .map_err(|_| DocumentStoreError::Unavailable("document store poisoned".to_string()))?;
        let key = format!(
            "documents/{candidate}/{:04}-{}",
            guard.len() + 1,
            document.file_name
        );
        guard.insert(
            key.clone(),
            StoredDocument {
                candidate: candidate.clone(),
                content_type,
                size: document.bytes.len(),
            },
        );
        Ok(DocumentRef(key))
    }
}

impl InMemoryDocumentStore {
    pub(crate) fn get(&self, reference: &DocumentRef) -> Option<StoredDocument> {
        self.documents
            .lock()
            .ok()
            .and_then(|guard| guard.get(&reference.0).cloned())
    }
}

/// Records feedback links and writes them to the log in place of an outbound mailer.
#[derive(Default, Clone)]
pub(crate) struct LoggingFeedbackNotifier {
    sent: Arc<Mutex<Vec<FeedbackLinkNotice>>>,
}

impl FeedbackNotifier for LoggingFeedbackNotifier {
    fn deliver(&self, notice: FeedbackLinkNotice) -> Result<(), NotificationError> {
        info!(
            event = %notice.event_id,
            candidate = %notice.candidate_id,
            interviewer = %notice.interviewer,
            url = %notice.feedback_url,
            "feedback link dispatched"
        );
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox poisoned".to_string()))?;
        guard.push(notice);
        Ok(())
    }
}

impl LoggingFeedbackNotifier {
    pub(crate) fn sent(&self) -> Vec<FeedbackLinkNotice> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Candidates preloaded by `serve --seed-demo` and the CLI walkthrough.
pub(crate) fn demo_candidates() -> Vec<CandidateRecord> {
    let recruiter = ActorId("rec-1".to_string());
    vec![
        CandidateRecord::new("cand-001", "Ada Lovelace").assigned(&recruiter),
        CandidateRecord::new("cand-002", "Alan Turing").assigned(&recruiter),
        CandidateRecord::new("cand-003", "Katherine Johnson"),
    ]
}

pub(crate) fn load_candidates(path: &Path) -> Result<Vec<CandidateRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let candidates: Vec<CandidateRecord> = serde_json::from_str(&raw)?;
    info!(count = candidates.len(), path = %path.display(), "candidate seed loaded");
    Ok(candidates)
}

pub(crate) fn build_repository(
    candidates: Vec<CandidateRecord>,
) -> Result<InMemoryPipelineRepository, AppError> {
    Ok(InMemoryPipelineRepository::with_candidates(candidates)?)
}
