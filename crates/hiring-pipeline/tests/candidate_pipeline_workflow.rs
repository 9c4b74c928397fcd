use std::sync::{Arc, Mutex};

use hiring_pipeline::config::PipelineConfig;
use hiring_pipeline::workflows::pipeline::{
    Actor, CandidateId, CandidateRecord, CandidateStatus, ConsentDocument, DocumentRef,
    DocumentStore, DocumentStoreError, EventDecision, EventId, EventPayload, EventStatus,
    FeedbackLinkNotice, FeedbackNotifier, InMemoryPipelineRepository, NotificationError,
    PipelineError, PipelineOrchestrator, Role,
};

#[derive(Default)]
struct VaultDocuments {
    stored: Mutex<Vec<String>>,
}

impl DocumentStore for VaultDocuments {
    fn store(
        &self,
        candidate: &CandidateId,
        document: ConsentDocument,
    ) -> Result<DocumentRef, DocumentStoreError> {
        if document.bytes.is_empty() {
            return Err(DocumentStoreError::Rejected("empty upload".to_string()));
        }
        let reference = format!("vault://{candidate}/{}", document.file_name);
        self.stored
            .lock()
            .expect("vault mutex poisoned")
            .push(reference.clone());
        Ok(DocumentRef(reference))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<FeedbackLinkNotice>>,
}

impl FeedbackNotifier for Outbox {
    fn deliver(&self, notice: FeedbackLinkNotice) -> Result<(), NotificationError> {
        self.sent.lock().expect("outbox mutex poisoned").push(notice);
        Ok(())
    }
}

type Pipeline = PipelineOrchestrator<InMemoryPipelineRepository, VaultDocuments, Outbox>;

fn recruiter() -> Actor {
    Actor::new("rec-7", Role::Recruiter)
}

fn sourcing_lead() -> Actor {
    Actor::new("src-1", Role::Sourcing)
}

fn feedback_service() -> Actor {
    Actor::new("feedback-svc", Role::Integration)
}

fn candidate() -> CandidateId {
    CandidateId("cand-042".to_string())
}

fn pipeline() -> (Pipeline, Arc<Outbox>) {
    let seeded = CandidateRecord::new("cand-042", "Grace Hopper").assigned(&recruiter().id);
    let repository = Arc::new(
        InMemoryPipelineRepository::with_candidates([seeded]).expect("seed candidate"),
    );
    let outbox = Arc::new(Outbox::default());
    let config = PipelineConfig {
        feedback_base_url: "https://hire.example/feedback".to_string(),
        ..PipelineConfig::default()
    };
    let service = PipelineOrchestrator::new(
        repository,
        Arc::new(VaultDocuments::default()),
        outbox.clone(),
        &config,
    );
    (service, outbox)
}

fn round(name: &str, date: &str) -> EventPayload {
    EventPayload {
        event_name: Some(name.to_string()),
        interviewer: "Linus Panel".to_string(),
        organization: Some("Initech".to_string()),
        interview_date: date.to_string(),
        meeting_link: None,
    }
}

fn schedule(service: &Pipeline, name: &str, date: &str) -> EventId {
    let view = service
        .create_event(&candidate(), round(name, date), &recruiter())
        .expect("recruiter schedules round");
    view.events
        .iter()
        .find(|event| event.record.event_name.label() == name)
        .map(|event| event.record.id.clone())
        .expect("scheduled round listed")
}

fn approve(service: &Pipeline, id: &EventId) {
    service
        .record_feedback_submitted(id, &feedback_service())
        .expect("feedback lands");
    service
        .resolve_event(id, EventDecision::Approved, &recruiter())
        .expect("round approved");
}

#[test]
fn candidate_moves_from_first_round_to_onboarding() {
    let (service, outbox) = pipeline();

    let screening = schedule(&service, "Screening", "2025-06-02T09:00:00Z");
    let technical = schedule(&service, "Technical Round 1", "2025-06-05T14:30:00Z");

    let sent = outbox.sent.lock().expect("outbox mutex poisoned").clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].feedback_url,
        format!("https://hire.example/feedback/{screening}")
    );

    let view = service.view(&candidate(), &recruiter()).expect("view");
    assert_eq!(view.events[0].record.id, screening, "ordered by interview date");
    assert!(!view.gates.consent_upload_enabled);

    approve(&service, &screening);
    let view = service.view(&candidate(), &recruiter()).expect("view");
    assert_eq!(view.gates.approved_count, 1);
    assert!(!view.gates.consent_upload_enabled);

    approve(&service, &technical);
    let view = service.view(&candidate(), &recruiter()).expect("view");
    assert_eq!(view.gates.approved_count, 2);
    assert!(view.gates.consent_upload_enabled);
    assert!(view.gates.can_upload_consent);

    let view = service
        .upload_consent_form(
            &candidate(),
            ConsentDocument {
                file_name: "consent.pdf".to_string(),
                content_type: mime::APPLICATION_PDF,
                bytes: b"%PDF-1.4".to_vec(),
            },
            &recruiter(),
        )
        .expect("consent stored");
    assert_eq!(
        view.candidate.consent_form.as_ref().map(|doc| doc.0.as_str()),
        Some("vault://cand-042/consent.pdf")
    );

    let view = service
        .observe_candidate_status(&candidate(), CandidateStatus::Submitted, &feedback_service())
        .expect("submitted to client");
    assert_eq!(view.candidate.status, CandidateStatus::Submitted);

    let view = service
        .initiate_onboarding(&candidate(), &sourcing_lead())
        .expect("onboarding starts");
    let onboarding = view.candidate.onboarding.expect("onboarding recorded");
    assert_eq!(onboarding.initiated_by, sourcing_lead().id);
}

#[test]
fn rejected_candidate_is_closed_to_further_scheduling() {
    let (service, _outbox) = pipeline();
    let screening = schedule(&service, "Screening", "2025-06-02");

    let self_reported = service
        .record_feedback_submitted(&screening, &recruiter())
        .expect_err("only the feedback collaborator reports submissions");
    assert!(matches!(self_reported, PipelineError::Forbidden(_)));
    service
        .record_feedback_submitted(&screening, &feedback_service())
        .expect("feedback lands");
    let view = service
        .resolve_event(&screening, EventDecision::Rejected, &recruiter())
        .expect("round rejected");
    assert_eq!(view.gates.rejected_count, 1);
    assert_eq!(
        view.event(&screening).map(|event| event.record.status),
        Some(EventStatus::Rejected)
    );

    let denied = service
        .reject_candidate(&candidate(), &recruiter())
        .expect_err("recruiters cannot close the pipeline");
    assert!(matches!(denied, PipelineError::Forbidden(_)));

    let view = service
        .reject_candidate(&candidate(), &sourcing_lead())
        .expect("sourcing rejects");
    assert_eq!(view.candidate.status, CandidateStatus::Rejected);
    assert!(!view.gates.can_add_event);

    let refused = service
        .create_event(
            &candidate(),
            round("Technical Round 1", "2025-06-09"),
            &recruiter(),
        )
        .expect_err("closed candidates take no new rounds");
    assert!(matches!(refused, PipelineError::Forbidden(_)));
}

#[test]
fn unknown_candidates_are_reported_missing() {
    let (service, _outbox) = pipeline();
    let missing = CandidateId("cand-404".to_string());

    let error = service
        .view(&missing, &recruiter())
        .expect_err("no such candidate");
    assert!(matches!(error, PipelineError::NotFound(_)));

    let error = service
        .create_event(&missing, round("Screening", "2025-06-02"), &recruiter())
        .expect_err("no such candidate");
    assert!(matches!(error, PipelineError::NotFound(_)));
}
