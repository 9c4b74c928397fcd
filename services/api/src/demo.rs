use crate::infra::{
    build_repository, demo_candidates, InMemoryDocumentStore, LoggingFeedbackNotifier,
};
use clap::Args;
use hiring_pipeline::config::PipelineConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::pipeline::{
    Actor, CandidateId, CandidateStatus, ConsentDocument, EventDecision, EventId,
    EventNamePolicy, EventPayload, InMemoryPipelineRepository, PipelineOrchestrator,
    PipelineView, Role,
};
use std::sync::Arc;

type DemoPipeline =
    PipelineOrchestrator<InMemoryPipelineRepository, InMemoryDocumentStore, LoggingFeedbackNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Approved rounds required before the consent form unlocks.
    #[arg(long)]
    pub(crate) consent_min_approvals: Option<usize>,
    /// Only accept the known round names for each role.
    #[arg(long)]
    pub(crate) strict_event_names: bool,
    /// Print the final pipeline view as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        consent_min_approvals,
        strict_event_names,
        json,
    } = args;

    let mut config = PipelineConfig::default();
    if let Some(threshold) = consent_min_approvals {
        config.consent_min_approvals = threshold.max(1);
    }
    if strict_event_names {
        config.event_names = EventNamePolicy::Strict;
    }

    let notifier = LoggingFeedbackNotifier::default();
    let service: DemoPipeline = PipelineOrchestrator::new(
        Arc::new(build_repository(demo_candidates())?),
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(notifier.clone()),
        &config,
    );

    let recruiter = Actor::new("rec-1", Role::Recruiter);
    let colleague = Actor::new("rec-2", Role::Recruiter);
    let sourcing = Actor::new("src-1", Role::Sourcing);
    let feedback_service = Actor::new("feedback-svc", Role::Integration);
    let candidate = CandidateId("cand-001".to_string());

    println!("Hiring pipeline demo");
    let view = service.view(&candidate, &recruiter)?;
    println!(
        "Candidate {} ({}) assigned to {}",
        view.candidate.name,
        view.candidate.id,
        view.candidate
            .assigned_to
            .as_ref()
            .map(|owner| owner.0.as_str())
            .unwrap_or("nobody")
    );
    render_gates(&view);

    println!("\nScheduling rounds");
    let rounds = [
        ("Screening", "2025-06-02T09:00:00Z"),
        ("Technical Round 1", "2025-06-04T13:00:00Z"),
        ("Managerial Round", "2025-06-06T10:30:00Z"),
    ];
    let mut scheduled = Vec::new();
    for (name, date) in rounds {
        let view = service.create_event(&candidate, demo_payload(name, date), &recruiter)?;
        if let Some(event) = view
            .events
            .iter()
            .find(|event| event.record.event_name.label() == name)
        {
            println!("  {} scheduled as {}", name, event.record.id);
            scheduled.push(event.record.id.clone());
        }
    }

    match service.create_event(
        &candidate,
        demo_payload("HR Round", "2025-06-07T09:00:00Z"),
        &colleague,
    ) {
        Ok(_) => println!(
            "  Unexpected: {} scheduled for a candidate they do not own",
            colleague.id
        ),
        Err(err) => println!("  {} refused: {}", colleague.id, err),
    }

    println!("\nRecording outcomes");
    let decisions = [
        EventDecision::Approved,
        EventDecision::Approved,
        EventDecision::Rejected,
    ];
    for (id, decision) in scheduled.iter().zip(decisions) {
        let view = resolve(&service, id, decision, &recruiter, &feedback_service)?;
        println!(
            "  {} -> {:?}; approved {} / rejected {}; consent unlocked: {}",
            id,
            decision,
            view.gates.approved_count,
            view.gates.rejected_count,
            view.gates.consent_upload_enabled
        );
    }

    if let Some(first) = scheduled.first() {
        match service.resolve_event(first, EventDecision::Rejected, &recruiter) {
            Ok(_) => println!("  Unexpected: {} resolved twice", first),
            Err(err) => println!("  Second resolution of {} refused: {}", first, err),
        }
    }

    println!("\nConsent and onboarding");
    let view = service.upload_consent_form(
        &candidate,
        ConsentDocument {
            file_name: "consent.pdf".to_string(),
            content_type: mime::APPLICATION_OCTET_STREAM,
            bytes: b"%PDF-1.7 demo consent".to_vec(),
        },
        &recruiter,
    );
    match view {
        Ok(view) => println!(
            "  Consent stored at {}",
            view.candidate
                .consent_form
                .as_ref()
                .map(|doc| doc.0.as_str())
                .unwrap_or("-")
        ),
        Err(err) => println!("  Consent upload refused: {}", err),
    }

    service.observe_candidate_status(&candidate, CandidateStatus::Submitted, &feedback_service)?;
    let view = service.initiate_onboarding(&candidate, &sourcing)?;
    println!(
        "  Onboarding initiated by {}; candidate status {}",
        sourcing.id,
        view.candidate.status.label()
    );
    render_gates(&view);

    let notices = notifier.sent();
    println!("\nFeedback links dispatched: {}", notices.len());
    for notice in &notices {
        println!(
            "  {} for {} on {} -> {}",
            notice.interviewer,
            notice.event_name.label(),
            notice.interview_date.format("%Y-%m-%d %H:%M"),
            notice.feedback_url
        );
    }

    if json {
        match serde_json::to_string_pretty(&view) {
            Ok(payload) => println!("\nFinal pipeline view:\n{}", payload),
            Err(err) => println!("\nFinal pipeline view unavailable: {}", err),
        }
    }

    Ok(())
}

fn demo_payload(name: &str, date: &str) -> EventPayload {
    EventPayload {
        event_name: Some(name.to_string()),
        interviewer: "Dana Reviewer".to_string(),
        organization: Some("Acme Corp".to_string()),
        interview_date: date.to_string(),
        meeting_link: Some("https://meet.example/acme".to_string()),
    }
}

fn resolve(
    service: &DemoPipeline,
    id: &EventId,
    decision: EventDecision,
    creator: &Actor,
    collaborator: &Actor,
) -> Result<PipelineView, AppError> {
    service.record_feedback_submitted(id, collaborator)?;
    Ok(service.resolve_event(id, decision, creator)?)
}

fn render_gates(view: &PipelineView) {
    let gates = &view.gates;
    println!(
        "  Gates: add event {}, reject {}, onboard {}, upload consent {}",
        yes_no(gates.can_add_event),
        yes_no(gates.can_reject_candidate),
        yes_no(gates.can_initiate_onboarding),
        yes_no(gates.can_upload_consent)
    );
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
