use serde::Serialize;

use super::authorizer::{PipelineAction, RoleAuthorizer};
use super::domain::{Actor, CandidateRecord, EventRecord, EventStatus};

pub const DEFAULT_CONSENT_MIN_APPROVALS: usize = 2;

/// Derived enablement of the actions that depend on a candidate's event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateView {
    pub approved_count: usize,
    pub rejected_count: usize,
    pub consent_upload_enabled: bool,
    pub can_add_event: bool,
    pub can_reject_candidate: bool,
    pub can_initiate_onboarding: bool,
    pub can_upload_consent: bool,
}

/// Aggregates event outcomes into gate decisions.
///
/// Any rejected round vetoes consent upload no matter how many approvals follow it.
#[derive(Debug, Clone)]
pub struct GatingPolicy {
    min_approvals: usize,
    authorizer: RoleAuthorizer,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CONSENT_MIN_APPROVALS)
    }
}

impl GatingPolicy {
    pub fn new(min_approvals: usize) -> Self {
        Self {
            min_approvals: min_approvals.max(1),
            authorizer: RoleAuthorizer,
        }
    }

    pub fn min_approvals(&self) -> usize {
        self.min_approvals
    }

    pub fn approved_count(&self, events: &[EventRecord]) -> usize {
        count_status(events, EventStatus::Approved)
    }

    pub fn rejected_count(&self, events: &[EventRecord]) -> usize {
        count_status(events, EventStatus::Rejected)
    }

    pub fn consent_upload_enabled(&self, events: &[EventRecord]) -> bool {
        self.approved_count(events) >= self.min_approvals && self.rejected_count(events) == 0
    }

    pub fn can_add_event(&self, candidate: &CandidateRecord, actor: &Actor) -> bool {
        self.authorizer
            .can_act(actor, PipelineAction::CreateEvent(candidate))
    }

    pub fn evaluate(
        &self,
        candidate: &CandidateRecord,
        events: &[EventRecord],
        actor: &Actor,
    ) -> GateView {
        let consent_upload_enabled = self.consent_upload_enabled(events);
        GateView {
            approved_count: self.approved_count(events),
            rejected_count: self.rejected_count(events),
            consent_upload_enabled,
            can_add_event: self.can_add_event(candidate, actor),
            can_reject_candidate: self
                .authorizer
                .can_act(actor, PipelineAction::RejectCandidate(candidate)),
            can_initiate_onboarding: self
                .authorizer
                .can_act(actor, PipelineAction::InitiateOnboarding(candidate)),
            can_upload_consent: consent_upload_enabled
                && self
                    .authorizer
                    .can_act(actor, PipelineAction::UploadConsent(candidate)),
        }
    }
}

fn count_status(events: &[EventRecord], status: EventStatus) -> usize {
    events.iter().filter(|event| event.status == status).count()
}
