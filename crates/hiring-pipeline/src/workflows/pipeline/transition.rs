use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::authorizer::{Denial, PipelineAction, RoleAuthorizer};
use super::domain::{
    parse_interview_date, Actor, CandidateRecord, CandidateStatus, DocumentRef, EventDecision,
    EventId, EventName, EventPatch, EventPayload, EventRecord, EventStatus, OnboardingRecord,
    Remark,
};
use super::gating::GatingPolicy;

/// How event names outside the known rounds are treated at scheduling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventNamePolicy {
    /// Ad hoc labels are stored as `Custom` and count towards gating like any other round.
    #[default]
    Permissive,
    /// Only known rounds from the acting role's family are accepted.
    Strict,
}

impl FromStr for EventNamePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown event name policy '{other}'")),
        }
    }
}

/// Why a transition was refused before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("forbidden: {0}")]
    Forbidden(Denial),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<Denial> for TransitionError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::EventNotSubmitted { .. } => TransitionError::Conflict(denial.to_string()),
            other => TransitionError::Forbidden(other),
        }
    }
}

/// Validates and applies status changes to candidate and event snapshots.
///
/// Every method is a pure function of the records handed in: it returns the record to write
/// (or `None` when the call is an idempotent no-op) and leaves persistence to the caller.
#[derive(Debug, Clone, Default)]
pub struct TransitionEngine {
    authorizer: RoleAuthorizer,
    name_policy: EventNamePolicy,
}

impl TransitionEngine {
    pub fn new(name_policy: EventNamePolicy) -> Self {
        Self {
            authorizer: RoleAuthorizer,
            name_policy,
        }
    }

    pub fn authorizer(&self) -> &RoleAuthorizer {
        &self.authorizer
    }

    pub fn name_policy(&self) -> EventNamePolicy {
        self.name_policy
    }

    pub fn create_event(
        &self,
        candidate: &CandidateRecord,
        payload: EventPayload,
        actor: &Actor,
        id: EventId,
    ) -> Result<EventRecord, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::CreateEvent(candidate))?;

        let raw_name = payload
            .event_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| TransitionError::InvalidInput("event name is required".to_string()))?;
        let event_name = self.validate_name(raw_name, actor)?;
        let interview_date =
            parse_interview_date(&payload.interview_date).map_err(TransitionError::InvalidInput)?;

        Ok(EventRecord {
            id,
            candidate_id: candidate.id.clone(),
            event_name,
            status: EventStatus::Pending,
            scheduled_by: actor.id.clone(),
            interviewer: payload.interviewer.trim().to_string(),
            organization: non_blank(payload.organization),
            interview_date,
            meeting_link: non_blank(payload.meeting_link),
            version: 0,
        })
    }

    /// Replaces scheduling fields in place. Status and creator are never touched.
    pub fn edit_event(
        &self,
        event: &EventRecord,
        patch: EventPatch,
        actor: &Actor,
    ) -> Result<EventRecord, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::EditEvent(event))?;

        let mut updated = event.clone();
        if let Some(raw_name) = patch.event_name {
            let trimmed = raw_name.trim();
            if trimmed.is_empty() {
                return Err(TransitionError::InvalidInput(
                    "event name cannot be blank".to_string(),
                ));
            }
            updated.event_name = self.validate_name(trimmed, actor)?;
        }
        if let Some(raw_date) = patch.interview_date {
            updated.interview_date =
                parse_interview_date(&raw_date).map_err(TransitionError::InvalidInput)?;
        }
        if let Some(interviewer) = patch.interviewer {
            updated.interviewer = interviewer.trim().to_string();
        }
        if patch.organization.is_some() {
            updated.organization = non_blank(patch.organization);
        }
        if patch.meeting_link.is_some() {
            updated.meeting_link = non_blank(patch.meeting_link);
        }
        Ok(updated)
    }

    pub fn delete_event(&self, event: &EventRecord, actor: &Actor) -> Result<(), TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::DeleteEvent(event))?;
        Ok(())
    }

    /// Moves a `submitted` event to its terminal decision. Any other source state conflicts.
    pub fn resolve_event(
        &self,
        event: &EventRecord,
        decision: EventDecision,
        actor: &Actor,
    ) -> Result<EventRecord, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::ResolveEvent(event))?;

        let mut updated = event.clone();
        updated.status = EventStatus::from(decision);
        Ok(updated)
    }

    /// Feedback collaborator hook: an evaluation was recorded for a pending event.
    pub fn record_feedback_submitted(
        &self,
        event: &EventRecord,
        actor: &Actor,
    ) -> Result<Option<EventRecord>, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::SubmitFeedback(event))?;
        match event.status {
            EventStatus::Pending => {
                let mut updated = event.clone();
                updated.status = EventStatus::Submitted;
                Ok(Some(updated))
            }
            EventStatus::Submitted => Ok(None),
            resolved => Err(TransitionError::Conflict(format!(
                "event is already {} and cannot take new feedback",
                resolved.label()
            ))),
        }
    }

    /// Explicit rejection. Returns `None` when the candidate is already rejected.
    pub fn reject_candidate(
        &self,
        candidate: &CandidateRecord,
        actor: &Actor,
    ) -> Result<Option<CandidateRecord>, TransitionError> {
        let action = PipelineAction::RejectCandidate(candidate);
        if candidate.status == CandidateStatus::Rejected {
            return match self.authorizer.authorize(actor, action) {
                Err(Denial::CandidateClosed { .. }) => Ok(None),
                Err(denial) => Err(denial.into()),
                Ok(()) => Ok(None),
            };
        }

        self.authorizer.authorize(actor, action)?;
        self.transition_candidate(candidate, CandidateStatus::Rejected)
            .map(Some)
    }

    /// Records the onboarding hand-off. Returns `None` when onboarding was already initiated.
    pub fn initiate_onboarding(
        &self,
        candidate: &CandidateRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<CandidateRecord>, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::InitiateOnboarding(candidate))?;
        if candidate.onboarding.is_some() {
            return Ok(None);
        }

        let mut updated = candidate.clone();
        updated.onboarding = Some(OnboardingRecord {
            initiated_by: actor.id.clone(),
            initiated_at: now,
        });
        Ok(Some(updated))
    }

    /// Applies a transition asserted by an external collaborator (assignment, submission,
    /// client approval, onboarding completion). Rejection must go through `reject_candidate`.
    pub fn observe_candidate_status(
        &self,
        candidate: &CandidateRecord,
        next: CandidateStatus,
        actor: &Actor,
    ) -> Result<Option<CandidateRecord>, TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::ObserveStatus(candidate))?;
        if next == CandidateStatus::Rejected {
            return Err(TransitionError::InvalidInput(
                "rejection requires the explicit reject action".to_string(),
            ));
        }
        if candidate.status == next {
            return Ok(None);
        }
        self.transition_candidate(candidate, next).map(Some)
    }

    pub fn append_remark(
        &self,
        candidate: &CandidateRecord,
        title: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CandidateRecord, TransitionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TransitionError::InvalidInput(
                "remark title is required".to_string(),
            ));
        }

        let mut updated = candidate.clone();
        updated.remarks.push(Remark {
            title: title.to_string(),
            date: now,
            author: actor.id.clone(),
        });
        Ok(updated)
    }

    /// Records a consent reference once the gate is open. A reference can be replaced by a
    /// newer upload but never cleared.
    pub fn attach_consent_form(
        &self,
        candidate: &CandidateRecord,
        events: &[EventRecord],
        gating: &GatingPolicy,
        document: DocumentRef,
        actor: &Actor,
    ) -> Result<CandidateRecord, TransitionError> {
        self.ensure_consent_allowed(candidate, events, gating, actor)?;
        let mut updated = candidate.clone();
        updated.consent_form = Some(document);
        Ok(updated)
    }

    /// Checked before a document is handed to the store, and again when it is attached.
    pub fn ensure_consent_allowed(
        &self,
        candidate: &CandidateRecord,
        events: &[EventRecord],
        gating: &GatingPolicy,
        actor: &Actor,
    ) -> Result<(), TransitionError> {
        self.authorizer
            .authorize(actor, PipelineAction::UploadConsent(candidate))?;
        if !gating.consent_upload_enabled(events) {
            return Err(TransitionError::Conflict(format!(
                "consent upload requires {} approved rounds and no rejected rounds",
                gating.min_approvals()
            )));
        }
        Ok(())
    }

    fn transition_candidate(
        &self,
        candidate: &CandidateRecord,
        next: CandidateStatus,
    ) -> Result<CandidateRecord, TransitionError> {
        if !candidate.status.can_transition_to(next) {
            return Err(TransitionError::Conflict(format!(
                "candidate cannot move from {} to {}",
                candidate.status.label(),
                next.label()
            )));
        }
        let mut updated = candidate.clone();
        updated.status = next;
        Ok(updated)
    }

    fn validate_name(&self, raw: &str, actor: &Actor) -> Result<EventName, TransitionError> {
        let name = EventName::parse(raw);
        if self.name_policy == EventNamePolicy::Permissive {
            return Ok(name);
        }

        let Some(family) = name.family() else {
            return Err(TransitionError::InvalidInput(format!(
                "'{raw}' is not a recognized interview round"
            )));
        };
        match actor.role.event_family() {
            Some(expected) if expected != family => Err(TransitionError::InvalidInput(format!(
                "'{}' is not scheduled by the {} role",
                name.label(),
                actor.role.label()
            ))),
            _ => Ok(name),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::domain::{ActorId, CandidateId, EventName, Role};

    fn owner() -> Actor {
        Actor::new("u1", Role::Recruiter)
    }

    fn feedback_service() -> Actor {
        Actor::new("feedback-svc", Role::Integration)
    }

    fn candidate() -> CandidateRecord {
        CandidateRecord::new("c-1", "Ada").assigned(&ActorId("u1".to_string()))
    }

    fn payload(name: &str) -> EventPayload {
        EventPayload {
            event_name: Some(name.to_string()),
            interviewer: " Dana ".to_string(),
            organization: Some("  ".to_string()),
            interview_date: "2025-05-01T10:00".to_string(),
            meeting_link: Some("https://meet.example/abc".to_string()),
        }
    }

    #[test]
    fn create_event_starts_pending_and_records_creator() {
        let engine = TransitionEngine::default();
        let event = engine
            .create_event(&candidate(), payload("Screening"), &owner(), EventId("e-1".into()))
            .expect("owner can schedule");

        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.scheduled_by, ActorId("u1".to_string()));
        assert_eq!(event.candidate_id, CandidateId("c-1".to_string()));
        assert_eq!(event.interviewer, "Dana");
        assert_eq!(event.organization, None);
        assert_eq!(event.event_name, EventName::Screening);
    }

    #[test]
    fn create_event_validates_payload() {
        let engine = TransitionEngine::default();
        let mut missing_name = payload("Screening");
        missing_name.event_name = Some("   ".to_string());
        assert!(matches!(
            engine.create_event(&candidate(), missing_name, &owner(), EventId("e".into())),
            Err(TransitionError::InvalidInput(_))
        ));

        let mut bad_date = payload("Screening");
        bad_date.interview_date = "soon".to_string();
        assert!(matches!(
            engine.create_event(&candidate(), bad_date, &owner(), EventId("e".into())),
            Err(TransitionError::InvalidInput(_))
        ));
    }

    #[test]
    fn authorization_is_checked_before_payload() {
        let engine = TransitionEngine::default();
        let stranger = Actor::new("u2", Role::Recruiter);
        let mut invalid = payload("Screening");
        invalid.event_name = None;
        assert!(matches!(
            engine.create_event(&candidate(), invalid, &stranger, EventId("e".into())),
            Err(TransitionError::Forbidden(Denial::NotAssignedOwner { .. }))
        ));
    }

    #[test]
    fn strict_policy_limits_names_to_role_family() {
        let engine = TransitionEngine::new(EventNamePolicy::Strict);
        assert!(matches!(
            engine.create_event(&candidate(), payload("Coffee chat"), &owner(), EventId("e".into())),
            Err(TransitionError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.create_event(&candidate(), payload("Client Round 1"), &owner(), EventId("e".into())),
            Err(TransitionError::InvalidInput(_))
        ));
        let event = engine
            .create_event(&candidate(), payload("technical round 2"), &owner(), EventId("e".into()))
            .expect("recruiting round accepted");
        assert_eq!(event.event_name, EventName::TechnicalRound2);

        let permissive = TransitionEngine::default();
        let custom = permissive
            .create_event(&candidate(), payload("Coffee chat"), &owner(), EventId("e".into()))
            .expect("permissive accepts ad hoc labels");
        assert_eq!(custom.event_name, EventName::Custom("Coffee chat".to_string()));
    }

    #[test]
    fn feedback_moves_pending_to_submitted_only() {
        let engine = TransitionEngine::default();
        let event = engine
            .create_event(&candidate(), payload("Screening"), &owner(), EventId("e".into()))
            .expect("create");
        let submitted = engine
            .record_feedback_submitted(&event, &feedback_service())
            .expect("pending accepts feedback")
            .expect("status changes");
        assert_eq!(submitted.status, EventStatus::Submitted);
        assert_eq!(
            engine
                .record_feedback_submitted(&submitted, &feedback_service())
                .expect("repeat"),
            None
        );

        let approved = engine
            .resolve_event(&submitted, EventDecision::Approved, &owner())
            .expect("resolve");
        assert!(matches!(
            engine.record_feedback_submitted(&approved, &feedback_service()),
            Err(TransitionError::Conflict(_))
        ));
    }

    #[test]
    fn observed_transitions_follow_candidate_table() {
        let engine = TransitionEngine::default();
        let assigned = candidate();
        let submitted = engine
            .observe_candidate_status(&assigned, CandidateStatus::Submitted, &feedback_service())
            .expect("assigned -> submitted")
            .expect("changed");
        assert!(matches!(
            engine.observe_candidate_status(&submitted, CandidateStatus::Hired, &feedback_service()),
            Err(TransitionError::Conflict(_))
        ));
        assert!(matches!(
            engine.observe_candidate_status(
                &submitted,
                CandidateStatus::Rejected,
                &feedback_service()
            ),
            Err(TransitionError::InvalidInput(_))
        ));
        assert_eq!(
            engine
                .observe_candidate_status(&submitted, CandidateStatus::Submitted, &feedback_service())
                .expect("no-op"),
            None
        );
    }

    #[test]
    fn observed_transitions_are_reserved_for_collaborators() {
        let engine = TransitionEngine::default();
        let event = engine
            .create_event(&candidate(), payload("Screening"), &owner(), EventId("e".into()))
            .expect("create");
        assert!(matches!(
            engine.record_feedback_submitted(&event, &owner()),
            Err(TransitionError::Forbidden(Denial::RoleNotPermitted { .. }))
        ));
        let outsider = Actor::new("i9", Role::Interviewer);
        assert!(matches!(
            engine.observe_candidate_status(&candidate(), CandidateStatus::Submitted, &outsider),
            Err(TransitionError::Forbidden(Denial::RoleNotPermitted { .. }))
        ));
    }

    #[test]
    fn remarks_append_without_touching_status() {
        let engine = TransitionEngine::default();
        let now = Utc::now();
        let once = engine
            .append_remark(&candidate(), "Strong systems design", &owner(), now)
            .expect("append");
        let twice = engine
            .append_remark(&once, "Prefers remote", &owner(), now)
            .expect("append");

        assert_eq!(twice.status, CandidateStatus::Assigned);
        assert_eq!(twice.remarks.len(), 2);
        assert_eq!(twice.remarks[0], once.remarks[0]);
        assert!(matches!(
            engine.append_remark(&twice, " ", &owner(), now),
            Err(TransitionError::InvalidInput(_))
        ));
    }
}
