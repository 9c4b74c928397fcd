use super::domain::{Actor, CandidateRecord, CandidateStatus, EventRecord, EventStatus, Role};

/// Action an actor is attempting, paired with the record it targets.
#[derive(Debug, Clone, Copy)]
pub enum PipelineAction<'a> {
    CreateEvent(&'a CandidateRecord),
    EditEvent(&'a EventRecord),
    DeleteEvent(&'a EventRecord),
    ResolveEvent(&'a EventRecord),
    RejectCandidate(&'a CandidateRecord),
    InitiateOnboarding(&'a CandidateRecord),
    UploadConsent(&'a CandidateRecord),
    SubmitFeedback(&'a EventRecord),
    ObserveStatus(&'a CandidateRecord),
}

impl PipelineAction<'_> {
    pub const fn label(&self) -> &'static str {
        match self {
            PipelineAction::CreateEvent(_) => "create_event",
            PipelineAction::EditEvent(_) => "edit_event",
            PipelineAction::DeleteEvent(_) => "delete_event",
            PipelineAction::ResolveEvent(_) => "resolve_event",
            PipelineAction::RejectCandidate(_) => "reject_candidate",
            PipelineAction::InitiateOnboarding(_) => "initiate_onboarding",
            PipelineAction::UploadConsent(_) => "upload_consent",
            PipelineAction::SubmitFeedback(_) => "submit_feedback",
            PipelineAction::ObserveStatus(_) => "observe_status",
        }
    }
}

/// Rule that refused an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("only the candidate's assigned owner may {action}")]
    NotAssignedOwner { action: &'static str },
    #[error("only the event's creator may {action}")]
    NotEventCreator { action: &'static str },
    #[error("role '{}' may not {action}", .role.label())]
    RoleNotPermitted { role: Role, action: &'static str },
    #[error("candidate is {} and no longer accepts {action}", .status.label())]
    CandidateClosed {
        status: CandidateStatus,
        action: &'static str,
    },
    #[error("event is {} and cannot be resolved until feedback is submitted", .status.label())]
    EventNotSubmitted { status: EventStatus },
}

/// Stateless permission checks evaluated against the record snapshot handed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl RoleAuthorizer {
    pub fn can_act(&self, actor: &Actor, action: PipelineAction<'_>) -> bool {
        self.authorize(actor, action).is_ok()
    }

    pub fn authorize(&self, actor: &Actor, action: PipelineAction<'_>) -> Result<(), Denial> {
        let label = action.label();
        match action {
            PipelineAction::CreateEvent(candidate) => {
                if !candidate.is_assigned_to(&actor.id) {
                    return Err(Denial::NotAssignedOwner { action: label });
                }
                ensure_open(candidate.status, label)
            }
            PipelineAction::EditEvent(event) | PipelineAction::DeleteEvent(event) => {
                ensure_creator(actor, event, label)
            }
            PipelineAction::ResolveEvent(event) => {
                ensure_creator(actor, event, label)?;
                if event.status != EventStatus::Submitted {
                    return Err(Denial::EventNotSubmitted {
                        status: event.status,
                    });
                }
                Ok(())
            }
            PipelineAction::RejectCandidate(candidate) => {
                ensure_pipeline_owner(actor, label)?;
                ensure_open(candidate.status, label)
            }
            PipelineAction::InitiateOnboarding(candidate) => {
                ensure_pipeline_owner(actor, label)?;
                if candidate.status == CandidateStatus::Rejected {
                    return Err(Denial::CandidateClosed {
                        status: candidate.status,
                        action: label,
                    });
                }
                Ok(())
            }
            PipelineAction::UploadConsent(candidate) => {
                if candidate.is_assigned_to(&actor.id) || is_pipeline_owner(actor.role) {
                    Ok(())
                } else {
                    Err(Denial::NotAssignedOwner { action: label })
                }
            }
            PipelineAction::SubmitFeedback(_) | PipelineAction::ObserveStatus(_) => {
                if actor.role == Role::Integration {
                    Ok(())
                } else {
                    Err(Denial::RoleNotPermitted {
                        role: actor.role,
                        action: label,
                    })
                }
            }
        }
    }
}

const fn is_pipeline_owner(role: Role) -> bool {
    matches!(role, Role::Sourcing)
}

fn ensure_pipeline_owner(actor: &Actor, action: &'static str) -> Result<(), Denial> {
    if is_pipeline_owner(actor.role) {
        Ok(())
    } else {
        Err(Denial::RoleNotPermitted {
            role: actor.role,
            action,
        })
    }
}

fn ensure_creator(actor: &Actor, event: &EventRecord, action: &'static str) -> Result<(), Denial> {
    if event.is_scheduled_by(&actor.id) {
        Ok(())
    } else {
        Err(Denial::NotEventCreator { action })
    }
}

fn ensure_open(status: CandidateStatus, action: &'static str) -> Result<(), Denial> {
    if status.is_closed() {
        Err(Denial::CandidateClosed { status, action })
    } else {
        Ok(())
    }
}
