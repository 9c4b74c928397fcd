//! Candidate and interview-event lifecycle for the hiring pipeline.
//!
//! Callers drive [`PipelineOrchestrator`]; it loads the candidate and its events, checks the
//! acting identity through [`RoleAuthorizer`], applies status changes with
//! [`TransitionEngine`], writes conditionally through a [`PipelineRepository`], and answers
//! every mutation with a freshly derived [`PipelineView`].

pub mod authorizer;
pub mod domain;
pub mod gating;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod transition;

#[cfg(test)]
mod tests;

pub use authorizer::{Denial, PipelineAction, RoleAuthorizer};
pub use domain::{
    Actor, ActorId, CandidateId, CandidateRecord, CandidateStatus, DocumentRef, EventDecision,
    EventFamily, EventId, EventName, EventPatch, EventPayload, EventRecord, EventStatus,
    OnboardingRecord, Remark, Role,
};
pub use gating::{GateView, GatingPolicy};
pub use memory::InMemoryPipelineRepository;
pub use repository::{
    ConsentDocument, DocumentStore, DocumentStoreError, FeedbackLinkNotice, FeedbackNotifier,
    NotificationError, PipelineRepository, RepositoryError,
};
pub use router::pipeline_router;
pub use service::{EventView, PipelineError, PipelineOrchestrator, PipelineView};
pub use transition::{EventNamePolicy, TransitionEngine};
