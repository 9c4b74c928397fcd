use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for candidates moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for scheduled interview events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Identity of the authenticated party attempting an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organizational role of an actor. Only the authorizer branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sources candidates and owns the pipeline: rejection and onboarding.
    Sourcing,
    Recruiter,
    Interviewer,
    ClientPartner,
    /// Service identity of the feedback and onboarding collaborators. It asserts observed
    /// transitions and holds no ownership of candidates or events.
    Integration,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Sourcing => "sourcing",
            Role::Recruiter => "recruiter",
            Role::Interviewer => "interviewer",
            Role::ClientPartner => "client_partner",
            Role::Integration => "integration",
        }
    }

    /// Round names this role schedules, if the role is tied to one family.
    pub const fn event_family(self) -> Option<EventFamily> {
        match self {
            Role::Recruiter => Some(EventFamily::Recruiting),
            Role::ClientPartner => Some(EventFamily::Client),
            Role::Sourcing | Role::Interviewer | Role::Integration => None,
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sourcing" => Ok(Role::Sourcing),
            "recruiter" => Ok(Role::Recruiter),
            "interviewer" => Ok(Role::Interviewer),
            "client_partner" | "client-partner" => Ok(Role::ClientPartner),
            "integration" => Ok(Role::Integration),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Acting identity plus role, supplied with every call into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }
}

/// Overall status of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Assigned,
    #[serde(rename = "onhold")]
    OnHold,
    Shortlisted,
    Rejected,
    Submitted,
    Approved,
    Hired,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 8] = [
        CandidateStatus::Pending,
        CandidateStatus::Assigned,
        CandidateStatus::OnHold,
        CandidateStatus::Shortlisted,
        CandidateStatus::Rejected,
        CandidateStatus::Submitted,
        CandidateStatus::Approved,
        CandidateStatus::Hired,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Assigned => "assigned",
            CandidateStatus::OnHold => "onhold",
            CandidateStatus::Shortlisted => "shortlisted",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::Submitted => "submitted",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Hired => "hired",
        }
    }

    /// Candidates in these statuses no longer accept new events or rejection.
    pub const fn is_closed(self) -> bool {
        matches!(self, CandidateStatus::Rejected | CandidateStatus::Approved)
    }

    pub const fn can_transition_to(self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, Submitted)
                | (Assigned | OnHold | Shortlisted | Submitted, Rejected)
                | (Submitted, Approved)
                | (Approved, Hired)
        )
    }
}

impl FromStr for CandidateStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-', ' '], "");
        CandidateStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| format!("unknown candidate status '{}'", value.trim()))
    }
}

/// Outcome state of a single interview event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Scheduled, no feedback recorded yet.
    #[default]
    Pending,
    Submitted,
    Approved,
    Rejected,
}

impl EventStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Submitted => "submitted",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }

    pub const fn is_resolved(self) -> bool {
        matches!(self, EventStatus::Approved | EventStatus::Rejected)
    }
}

/// Resolution the event creator records once feedback is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDecision {
    Approved,
    Rejected,
}

impl From<EventDecision> for EventStatus {
    fn from(decision: EventDecision) -> Self {
        match decision {
            EventDecision::Approved => EventStatus::Approved,
            EventDecision::Rejected => EventStatus::Rejected,
        }
    }
}

/// Group of round names scheduled by one role family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFamily {
    Recruiting,
    Client,
}

/// Interview round name. Known rounds route feedback forms; anything else is `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventName {
    Screening,
    TechnicalRound1,
    TechnicalRound2,
    ManagerialRound,
    HrRound,
    Orientation,
    ClientRound1,
    ClientRound2,
    Custom(String),
}

impl EventName {
    const KNOWN: [EventName; 8] = [
        EventName::Screening,
        EventName::TechnicalRound1,
        EventName::TechnicalRound2,
        EventName::ManagerialRound,
        EventName::HrRound,
        EventName::Orientation,
        EventName::ClientRound1,
        EventName::ClientRound2,
    ];

    pub fn label(&self) -> &str {
        match self {
            EventName::Screening => "Screening",
            EventName::TechnicalRound1 => "Technical Round 1",
            EventName::TechnicalRound2 => "Technical Round 2",
            EventName::ManagerialRound => "Managerial Round",
            EventName::HrRound => "HR Round",
            EventName::Orientation => "Orientation",
            EventName::ClientRound1 => "Client Round 1",
            EventName::ClientRound2 => "Client Round 2",
            EventName::Custom(label) => label,
        }
    }

    pub fn family(&self) -> Option<EventFamily> {
        match self {
            EventName::Screening
            | EventName::TechnicalRound1
            | EventName::TechnicalRound2
            | EventName::ManagerialRound
            | EventName::HrRound => Some(EventFamily::Recruiting),
            EventName::Orientation | EventName::ClientRound1 | EventName::ClientRound2 => {
                Some(EventFamily::Client)
            }
            EventName::Custom(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventName::Custom(_))
    }

    /// Matches labels case-insensitively, ignoring spacing and punctuation.
    pub fn parse(raw: &str) -> Self {
        let key = normalize_label(raw);
        Self::KNOWN
            .into_iter()
            .find(|known| normalize_label(known.label()) == key)
            .unwrap_or_else(|| EventName::Custom(raw.trim().to_string()))
    }
}

fn normalize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl From<String> for EventName {
    fn from(value: String) -> Self {
        EventName::parse(&value)
    }
}

impl From<EventName> for String {
    fn from(value: EventName) -> Self {
        match value {
            EventName::Custom(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only note on a candidate. Never read by gating or transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    pub title: String,
    pub date: DateTime<Utc>,
    pub author: ActorId,
}

/// Opaque reference handed back by the document store for an uploaded consent form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub initiated_by: ActorId,
    pub initiated_at: DateTime<Utc>,
}

/// The long-lived subject of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub status: CandidateStatus,
    pub assigned_to: Option<ActorId>,
    #[serde(default)]
    pub consent_form: Option<DocumentRef>,
    #[serde(default)]
    pub remarks: Vec<Remark>,
    #[serde(default)]
    pub onboarding: Option<OnboardingRecord>,
    #[serde(default)]
    pub version: u64,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CandidateId(id.into()),
            name: name.into(),
            status: CandidateStatus::Pending,
            assigned_to: None,
            consent_form: None,
            remarks: Vec::new(),
            onboarding: None,
            version: 0,
        }
    }

    pub fn assigned(mut self, owner: &ActorId) -> Self {
        self.status = CandidateStatus::Assigned;
        self.assigned_to = Some(owner.clone());
        self
    }

    pub fn is_assigned_to(&self, actor: &ActorId) -> bool {
        self.assigned_to.as_ref() == Some(actor)
    }
}

/// One scheduled interview round tied to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub candidate_id: CandidateId,
    pub event_name: EventName,
    #[serde(default)]
    pub status: EventStatus,
    pub scheduled_by: ActorId,
    pub interviewer: String,
    pub organization: Option<String>,
    pub interview_date: DateTime<Utc>,
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub version: u64,
}

impl EventRecord {
    pub fn is_scheduled_by(&self, actor: &ActorId) -> bool {
        &self.scheduled_by == actor
    }
}

/// Scheduling request accepted by `createEvent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub interviewer: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub interview_date: String,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

/// Field replacements accepted by `editEvent`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub interviewer: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub interview_date: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.interviewer.is_none()
            && self.organization.is_none()
            && self.interview_date.is_none()
            && self.meeting_link.is_none()
    }
}

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses an interview date into UTC. Offset-less values are taken as UTC.
pub fn parse_interview_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("interview date is required".to_string());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{trimmed}' as an interview date"))
}
