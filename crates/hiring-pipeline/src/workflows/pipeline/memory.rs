//! In-memory implementation of [`PipelineRepository`].
//!
//! A single mutex guards both collections, so every conditional write is checked and applied
//! while holding it. All state is lost on restart.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{CandidateId, CandidateRecord, EventId, EventRecord};
use super::repository::{PipelineRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    candidates: BTreeMap<CandidateId, CandidateRecord>,
    events: BTreeMap<EventId, EventRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryPipelineRepository {
    tables: Mutex<Tables>,
}

impl InMemoryPipelineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers candidates produced by the external registration/assignment process.
    pub fn with_candidates(
        candidates: impl IntoIterator<Item = CandidateRecord>,
    ) -> Result<Self, RepositoryError> {
        let repository = Self::new();
        for candidate in candidates {
            repository.insert_candidate(candidate)?;
        }
        Ok(repository)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl PipelineRepository for InMemoryPipelineRepository {
    fn fetch_candidate(
        &self,
        id: &CandidateId,
    ) -> Result<Option<CandidateRecord>, RepositoryError> {
        Ok(self.tables()?.candidates.get(id).cloned())
    }

    fn events_for(&self, candidate: &CandidateId) -> Result<Vec<EventRecord>, RepositoryError> {
        let tables = self.tables()?;
        let mut events: Vec<EventRecord> = tables
            .events
            .values()
            .filter(|event| &event.candidate_id == candidate)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.interview_date
                .cmp(&b.interview_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        Ok(self.tables()?.events.get(id).cloned())
    }

    fn insert_candidate(
        &self,
        mut record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.candidates.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        record.version = 1;
        tables.candidates.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn insert_event(
        &self,
        mut record: EventRecord,
        candidate_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.events.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        let owner = tables
            .candidates
            .get(&record.candidate_id)
            .ok_or(RepositoryError::NotFound)?;
        if owner.version != candidate_version {
            return Err(RepositoryError::Conflict);
        }
        record.version = 1;
        tables.events.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn replace_candidate(
        &self,
        mut record: CandidateRecord,
    ) -> Result<CandidateRecord, RepositoryError> {
        let mut tables = self.tables()?;
        let stored = tables
            .candidates
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }

    fn replace_candidate_given_events(
        &self,
        mut record: CandidateRecord,
        observed_events: &[EventRecord],
    ) -> Result<CandidateRecord, RepositoryError> {
        let mut tables = self.tables()?;
        if !history_matches(&tables, &record.id, observed_events) {
            return Err(RepositoryError::Conflict);
        }

        let stored = tables
            .candidates
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }

    fn replace_event(&self, mut record: EventRecord) -> Result<EventRecord, RepositoryError> {
        let mut tables = self.tables()?;
        let stored = tables
            .events
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        *stored = record.clone();
        Ok(record)
    }

    fn remove_event(
        &self,
        id: &EventId,
        expected_version: u64,
    ) -> Result<EventRecord, RepositoryError> {
        let mut tables = self.tables()?;
        let stored_version = tables
            .events
            .get(id)
            .map(|stored| stored.version)
            .ok_or(RepositoryError::NotFound)?;
        if stored_version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        tables.events.remove(id).ok_or(RepositoryError::NotFound)
    }
}

fn history_matches(tables: &Tables, candidate: &CandidateId, observed: &[EventRecord]) -> bool {
    let mut current: Vec<(&EventId, u64)> = tables
        .events
        .values()
        .filter(|event| &event.candidate_id == candidate)
        .map(|event| (&event.id, event.version))
        .collect();
    let mut expected: Vec<(&EventId, u64)> = observed
        .iter()
        .map(|event| (&event.id, event.version))
        .collect();
    current.sort();
    expected.sort();
    current == expected
}
