//! # In-Memory Storm Repository
//!
//! Stores storms in a `BTreeMap` keyed by id and hands out ids with the same
//! sequence arithmetic as the PostgreSQL schema (start 10, step 1), so tests
//! that assert on generated ids behave the same against either store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::StormRepository;
use crate::error::{StormTrackerError, StormTrackerResult};
use crate::models::{IdSequence, Storm};

#[derive(Debug)]
struct InMemoryState {
    rows: BTreeMap<i64, Storm>,
    next_id: i64,
    increment: i64,
}

impl InMemoryState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += self.increment;
        id
    }

    fn upsert(&mut self, storm: &Storm) -> StormTrackerResult<Storm> {
        let saved = match storm.id() {
            None => storm.with_id(self.allocate_id()),
            Some(id) if self.rows.contains_key(&id) => storm.clone(),
            Some(id) => return Err(StormTrackerError::StormNotFound { id }),
        };
        if let Some(id) = saved.id() {
            self.rows.insert(id, saved.clone());
        }
        Ok(saved)
    }
}

#[derive(Debug)]
pub struct InMemoryStormRepository {
    state: RwLock<InMemoryState>,
}

impl InMemoryStormRepository {
    pub fn new() -> Self {
        Self::with_sequence(Storm::MAPPING.sequence)
    }

    pub fn with_sequence(sequence: IdSequence) -> Self {
        Self {
            state: RwLock::new(InMemoryState {
                rows: BTreeMap::new(),
                next_id: sequence.start,
                increment: sequence.increment,
            }),
        }
    }

    /// Repository pre-populated the way an import script would, drawing ids from the sequence
    pub fn seeded(storms: &[Storm]) -> Self {
        let mut state = InMemoryState {
            rows: BTreeMap::new(),
            next_id: Storm::MAPPING.sequence.start,
            increment: Storm::MAPPING.sequence.increment,
        };
        for storm in storms {
            let saved = storm.with_id(state.allocate_id());
            if let Some(id) = saved.id() {
                state.rows.insert(id, saved);
            }
        }
        Self {
            state: RwLock::new(state),
        }
    }
}

impl Default for InMemoryStormRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StormRepository for InMemoryStormRepository {
    async fn count(&self) -> StormTrackerResult<i64> {
        Ok(self.state.read().await.rows.len() as i64)
    }

    async fn save(&self, storm: &Storm) -> StormTrackerResult<Storm> {
        self.state.write().await.upsert(storm)
    }

    async fn save_all(&self, storms: &[Storm]) -> StormTrackerResult<Vec<Storm>> {
        let mut state = self.state.write().await;
        let snapshot = state.rows.clone();

        let mut saved = Vec::with_capacity(storms.len());
        for storm in storms {
            match state.upsert(storm) {
                Ok(s) => saved.push(s),
                Err(e) => {
                    // Rows roll back; ids already drawn stay consumed like a real sequence
                    state.rows = snapshot;
                    return Err(e);
                }
            }
        }
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> StormTrackerResult<Option<Storm>> {
        Ok(self.state.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> StormTrackerResult<Vec<Storm>> {
        Ok(self.state.read().await.rows.values().cloned().collect())
    }

    async fn exists_by_id(&self, id: i64) -> StormTrackerResult<bool> {
        Ok(self.state.read().await.rows.contains_key(&id))
    }

    async fn delete_by_id(&self, id: i64) -> StormTrackerResult<bool> {
        Ok(self.state.write().await.rows.remove(&id).is_some())
    }
}
