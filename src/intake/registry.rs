//! Session registry: owns every live intake session and prunes idle ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::sequencer::StepSequencer;
use super::session::SessionStore;
use super::step::Workflow;
use crate::error::IntakeError;

/// One person's pass through the workflow: their answers and where they are.
#[derive(Debug)]
pub struct IntakeSession {
    pub store: SessionStore,
    pub sequencer: StepSequencer,
}

impl IntakeSession {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self {
            store: SessionStore::new(),
            sequencer: StepSequencer::new(workflow),
        }
    }

    pub fn id(&self) -> Uuid {
        self.store.id()
    }
}

/// A session behind its own lock, so one interaction at a time mutates it.
pub type SharedSession = Arc<Mutex<IntakeSession>>;

pub struct SessionRegistry {
    workflow: Arc<Workflow>,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(workflow: Arc<Workflow>, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            workflow,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    /// Start a new session on the first step.
    pub async fn create(&self) -> (Uuid, SharedSession) {
        let session = IntakeSession::new(Arc::clone(&self.workflow));
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&shared));
        debug!(session_id = %id, "Session created");
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedSession, IntakeError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| IntakeError::session_not_found(id))
    }

    /// Lock a live session for one interaction and mark it active.
    ///
    /// Membership is checked again once the lock is held: the sweep may have
    /// dropped the session while this call waited, and a change made to a
    /// dropped session would be lost.
    pub async fn lock(&self, id: Uuid) -> Result<OwnedMutexGuard<IntakeSession>, IntakeError> {
        let shared = self.get(id).await?;
        let mut guard = Arc::clone(&shared).lock_owned().await;

        let live = self
            .sessions
            .read()
            .await
            .get(&id)
            .is_some_and(|s| Arc::ptr_eq(s, &shared));
        if !live {
            return Err(IntakeError::session_not_found(id));
        }

        guard.store.touch();
        Ok(guard)
    }

    /// End a session, discarding its answers.
    pub async fn end(&self, id: Uuid) -> Result<(), IntakeError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                debug!(session_id = %id, "Session ended");
                Ok(())
            }
            None => Err(IntakeError::session_not_found(id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle longer than the timeout. Sessions in the middle of
    /// an interaction are never dropped. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.idle_timeout)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(s) if s.store.updated_at() < cutoff => {
                debug!(session_id = %id, "Session expired");
                false
            }
            _ => true,
        });

        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle sessions");
        }
        pruned
    }
}

/// Spawn a background task that prunes idle sessions every `interval`.
pub fn spawn_sweep_task(
    registry: Arc<SessionRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            registry.prune_expired().await;
        }
    })
}
