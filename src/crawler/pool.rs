//! Pool of rendering sessions
//!
//! A session is checked out for one fetch and returned when the guard drops.
//! The semaphore guarantees a permit holder always finds a session waiting.

use crate::crawler::gateway::GatewayError;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct SessionPool<G> {
    idle: Arc<Mutex<Vec<G>>>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl<G> Clone for SessionPool<G> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
            permits: Arc::clone(&self.permits),
            capacity: self.capacity,
        }
    }
}

impl<G> SessionPool<G> {
    pub fn new(sessions: Vec<G>) -> Self {
        let capacity = sessions.len();
        Self {
            idle: Arc::new(Mutex::new(sessions)),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Number of sessions owned by the pool
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of sessions not currently checked out
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a free session
    pub async fn checkout(&self) -> Result<PooledSession<G>, GatewayError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| GatewayError::PoolClosed)?;

        let session = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop()
            .ok_or(GatewayError::PoolClosed)?;

        Ok(PooledSession {
            session: Some(session),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

/// A checked-out session; goes back to the pool on drop
pub struct PooledSession<G> {
    session: Option<G>,
    idle: Arc<Mutex<Vec<G>>>,
    // Released after `drop` has pushed the session back
    _permit: OwnedSemaphorePermit,
}

impl<G> Deref for PooledSession<G> {
    type Target = G;

    fn deref(&self) -> &G {
        self.session
            .as_ref()
            .expect("session is present until the guard drops")
    }
}

impl<G> DerefMut for PooledSession<G> {
    fn deref_mut(&mut self) -> &mut G {
        self.session
            .as_mut()
            .expect("session is present until the guard drops")
    }
}

impl<G> Drop for PooledSession<G> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.idle
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(session);
        }
    }
}
