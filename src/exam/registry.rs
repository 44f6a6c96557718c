// src/exam/registry.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::exam::{
    session::ExamSession,
    timer::{SessionTasks, spawn_timers},
};

/// A running exam: the session behind its lock plus the signal its
/// question timer listens to.
pub struct LiveSession {
    pub id: Uuid,
    /// User id of whoever started the exam, when signed in.
    pub owner: Option<String>,
    session: Mutex<ExamSession>,
    navigated: Notify,
}

impl LiveSession {
    /// Runs `f` against the session with the lock held.
    ///
    /// Any navigation performed by `f` re-phases the question timer.
    pub async fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ExamSession) -> R,
    {
        let mut session = self.session.lock().await;
        let epoch = session.navigation_epoch();
        let out = f(&mut *session);
        if session.navigation_epoch() != epoch {
            self.navigated.notify_one();
        }
        out
    }

    pub(crate) async fn navigated(&self) {
        self.navigated.notified().await
    }
}

struct Entry {
    live: Arc<LiveSession>,
    /// Dropped with the entry, which aborts both timers.
    _tasks: SessionTasks,
}

/// Every exam currently in progress, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    entries: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and starts its timers.
    pub async fn start(&self, owner: Option<String>, session: ExamSession) -> Arc<LiveSession> {
        let live = Arc::new(LiveSession {
            id: Uuid::new_v4(),
            owner,
            session: Mutex::new(session),
            navigated: Notify::new(),
        });

        let tasks = spawn_timers(Arc::clone(&live), self.clone());
        self.entries.lock().await.insert(
            live.id,
            Entry {
                live: Arc::clone(&live),
                _tasks: tasks,
            },
        );

        tracing::info!(session_id = %live.id, "exam session started");
        live
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<LiveSession>> {
        self.entries.lock().await.get(&id).map(|e| Arc::clone(&e.live))
    }

    /// Removes a session, tearing down its timers. Returns false if unknown.
    pub async fn discard(&self, id: Uuid) -> bool {
        let removed = self.entries.lock().await.remove(&id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "exam session discarded");
        }
        removed.is_some()
    }

    /// Discards a session once `delay` has passed.
    pub fn discard_after(&self, id: Uuid, delay: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.discard(id).await;
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
