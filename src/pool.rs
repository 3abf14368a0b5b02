//! Session Pool
//!
//! A session serves one batch at a time, so concurrent callers each need
//! their own connection. The pool keeps up to `size` sessions, hands one to
//! each caller, and repairs faulted sessions when they come back.
//!
//! ## Concurrency
//! - Idle sessions wait in a bounded `crossbeam` channel
//! - `live`: atomic count of sessions that exist (idle or checked out)
//! - Every session gets the pool's template indexes opened on connect

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::error::{HsError, Result};
use crate::index::IndexHandle;
use crate::session::{Session, SessionState};
use crate::transport::{TcpTransport, Transport};

type Connector<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// Bounded pool of sessions
pub struct SessionPool<T: Transport> {
    idle_tx: Sender<Session<T>>,
    idle_rx: Receiver<Session<T>>,
    connector: Connector<T>,

    /// Indexes opened on every session before it is handed out
    indexes: Vec<IndexHandle>,

    size: usize,
    live: AtomicUsize,
    checkout_timeout: Duration,
}

impl SessionPool<TcpTransport> {
    /// Pool of TCP sessions to the endpoint in `config`
    pub fn connect(config: &Config, size: usize, indexes: Vec<IndexHandle>) -> Result<Self> {
        config.validate()?;
        let config = config.clone();
        let timeout = config.timeout();
        Self::new(size, indexes, timeout, move || TcpTransport::connect(&config))
    }
}

impl<T: Transport> SessionPool<T> {
    /// Create a pool and eagerly establish one session
    pub fn new<F>(
        size: usize,
        indexes: Vec<IndexHandle>,
        checkout_timeout: Duration,
        connector: F,
    ) -> Result<Self>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        if size == 0 {
            return Err(HsError::Config("pool size must be non-zero".to_string()));
        }

        let (idle_tx, idle_rx) = channel::bounded(size);
        let pool = Self {
            idle_tx,
            idle_rx,
            connector: Box::new(connector),
            indexes,
            size,
            live: AtomicUsize::new(0),
            checkout_timeout,
        };

        // Fail fast on an unreachable endpoint
        pool.reserve_slot();
        let first = pool.create()?;
        pool.checkin(first);
        Ok(pool)
    }

    /// Check out a session, creating one if the pool is below `size`
    ///
    /// Waits up to the checkout timeout when every session is busy.
    pub fn get(&self) -> Result<PooledSession<'_, T>> {
        if let Ok(session) = self.idle_rx.try_recv() {
            return Ok(PooledSession::new(self, session));
        }

        if self.reserve_slot() {
            match self.create() {
                Ok(session) => return Ok(PooledSession::new(self, session)),
                Err(e) => {
                    self.live.fetch_sub(1, Ordering::AcqRel);
                    return Err(e);
                }
            }
        }

        self.idle_rx
            .recv_timeout(self.checkout_timeout)
            .map(|session| PooledSession::new(self, session))
            .map_err(|_| HsError::PoolTimeout)
    }

    /// Sessions currently waiting in the pool
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }

    /// Sessions that exist, idle or checked out
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn reserve_slot(&self) -> bool {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.size).then_some(n + 1)
            })
            .is_ok()
    }

    /// Connect and prepare a session; the caller already holds a slot
    fn create(&self) -> Result<Session<T>> {
        let transport = (self.connector)()?;
        let mut session = Session::new(transport);
        self.open_indexes(&mut session)?;
        Ok(session)
    }

    fn open_indexes(&self, session: &mut Session<T>) -> Result<()> {
        for handle in &self.indexes {
            session.open_handle(handle.clone())?;
        }
        Ok(())
    }

    /// Take a session back, repairing it first if it is not reusable
    fn checkin(&self, mut session: Session<T>) {
        if session.state() != SessionState::Connected || !session.is_stable_point() {
            let repaired = session
                .reconnect()
                .and_then(|_| self.open_indexes(&mut session));
            if let Err(e) = repaired {
                tracing::warn!("Dropping pooled session that could not be repaired: {}", e);
                self.live.fetch_sub(1, Ordering::AcqRel);
                return;
            }
            tracing::debug!("Repaired pooled session");
        }

        if self.idle_tx.try_send(session).is_err() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A checked-out session; returns to the pool on drop
pub struct PooledSession<'a, T: Transport> {
    pool: &'a SessionPool<T>,
    session: Option<Session<T>>,
}

impl<'a, T: Transport> PooledSession<'a, T> {
    fn new(pool: &'a SessionPool<T>, session: Session<T>) -> Self {
        Self {
            pool,
            session: Some(session),
        }
    }

    /// Keep the session out of the pool for good
    pub fn detach(mut self) -> Session<T> {
        self.pool.live.fetch_sub(1, Ordering::AcqRel);
        self.session.take().expect("session present until drop")
    }
}

impl<T: Transport> Deref for PooledSession<'_, T> {
    type Target = Session<T>;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref().expect("session present until drop")
    }
}

impl<T: Transport> DerefMut for PooledSession<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut().expect("session present until drop")
    }
}

impl<T: Transport> Drop for PooledSession<'_, T> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.checkin(session);
        }
    }
}
