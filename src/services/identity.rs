// src/services/identity.rs
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::{Mutex, ReentrantMutex};
use uuid::Uuid;

use crate::error::{BoardError, BoardResult};
use crate::models::session::Session;

pub type SessionListener = Box<dyn Fn(Option<Session>) + Send + Sync>;

/// The externally managed identity. The feed only observes it.
#[async_trait]
pub trait IdentityService: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    /// Registers `listener`, calls it once with the current session, and
    /// keeps it registered until the returned guard is dropped.
    fn subscribe(&self, listener: SessionListener) -> SessionSubscription;

    async fn sign_in(&self, email: &str, password: &str) -> BoardResult<Session>;

    /// Adopts an access token issued elsewhere.
    async fn restore(&self, access_token: &str) -> BoardResult<Session>;

    async fn end_session(&self) -> BoardResult<()>;
}

#[derive(Default)]
struct HubInner {
    current: Option<Session>,
    next_id: u64,
    listeners: HashMap<u64, Arc<SessionListener>>,
}

/// Current session plus its listeners; shared by every identity backend.
///
/// Listeners run outside the state lock but inside `delivery`, so every
/// listener sees changes in the order they were stored and the last value
/// delivered is always the current one.
#[derive(Clone, Default)]
pub struct SessionHub {
    inner: Arc<Mutex<HubInner>>,
    delivery: Arc<ReentrantMutex<()>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.lock().current.clone()
    }

    pub fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        let listener = Arc::new(listener);
        let _delivery = self.delivery.lock();
        let (id, current) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            (id, inner.current.clone())
        };
        debug!("session listener {} registered", id);
        listener(current);
        SessionSubscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Stores `session` and notifies every listener.
    pub fn publish(&self, session: Option<Session>) {
        let _delivery = self.delivery.lock();
        let listeners: Vec<Arc<SessionListener>> = {
            let mut inner = self.inner.lock();
            inner.current = session.clone();
            inner.listeners.values().cloned().collect()
        };
        info!(
            "session changed: {}",
            session
                .as_ref()
                .map(|s| s.author())
                .unwrap_or_else(|| "signed out".to_string())
        );
        for listener in listeners {
            listener(session.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Deregisters its listener on drop.
pub struct SessionSubscription {
    hub: Weak<Mutex<HubInner>>,
    id: u64,
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.lock().listeners.remove(&self.id);
            debug!("session listener {} released", self.id);
        }
    }
}

/// In-process identity for local runs: any well-formed credentials sign in.
#[derive(Default)]
pub struct LocalIdentity {
    hub: SessionHub,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }
}

#[async_trait]
impl IdentityService for LocalIdentity {
    fn current_session(&self) -> Option<Session> {
        self.hub.current()
    }

    fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        self.hub.subscribe(listener)
    }

    async fn sign_in(&self, email: &str, password: &str) -> BoardResult<Session> {
        if password.len() < 6 {
            return Err(BoardError::InvalidInput(
                "Password must be at least 6 characters long".to_string(),
            ));
        }
        let email = email.trim().to_lowercase();
        let user_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes()).to_string();
        let session = Session::new(user_id, Some(email));
        self.hub.publish(Some(session.clone()));
        Ok(session)
    }

    async fn restore(&self, access_token: &str) -> BoardResult<Session> {
        // local tokens are opaque user ids
        let token = access_token.trim();
        if token.is_empty() {
            return Err(BoardError::InvalidInput("empty access token".to_string()));
        }
        let session = Session::new(token, None).with_access_token(token);
        self.hub.publish(Some(session.clone()));
        Ok(session)
    }

    async fn end_session(&self) -> BoardResult<()> {
        self.hub.publish(None);
        Ok(())
    }
}
