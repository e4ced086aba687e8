/// Session cache and auth-state notifications
///
/// The gateway owns sessions. A [`SessionStore`] holds the read-only copy a
/// view works with and fans out [`AuthEvent`]s to subscribers whenever that
/// copy changes.
///
/// Subscriptions are scoped: dropping an [`AuthSubscription`] unsubscribes.
///
/// # Example
///
/// ```
/// use granite_shared::auth::session::{AuthEvent, SessionStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = SessionStore::new();
/// let mut subscription = store.subscribe();
///
/// store.clear().await;
/// assert!(matches!(subscription.next().await, Some(AuthEvent::SignedOut)));
/// # }
/// ```

use tokio::sync::{broadcast, RwLock};

use crate::models::session::Session;

/// Buffered events per subscriber before older ones are dropped
const EVENT_CAPACITY: usize = 16;

/// Session change notification
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A session was established (sign-in, or sign-up with immediate session)
    SignedIn(Session),

    /// The session was removed
    SignedOut,
}

/// Cached session plus change notifications
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates an empty store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    /// Creates a store holding an already-established session
    ///
    /// No event is emitted: restoring a session is not a sign-in.
    pub fn restored(session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: RwLock::new(session),
            events,
        }
    }

    /// Current cached session
    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Stores a new session and notifies subscribers
    pub async fn set(&self, session: Session) {
        *self.current.write().await = Some(session.clone());
        self.emit(AuthEvent::SignedIn(session));
    }

    /// Drops the cached session and notifies subscribers
    pub async fn clear(&self) {
        *self.current.write().await = None;
        self.emit(AuthEvent::SignedOut);
    }

    /// Subscribes to session changes
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.events.subscribe(),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let delivered = self.events.send(event).unwrap_or(0);
        tracing::debug!(subscribers = delivered, "Auth state changed");
    }
}

/// Live subscription to [`AuthEvent`]s; unsubscribes on drop
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Waits for the next event
    ///
    /// Returns `None` once the store is gone. If the subscriber fell behind,
    /// skipped events are logged and the next available one is returned.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth subscription lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
