//! Actuator broker
//!
//! The serializing gatekeeper between network sessions and the serial
//! link. One mutex guards both the lock-ownership state and the link,
//! so "who may write" and "is the device mid-transaction" can never
//! disagree. Everything that reaches the device goes through
//! [`Broker::execute`].

use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

use crate::link::SerialLink;

/// Reply when a device transaction failed or the device is unreachable
pub const REPLY_ERR: &str = "ERR";
/// Reply when another session holds the exclusive lock
pub const REPLY_LOCKED: &str = "LOCKED";
/// Reply to a successful (or already-held) LOCK
pub const REPLY_LOCK_OK: &str = "Locked";
/// Reply to a LOCK while another session holds the lock
pub const REPLY_LOCK_BUSY: &str = "Already locked";
/// Reply to a successful UNLOCK
pub const REPLY_UNLOCK_OK: &str = "Unlocked";
/// Reply to an UNLOCK by a session that is not the holder
pub const REPLY_UNLOCK_DENIED: &str = "Not locked by this client";

/// Opaque identity of one logical client connection.
///
/// Minted once per session at connection setup and threaded through
/// every broker call; lock ownership is bound to this token, never to
/// the identity of whatever thread happens to serve the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh session identity
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first uuid group is plenty for log correlation
        let s = self.0.to_string();
        f.write_str(&s[..8])
    }
}

/// Ownership of the exclusive motion lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Nobody holds the lock
    Unlocked,
    /// Exactly one session holds the lock
    LockedBy(SessionId),
}

struct BrokerInner {
    link: Box<dyn SerialLink>,
    lock: LockState,
}

/// Shared-device broker. `Arc<Broker>` is cloned into every session
/// thread and the change watcher.
pub struct Broker {
    inner: Mutex<BrokerInner>,
}

impl Broker {
    /// Wrap a serial link. The broker owns the link exclusively from
    /// here on.
    pub fn new(link: Box<dyn SerialLink>) -> Self {
        Self {
            inner: Mutex::new(BrokerInner {
                link,
                lock: LockState::Unlocked,
            }),
        }
    }

    /// Execute one command line on behalf of `session` and produce the
    /// reply line.
    ///
    /// `LOCK` and `UNLOCK` are interpreted here and never reach the
    /// device. Status queries (`?`) always pass the lock gate so every
    /// client can observe state; any other command is rejected with
    /// `LOCKED` while another session holds the lock. Link faults are
    /// absorbed into an `ERR` reply and the link is reopened lazily on
    /// the next call.
    ///
    /// Only the trailing newline/whitespace is stripped; forwarded
    /// commands otherwise reach the device verbatim.
    pub fn execute(&self, session: SessionId, command: &str) -> String {
        let command = command.trim_end();
        let mut inner = self.inner.lock().expect("broker mutex poisoned");

        match command {
            "LOCK" => match inner.lock {
                LockState::Unlocked => {
                    inner.lock = LockState::LockedBy(session);
                    tracing::debug!(%session, "lock acquired");
                    REPLY_LOCK_OK.to_string()
                }
                // LOCK is idempotent for the holder
                LockState::LockedBy(holder) if holder == session => REPLY_LOCK_OK.to_string(),
                LockState::LockedBy(_) => REPLY_LOCK_BUSY.to_string(),
            },
            "UNLOCK" => match inner.lock {
                LockState::LockedBy(holder) if holder != session => {
                    REPLY_UNLOCK_DENIED.to_string()
                }
                _ => {
                    inner.lock = LockState::Unlocked;
                    tracing::debug!(%session, "lock released");
                    REPLY_UNLOCK_OK.to_string()
                }
            },
            _ => {
                if let LockState::LockedBy(holder) = inner.lock {
                    if holder != session && command != "?" {
                        return REPLY_LOCKED.to_string();
                    }
                }
                Self::forward(&mut inner, command)
            }
        }
    }

    /// Release the lock if `session` holds it. Called from session
    /// teardown so a dropped connection can never leak the lock.
    pub fn release(&self, session: SessionId) {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        if inner.lock == LockState::LockedBy(session) {
            inner.lock = LockState::Unlocked;
            tracing::info!(%session, "lock released on session teardown");
        }
    }

    /// Current lock ownership (diagnostic)
    pub fn lock_state(&self) -> LockState {
        self.inner.lock().expect("broker mutex poisoned").lock
    }

    fn forward(inner: &mut BrokerInner, command: &str) -> String {
        if !inner.link.is_open() {
            if let Err(e) = inner.link.open() {
                tracing::warn!(error = %e, "device unavailable");
                return REPLY_ERR.to_string();
            }
        }
        match inner.link.transact(command) {
            Ok(reply) => reply.trim_end().to_string(),
            Err(e) => {
                // transact already closed the link; next call reopens
                tracing::warn!(error = %e, command, "device transaction failed");
                REPLY_ERR.to_string()
            }
        }
    }
}
