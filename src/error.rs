//! Error handling for the tunnel.
//!
//! Mirrors the error taxonomy of the interceptor: a byte-stream desync is
//! fatal, a policy denial is recovered locally by the caller, an auth
//! failure becomes a kick, transport errors end the worker loop, and
//! persistence errors are logged but never fatal.

use thiserror::Error;

/// Errors produced while running a tunnel.
#[derive(Error, Debug)]
pub enum TunnelError {
    /// An unknown opcode was encountered, or a known packet ended early.
    /// Always fatal: the byte stream cannot be resynchronized.
    #[error("protocol desync at opcode {opcode:#04x} (previous {previous:?}): {reason}")]
    ProtocolDesync {
        /// The opcode that could not be parsed.
        opcode: u8,
        /// The previously dispatched opcode, if any.
        previous: Option<u8>,
        /// Human-readable detail.
        reason: String,
    },

    /// A packet was rejected by permission, mute, chest-lock, or bot-filter
    /// policy. Never propagated past the dispatcher; handlers convert this
    /// into a local suppression plus optional player-visible notice.
    #[error("policy denied: {0}")]
    PolicyDeny(String),

    /// Authentication or the encryption handshake failed. Surfaces as a
    /// kick with the given reason; the tunnel closes normally afterwards.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// I/O failed on the underlying (possibly encrypted) stream.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The chest registry (or another persistent store) failed to save.
    /// Logged, not fatal: in-memory state remains authoritative.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl TunnelError {
    /// True if this error means the tunnel worker loop must stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TunnelError::PolicyDeny(_) | TunnelError::Persistence(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TunnelError>;
