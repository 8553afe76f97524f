//! `tunnelmc`: a bidirectional, policy-enforcing protocol interceptor
//! for a legacy Minecraft-style game protocol.
//!
//! A player connects to this crate's listener, which dials the real
//! upstream server and hands both sockets to a pair of [`tunnel::Tunnel`]
//! workers sharing one [`session::Session`]. Every packet is read
//! through the typed [`io`] layer and routed by [`protocol::dispatch`]:
//! most opcodes pass straight through via [`protocol::grammar`], the
//! rest are rewritten, suppressed, or synthesized by a [`policy`] hook.
//! [`context::ServerContext`] bundles the configuration and collaborator
//! interfaces ([`collaborators`], [`registries`]) every hook consults.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod logger;
pub mod policy;
pub mod protocol;
pub mod registries;
pub mod session;
pub mod transport;
pub mod tunnel;

pub use context::ServerContext;
pub use error::{Result, TunnelError};
pub use session::Session;
pub use tunnel::Tunnel;
