//! Configuration consumed by the tunnel.
//!
//! Read once at tunnel construction. Loadable from a `server.properties`
//! style key/value file, in the style of the reference server this crate
//! is built from, with an in-code [`Default`].

pub mod properties;

pub use properties::TunnelProperties;

use crate::error::{Result, TunnelError};
use std::path::Path;

/// Which character introduces a chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPrefix {
    /// `/command`
    Slash,
    /// `!command`
    Bang,
}

impl CommandPrefix {
    /// The literal character this prefix matches.
    pub fn as_char(&self) -> char {
        match self {
            CommandPrefix::Slash => '/',
            CommandPrefix::Bang => '!',
        }
    }
}

/// Configuration consumed by a tunnel pair at construction time.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    /// Selects `/` vs `!` as the command prefix.
    pub command_prefix: CommandPrefix,
    /// Value the login packet's `maxPlayers` field is rewritten to.
    pub max_players: i32,
    /// Whether client chat is relayed to the upstream server at all.
    pub forward_chat: bool,
    /// Whether chat messages are run through message-format translation.
    pub use_msg_formats: bool,
    /// Whether long outgoing chat messages are wrapped.
    pub msg_wrap: bool,
    /// Whether console-origin chat is visible to ops only.
    pub chat_console_to_ops: bool,
    /// Whether a player list is shown to a player on connect.
    pub show_list_on_connect: bool,
    /// Whether join/leave and other ambient events are emitted.
    pub enable_events: bool,
    /// Gates the mod-specific `0xD3`/`0xE6` opcodes, absent from some
    /// protocol revisions (see SPEC_FULL.md §4.2.1).
    pub enable_mod_opcodes: bool,
    /// When set, every dig-finish (`0x0E` status `2`) is emitted twice to
    /// the server so the block breaks instantly client-side.
    pub instant_destroy: bool,
    /// Whether a guest identity may be assigned when the authenticator
    /// cannot resolve a pending request.
    pub allow_guest_join: bool,
    /// Whether the handshake's `serverId` is passed through unmodified
    /// (`true`) or rewritten to `"-"` (`false`, offline-style auth).
    pub use_cust_auth: bool,
    /// Idle timeout before a non-robot tunnel is considered inactive.
    pub idle_timeout: std::time::Duration,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            command_prefix: CommandPrefix::Slash,
            max_players: 20,
            forward_chat: true,
            use_msg_formats: true,
            msg_wrap: true,
            chat_console_to_ops: true,
            show_list_on_connect: true,
            enable_events: true,
            enable_mod_opcodes: false,
            instant_destroy: false,
            allow_guest_join: true,
            use_cust_auth: true,
            idle_timeout: std::time::Duration::from_secs(30),
        }
    }
}

impl TunnelConfig {
    /// Build config from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `server.properties`-style file.
    pub fn from_properties_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let props = TunnelProperties::load_from_file(path)?;
        Ok(Self::from_properties(&props))
    }

    /// Load from a `server.properties`-style file, falling back to
    /// defaults if it doesn't exist.
    pub fn from_properties_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match TunnelProperties::load_from_file(&path) {
            Ok(props) => Ok(Self::from_properties(&props)),
            Err(TunnelError::Persistence(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    /// Build config from an already-parsed properties file.
    pub fn from_properties(props: &TunnelProperties) -> Self {
        let mut config = Self::default();
        config.command_prefix = if props.bool_or("use-slashes", true) {
            CommandPrefix::Slash
        } else {
            CommandPrefix::Bang
        };
        config.max_players = props.int_or("max-players", config.max_players);
        config.forward_chat = props.bool_or("forward-chat", config.forward_chat);
        config.use_msg_formats = props.bool_or("use-msg-formats", config.use_msg_formats);
        config.msg_wrap = props.bool_or("msg-wrap", config.msg_wrap);
        config.chat_console_to_ops = props.bool_or("chat-console-to-ops", config.chat_console_to_ops);
        config.show_list_on_connect = props.bool_or("show-list-on-connect", config.show_list_on_connect);
        config.enable_events = props.bool_or("enable-events", config.enable_events);
        config.enable_mod_opcodes = props.bool_or("enable-mod-opcodes", config.enable_mod_opcodes);
        config.instant_destroy = props.bool_or("instant-destroy", config.instant_destroy);
        config.allow_guest_join = props.bool_or("allow-guest-join", config.allow_guest_join);
        config.use_cust_auth = props.bool_or("use-cust-auth", config.use_cust_auth);
        config
    }

    /// Whether the `EXPENSIVE_DEBUG_LOGGING` env var requests per-direction
    /// debug-dump tee files.
    pub fn debug_dumps_requested() -> bool {
        std::env::var_os(crate::io::tee::DebugDumps::ENV_VAR).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_slash_prefix() {
        let config = TunnelConfig::default();
        assert_eq!(config.command_prefix.as_char(), '/');
    }

    #[test]
    fn properties_override_defaults() {
        let mut props = TunnelProperties::default();
        props.set("use-slashes", "false");
        props.set("max-players", "64");
        let config = TunnelConfig::from_properties(&props);
        assert_eq!(config.command_prefix, CommandPrefix::Bang);
        assert_eq!(config.max_players, 64);
    }
}
