//! Immutable, process-wide state shared by every tunnel: configuration
//! plus the collaborator registries and interfaces the policy hooks
//! consult. One `ServerContext` is built once and handed to every
//! player's pair of tunnels as a cheap `Arc` clone.

use crate::collaborators::{Authenticator, CommandProcessor, EventHost, PermissionConfig, Translator};
use crate::config::TunnelConfig;
use crate::registries::{BotRegistry, ChestRegistry};
use std::sync::Arc;

/// Shared, read-mostly state handed to every tunnel worker.
pub struct ServerContext {
    pub config: TunnelConfig,
    pub chests: Arc<dyn ChestRegistry>,
    pub bots: Arc<dyn BotRegistry>,
    pub authenticator: Arc<dyn Authenticator>,
    pub permissions: Arc<dyn PermissionConfig>,
    pub commands: Arc<dyn CommandProcessor>,
    pub events: Arc<dyn EventHost>,
    pub translator: Arc<dyn Translator>,
}

impl ServerContext {
    /// Build a context from its parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TunnelConfig,
        chests: Arc<dyn ChestRegistry>,
        bots: Arc<dyn BotRegistry>,
        authenticator: Arc<dyn Authenticator>,
        permissions: Arc<dyn PermissionConfig>,
        commands: Arc<dyn CommandProcessor>,
        events: Arc<dyn EventHost>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config,
            chests,
            bots,
            authenticator,
            permissions,
            commands,
            events,
            translator,
        }
    }

    /// A context wired with the reference (in-memory/no-op) collaborator
    /// implementations, sufficient to run the crate end to end without a
    /// real auth/permission/persistence backend.
    pub fn with_defaults(config: TunnelConfig) -> Self {
        use crate::collaborators::{EnglishTranslator, NullCommandProcessor, NullEventHost, OpenPermissionConfig, StubAuthenticator};
        use crate::registries::{InMemoryBotRegistry, JsonFileChestRegistry};

        Self::new(
            config,
            Arc::new(JsonFileChestRegistry::in_memory()),
            Arc::new(InMemoryBotRegistry::new()),
            Arc::new(StubAuthenticator::permissive()),
            Arc::new(OpenPermissionConfig),
            Arc::new(NullCommandProcessor),
            Arc::new(NullEventHost),
            Arc::new(EnglishTranslator),
        )
    }

    /// Render a synthesized system notice (mute, permission denial,
    /// join/leave, welcome), honoring `use_msg_formats`: when enabled
    /// (the default) the translator's template is used; when disabled,
    /// the bare key is sent instead, matching a host that wants to
    /// render these notices itself rather than have this crate format
    /// them.
    pub fn notice(&self, key: &str, args: &[&str]) -> String {
        if self.config.use_msg_formats {
            self.translator.translate(key, args)
        } else {
            key.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_builds_with_every_collaborator_wired() {
        let ctx = ServerContext::with_defaults(TunnelConfig::default());
        assert_eq!(ctx.config.max_players, 20);
    }

    #[test]
    fn notice_is_templated_by_default_and_raw_when_msg_formats_are_disabled() {
        let ctx = ServerContext::with_defaults(TunnelConfig::default());
        assert_eq!(ctx.notice("player.joined", &["Alice"]), "Alice joined the game");

        let mut config = TunnelConfig::default();
        config.use_msg_formats = false;
        let ctx = ServerContext::with_defaults(config);
        assert_eq!(ctx.notice("player.joined", &["Alice"]), "player.joined");
    }
}
