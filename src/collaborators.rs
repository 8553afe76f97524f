//! Collaborator interfaces the host of this crate is expected to supply:
//! authentication, permissions, command execution, event notification,
//! and translation. Out of scope as concrete systems per the spec; each
//! trait here also gets one reference implementation sufficient to drive
//! the policy hooks end-to-end in tests.

use async_trait::async_trait;
use std::net::IpAddr;

/// A pending login request resolved by the authenticator, keyed by the
/// connecting IP before the handshake name is known.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// The verified player name for this request.
    pub name: String,
}

/// External authentication and guest-naming collaborator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Find a pending auth request for `ip`, if the host's auth flow
    /// (e.g. a web login) already resolved one.
    async fn get_auth_request(&self, ip: IpAddr) -> Option<AuthRequest>;

    /// Mark `request` as completed for `player_name`.
    async fn complete_login(&self, request: &AuthRequest, player_name: &str);

    /// Hand out a fresh guest name (`Guest1`, `Guest2`, ...).
    async fn get_free_guest_name(&self) -> String;

    /// Whether guests are allowed to join at all.
    fn allow_guest_join(&self) -> bool;

    /// Whether `player_name` should go through the custom (non-Mojang)
    /// auth path.
    fn use_cust_auth(&self, player_name: &str) -> bool;

    /// Perform online (session-server) authentication for `player_name`.
    /// Returns `Ok(())` on success.
    async fn online_authenticate(&self, player_name: &str) -> Result<(), String>;

    /// Whether the upstream authentication service is currently up.
    fn is_minecraft_up(&self) -> bool;
}

/// A stub authenticator: always up, always allows guests, completes no
/// pending requests. Enough to exercise the handshake/encryption policy
/// hooks in tests without a real session-server dependency.
#[derive(Debug, Default)]
pub struct StubAuthenticator {
    guest_counter: std::sync::atomic::AtomicU32,
    allow_guests: bool,
    minecraft_up: bool,
}

impl StubAuthenticator {
    /// A stub that allows guests and reports the upstream as up.
    pub fn permissive() -> Self {
        Self {
            guest_counter: std::sync::atomic::AtomicU32::new(0),
            allow_guests: true,
            minecraft_up: true,
        }
    }

    /// A stub that disallows guests, forcing a kick on unresolved logins.
    pub fn no_guests() -> Self {
        Self {
            guest_counter: std::sync::atomic::AtomicU32::new(0),
            allow_guests: false,
            minecraft_up: true,
        }
    }
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn get_auth_request(&self, _ip: IpAddr) -> Option<AuthRequest> {
        None
    }

    async fn complete_login(&self, _request: &AuthRequest, _player_name: &str) {}

    async fn get_free_guest_name(&self) -> String {
        let n = self.guest_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        format!("Guest{n}")
    }

    fn allow_guest_join(&self) -> bool {
        self.allow_guests
    }

    fn use_cust_auth(&self, _player_name: &str) -> bool {
        true
    }

    async fn online_authenticate(&self, _player_name: &str) -> Result<(), String> {
        Ok(())
    }

    fn is_minecraft_up(&self) -> bool {
        self.minecraft_up
    }
}

/// Whether a dig action is permitted at a coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockPermission {
    /// May the player interact with (start digging) the block.
    pub use_: bool,
    /// May the player break (finish digging) the block.
    pub destroy: bool,
}

impl BlockPermission {
    /// Permission to both use and destroy.
    pub fn allow_all() -> Self {
        Self { use_: true, destroy: true }
    }

    /// Permission to neither use nor destroy.
    pub fn deny_all() -> Self {
        Self::default()
    }
}

/// World/permission-group collaborator consulted by the dig/place hooks.
#[async_trait]
pub trait PermissionConfig: Send + Sync {
    /// Compute dig permission for `player` at `coord` given their group.
    async fn block_permission(&self, player_group: &str, coord: crate::registries::Coordinate) -> BlockPermission;

    /// Whether `player_group` may place `item_id` at all.
    async fn may_place(&self, player_group: &str, item_id: i16) -> bool;

    /// Whether the player occupying `target_entity_id` currently has
    /// god mode enabled, shielding them from incoming use-entity
    /// (attack) packets.
    async fn is_god_mode(&self, target_entity_id: i32) -> bool;
}

/// A permission config granting every group full permission everywhere;
/// useful as the default in tests and the example binary.
#[derive(Debug, Default)]
pub struct OpenPermissionConfig;

#[async_trait]
impl PermissionConfig for OpenPermissionConfig {
    async fn block_permission(&self, _player_group: &str, _coord: crate::registries::Coordinate) -> BlockPermission {
        BlockPermission::allow_all()
    }

    async fn may_place(&self, _player_group: &str, _item_id: i16) -> bool {
        true
    }

    async fn is_god_mode(&self, _target_entity_id: i32) -> bool {
        false
    }
}

/// The result of running a chat message through the command processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command was handled; suppress the original packet.
    Handled,
    /// The command was handled and the text should be forwarded rewritten.
    Rewritten(String),
}

/// Command parsing/execution collaborator, invoked with the full message
/// including its prefix character.
#[async_trait]
pub trait CommandProcessor: Send + Sync {
    /// Run `message` (including its leading `/` or `!`) as a command for
    /// `player_name`. Returns `None` to suppress with no rewrite.
    async fn execute(&self, player_name: &str, message: &str) -> Option<CommandOutcome>;
}

/// A command processor that swallows every command (used by default
/// where no real command dispatcher is wired in).
#[derive(Debug, Default)]
pub struct NullCommandProcessor;

#[async_trait]
impl CommandProcessor for NullCommandProcessor {
    async fn execute(&self, _player_name: &str, _message: &str) -> Option<CommandOutcome> {
        None
    }
}

/// Ambient event notifications (join, leave, kick, chest lock change,
/// etc), fired best-effort and never allowed to fail a tunnel.
#[async_trait]
pub trait EventHost: Send + Sync {
    /// A player joined.
    async fn player_joined(&self, player_name: &str);
    /// A player left.
    async fn player_left(&self, player_name: &str);
}

/// An event host that does nothing; used when `enable_events` is off or
/// no event sink is wired in.
#[derive(Debug, Default)]
pub struct NullEventHost;

#[async_trait]
impl EventHost for NullEventHost {
    async fn player_joined(&self, _player_name: &str) {}
    async fn player_left(&self, _player_name: &str) {}
}

/// Localization collaborator for system messages synthesized by the
/// tunnel (e.g. translating a structured join/leave notification into
/// the target locale).
pub trait Translator: Send + Sync {
    /// Translate `key` with `args` substituted positionally (`{0}`, `{1}`, ...).
    fn translate(&self, key: &str, args: &[&str]) -> String;
}

/// A translator that performs `{0}`-style substitution against an
/// English template map, falling back to the key itself if unknown.
#[derive(Debug, Default)]
pub struct EnglishTranslator;

impl Translator for EnglishTranslator {
    fn translate(&self, key: &str, args: &[&str]) -> String {
        let template = match key {
            "player.joined" => "{0} joined the game",
            "player.left" => "{0} left the game",
            "chest.denied" => "You don't have permission to open that chest",
            "block.denied" => "You don't have permission to do that",
            "chat.muted" => "You are muted!",
            "system.welcome" => "Welcome! Type /help for a list of commands.",
            _ => key,
        };
        let mut out = template.to_string();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_authenticator_hands_out_sequential_guest_names() {
        let auth = StubAuthenticator::permissive();
        assert_eq!(auth.get_free_guest_name().await, "Guest1");
        assert_eq!(auth.get_free_guest_name().await, "Guest2");
    }

    #[test]
    fn translator_substitutes_positional_args() {
        let t = EnglishTranslator;
        assert_eq!(t.translate("player.joined", &["Alice"]), "Alice joined the game");
    }
}
