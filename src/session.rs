//! Per-player shared state: the single mutable record both tunnel
//! workers for a connection read and write. The two workers never share
//! a lock over this state as a whole; they only communicate through the
//! chat queues and the atomics below, matching the duplex concurrency
//! model (see SPEC_FULL.md §5).

use crate::registries::Coordinate;
use crate::transport::EncryptionContext;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Last-known player position and orientation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub stance: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// A pending chest-lock request set by the command processor (e.g. a
/// `/lock` or `/unlock` command), consulted and cleared by the
/// open-window hook the next time the player opens that chest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestLockRequest {
    Lock,
    Unlock,
}

/// The mutable state of one connected player, shared by its
/// server→client and client→server tunnels.
pub struct Session {
    start: Instant,

    /// The connecting client's address, used to resolve a pending
    /// out-of-band auth request by IP during the handshake.
    pub peer_ip: Option<std::net::IpAddr>,

    pub entity_id: Mutex<i32>,
    pub dimension: Mutex<i32>,
    name: Mutex<Option<String>>,
    pub guest: AtomicBool,
    pub position: Mutex<Position>,
    pub muted: AtomicBool,
    pub permission_group: Mutex<String>,

    inbound_chat_tx: UnboundedSender<String>,
    inbound_chat_rx: Mutex<UnboundedReceiver<String>>,
    forward_chat_tx: UnboundedSender<String>,
    forward_chat_rx: Mutex<UnboundedReceiver<String>>,

    /// Encryption context facing the upstream server.
    pub server_encryption: Mutex<Box<dyn EncryptionContext>>,
    /// Encryption context facing the connecting client.
    pub client_encryption: Mutex<Box<dyn EncryptionContext>>,

    pub pending_chest: Mutex<Option<Coordinate>>,
    chest_lock_request: Mutex<Option<ChestLockRequest>>,

    /// Coordinate of the block the player most recently started digging,
    /// used by the open-window hook to recover the target coordinate
    /// since `0x64` itself carries no block position (see DESIGN.md).
    pub last_used_block: Mutex<Option<Coordinate>>,

    /// The last chat text this player's own tunnel forwarded upstream,
    /// used to detect and suppress the server echoing it straight back
    /// (forwarding loopback).
    last_forwarded_chat: Mutex<Option<String>>,

    kick_reason: Mutex<Option<String>>,
    pub robot: AtomicBool,
    pub god_mode: AtomicBool,
    pub destroyed_blocks: AtomicU64,

    /// Set the first time a client→server `0x0A` packet is seen, so the
    /// welcome/MOTD notice is sent at most once per connection.
    pub welcomed: AtomicBool,

    /// Set once the `0xFC` encryption response has installed a shared
    /// key in both encryption contexts; each tunnel worker checks this
    /// after every dispatched packet and swaps its own reader/writer to
    /// the encrypted stream the first time it observes it set (see
    /// [`crate::tunnel`]).
    pub encryption_armed: AtomicBool,

    last_read_millis: AtomicI64,
    pub run: AtomicBool,
}

impl Session {
    /// A fresh session for a newly accepted connection.
    pub fn new(
        server_encryption: Box<dyn EncryptionContext>,
        client_encryption: Box<dyn EncryptionContext>,
    ) -> Self {
        Self::with_peer_ip(server_encryption, client_encryption, None)
    }

    /// A fresh session, recording the connecting client's address.
    pub fn with_peer_ip(
        server_encryption: Box<dyn EncryptionContext>,
        client_encryption: Box<dyn EncryptionContext>,
        peer_ip: Option<std::net::IpAddr>,
    ) -> Self {
        let (inbound_chat_tx, inbound_chat_rx) = mpsc::unbounded_channel();
        let (forward_chat_tx, forward_chat_rx) = mpsc::unbounded_channel();
        Self {
            start: Instant::now(),
            peer_ip,
            entity_id: Mutex::new(0),
            dimension: Mutex::new(0),
            name: Mutex::new(None),
            guest: AtomicBool::new(false),
            position: Mutex::new(Position::default()),
            muted: AtomicBool::new(false),
            permission_group: Mutex::new("default".to_string()),
            inbound_chat_tx,
            inbound_chat_rx: Mutex::new(inbound_chat_rx),
            forward_chat_tx,
            forward_chat_rx: Mutex::new(forward_chat_rx),
            server_encryption: Mutex::new(server_encryption),
            client_encryption: Mutex::new(client_encryption),
            pending_chest: Mutex::new(None),
            chest_lock_request: Mutex::new(None),
            last_used_block: Mutex::new(None),
            last_forwarded_chat: Mutex::new(None),
            kick_reason: Mutex::new(None),
            robot: AtomicBool::new(false),
            god_mode: AtomicBool::new(false),
            destroyed_blocks: AtomicU64::new(0),
            welcomed: AtomicBool::new(false),
            encryption_armed: AtomicBool::new(false),
            last_read_millis: AtomicI64::new(0),
            run: AtomicBool::new(true),
        }
    }

    /// The player's name, once the handshake has completed.
    pub fn name(&self) -> Option<String> {
        self.name.lock().unwrap().clone()
    }

    /// Set the player's name. Per the handshake invariant, this is
    /// final for the life of the connection once called.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.lock().unwrap() = Some(name.into());
    }

    /// Queue `message` for delivery to the client (drained by the
    /// server→client tunnel).
    pub fn enqueue_inbound_chat(&self, message: impl Into<String>) {
        let _ = self.inbound_chat_tx.send(message.into());
    }

    /// Queue `message` for delivery to the server (drained by the
    /// client→server tunnel).
    pub fn enqueue_forward_chat(&self, message: impl Into<String>) {
        let _ = self.forward_chat_tx.send(message.into());
    }

    /// Drain every currently queued inbound-chat message.
    pub fn drain_inbound_chat(&self) -> Vec<String> {
        let mut rx = self.inbound_chat_rx.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    /// Drain every currently queued forward-chat message.
    pub fn drain_forward_chat(&self) -> Vec<String> {
        let mut rx = self.forward_chat_rx.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    /// Record a pending lock/unlock request for the next chest the
    /// player opens.
    pub fn request_chest_lock(&self, request: ChestLockRequest) {
        *self.chest_lock_request.lock().unwrap() = Some(request);
    }

    /// Take (and clear) the pending chest lock/unlock request.
    pub fn take_chest_lock_request(&self) -> Option<ChestLockRequest> {
        self.chest_lock_request.lock().unwrap().take()
    }

    /// Record `text` as the last chat forwarded upstream by this player.
    pub fn remember_forwarded_chat(&self, text: String) {
        *self.last_forwarded_chat.lock().unwrap() = Some(text);
    }

    /// The last chat text forwarded upstream, if any.
    pub fn last_forwarded_chat(&self) -> Option<String> {
        self.last_forwarded_chat.lock().unwrap().clone()
    }

    /// Clear the remembered forwarded-chat text once its loopback echo
    /// has been consumed.
    pub fn clear_last_forwarded_chat(&self) {
        *self.last_forwarded_chat.lock().unwrap() = None;
    }

    /// Flag the session to be kicked with `reason` at the next worker
    /// loop boundary.
    pub fn kick(&self, reason: impl Into<String>) {
        *self.kick_reason.lock().unwrap() = Some(reason.into());
        self.run.store(false, Ordering::SeqCst);
    }

    /// The pending kick reason, if the session has been flagged kicked.
    pub fn kick_reason(&self) -> Option<String> {
        self.kick_reason.lock().unwrap().clone()
    }

    /// Record that a packet was just read, resetting the idle clock.
    pub fn touch(&self) {
        let millis = self.start.elapsed().as_millis() as i64;
        self.last_read_millis.store(millis, Ordering::Relaxed);
    }

    /// True unless the session has been idle (no packet read) for at
    /// least `timeout`; robots are exempt from the idle watchdog.
    pub fn is_active(&self, timeout: Duration) -> bool {
        if self.robot.load(Ordering::Relaxed) {
            return true;
        }
        let last = self.last_read_millis.load(Ordering::Relaxed);
        let elapsed = self.start.elapsed().as_millis() as i64 - last;
        elapsed < timeout.as_millis() as i64
    }
}
