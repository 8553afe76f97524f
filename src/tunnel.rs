//! The tunnel worker loop: one `Tunnel` drives one direction of one
//! player's connection, dispatching packets through [`crate::protocol`]
//! until the stream closes or the session is kicked.
//!
//! A player has two tunnels, server→client and client→server, sharing
//! one [`Session`] but never a lock over it as a whole (see
//! SPEC_FULL.md §5). Two pieces of cross-tunnel coordination live here
//! rather than in the policy hooks that trigger them, because a single
//! hook invocation only has access to its own tunnel's reader/writer:
//! chat injected by the *other* tunnel's hooks (drained from the
//! session's queues every iteration), and the encrypted-stream swap
//! armed by the `0xFC` handshake hook (each tunnel performs its own
//! swap, using whichever `EncryptionContext` is correct for its
//! direction, the first time it observes [`Session::encryption_armed`]
//! set).

use crate::context::ServerContext;
use crate::error::{Result, TunnelError};
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{self, opcode, Direction};
use crate::session::Session;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// One direction of one player's connection.
pub struct Tunnel {
    direction: Direction,
    reader: PacketReader,
    writer: PacketWriter,
    session: Arc<Session>,
    ctx: Arc<ServerContext>,
    /// Set once this tunnel's own dispatch loop has written a `0xFF`
    /// disconnect packet, so the final-disconnect cleanup on exit doesn't
    /// send a second one with the same reason.
    disconnect_sent: bool,
}

impl Tunnel {
    pub fn new(
        direction: Direction,
        reader: PacketReader,
        writer: PacketWriter,
        session: Arc<Session>,
        ctx: Arc<ServerContext>,
    ) -> Self {
        Self { direction, reader, writer, session, ctx, disconnect_sent: false }
    }

    /// Run the dispatch loop until the stream closes, the session is
    /// kicked, or a fatal protocol error occurs. Always attempts a final
    /// disconnect packet before returning if the session was kicked.
    pub async fn run(mut self) {
        let mut previous: Option<u8> = None;
        let mut encryption_installed = false;

        loop {
            if !self.session.run.load(Ordering::SeqCst) {
                break;
            }

            match protocol::dispatch(
                self.direction,
                &mut self.reader,
                &mut self.writer,
                &self.session,
                &self.ctx,
                previous,
            )
            .await
            {
                Ok(op) => {
                    self.session.touch();
                    if op == opcode::DISCONNECT {
                        self.disconnect_sent = true;
                    }
                    previous = Some(op);
                }
                Err(err) => {
                    if err.is_fatal() {
                        tracing::warn!(direction = ?self.direction, %err, "tunnel loop ending");
                        break;
                    }
                    tracing::debug!(direction = ?self.direction, %err, "recoverable error, continuing");
                    continue;
                }
            }

            if let Err(err) = self.drain_chat_queue().await {
                tracing::warn!(direction = ?self.direction, %err, "failed writing queued chat");
                break;
            }

            if let Err(err) = self.writer.flush().await {
                tracing::warn!(direction = ?self.direction, %err, "flush failed");
                break;
            }

            if !encryption_installed && self.session.encryption_armed.load(Ordering::SeqCst) {
                self.install_encryption();
                encryption_installed = true;
            }
        }

        self.send_final_disconnect().await;
    }

    /// Drain whichever chat queue this tunnel's direction owns, emitting
    /// one `0x03` packet per queued message.
    async fn drain_chat_queue(&mut self) -> Result<()> {
        let messages = match self.direction {
            Direction::ServerToClient => self.session.drain_inbound_chat(),
            Direction::ClientToServer => self.session.drain_forward_chat(),
        };
        for message in messages {
            self.writer.write_u8(opcode::CHAT).await?;
            self.writer.write_utf16(&message).await?;
        }
        Ok(())
    }

    /// Swap this tunnel's reader/writer onto the encrypted stream, using
    /// the `EncryptionContext` appropriate to its direction: a
    /// server→client tunnel reads what the server sent (decrypt with
    /// `server_encryption`) and writes what the client receives (encrypt
    /// with `client_encryption`); a client→server tunnel is the mirror.
    fn install_encryption(&mut self) {
        let (read_ctx, write_ctx) = match self.direction {
            Direction::ServerToClient => (&self.session.server_encryption, &self.session.client_encryption),
            Direction::ClientToServer => (&self.session.client_encryption, &self.session.server_encryption),
        };
        {
            let ctx = read_ctx.lock().unwrap();
            self.reader.map_inner(|raw| ctx.encrypted_input_stream(raw));
        }
        {
            let ctx = write_ctx.lock().unwrap();
            self.writer.map_inner(|raw| ctx.encrypted_output_stream(raw));
        }
        tracing::debug!(direction = ?self.direction, "encrypted stream installed");
    }

    /// Best-effort final `0xFF` disconnect, sent only if the session
    /// carries a kick reason and this tunnel hasn't already emitted one
    /// as part of normal dispatch (e.g. the stream died before a
    /// disconnect packet could flow through the grammar).
    async fn send_final_disconnect(&mut self) {
        if self.disconnect_sent {
            return;
        }
        let Some(reason) = self.session.kick_reason() else { return };
        if self.writer.write_u8(opcode::DISCONNECT).await.is_err() {
            return;
        }
        let _ = self.writer.write_utf16(&reason).await;
        let _ = self.writer.flush().await;
    }
}

/// Spawn the two tunnels for one player connection, returning once both
/// have exited. Not itself a policy surface: construction of the
/// underlying sockets and `PacketReader`/`PacketWriter` pairs is the
/// caller's job (see `src/bin/tunnel-pair.rs`).
pub async fn run_pair(server_to_client: Tunnel, client_to_server: Tunnel) {
    let a = tokio::spawn(server_to_client.run());
    let b = tokio::spawn(client_to_server.run());
    let _ = tokio::join!(a, b);
}

/// How often [`watch_idle`] re-checks `Session::is_active`.
pub const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll `session` until it has gone idle for at least `timeout`, then
/// kick it and return. Per SPEC_FULL.md §5, the idle watchdog is the
/// *acceptor's* responsibility rather than the tunnel loop's: a tunnel
/// only reads its `Box<dyn AsyncRead>`, which has no shutdown handle,
/// so only the caller that owns the raw socket can actually unblock a
/// parked read once this future resolves and the session is kicked.
pub async fn watch_idle(session: Arc<Session>, timeout: Duration) {
    let mut ticker = tokio::time::interval(WATCHDOG_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if !session.run.load(Ordering::SeqCst) {
            return;
        }
        if !session.is_active(timeout) {
            session.kick("Took too long to respond".to_string());
            return;
        }
    }
}
