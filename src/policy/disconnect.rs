//! `0xFF` Disconnect: rewrites a server-list-ping response, flags
//! robots kicked for being idle too long, and always closes the
//! session afterward.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;
use std::sync::atomic::Ordering;

/// Sentinel prefix a client uses to request the legacy server-list-ping
/// response via a disconnect packet.
const PING_SENTINEL: &str = "\u{00a7}1";
const PROTOCOL_VERSION: &str = "39";
const GAME_VERSION: &str = "Beta 1.7.3";
const MOTD: &str = "A Minecraft Server";

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let _ = direction;
    let reason = reader.read_utf16().await?;

    writer.write_u8(opcode::DISCONNECT).await?;
    if reason.starts_with(PING_SENTINEL) {
        let response = format!(
            "{PING_SENTINEL}\0{PROTOCOL_VERSION}\0{GAME_VERSION}\0{MOTD}\0{}\0{}",
            0, ctx.config.max_players
        );
        writer.write_utf16(&response).await?;
    } else {
        if reason.starts_with("Took too long") {
            session.robot.store(true, Ordering::Relaxed);
        }
        writer.write_utf16(&reason).await?;
    }

    tracing::info!(player = ?session.name(), %reason, "disconnect: closing session");
    session.kick(reason);
    Ok(())
}
