//! `0x0A` Player: a high-frequency "on ground" heartbeat from the
//! client. The only policy here fires once per connection — the first
//! client→server occurrence marks the session welcomed and, if
//! configured, sends a one-time MOTD-style notice. Every other
//! occurrence, and the server→client direction, is pure pass-through.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;
use std::sync::atomic::Ordering;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let on_ground = reader.read_bool().await?;

    let first_time = direction == Direction::ClientToServer && !session.welcomed.swap(true, Ordering::SeqCst);
    if first_time && ctx.config.show_list_on_connect {
        let notice = ctx.notice("system.welcome", &[]);
        session.enqueue_inbound_chat(notice);
    }

    writer.write_u8(opcode::PLAYER).await?;
    writer.write_bool(on_ground).await?;
    Ok(())
}
