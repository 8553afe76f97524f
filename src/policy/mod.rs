//! Per-opcode policy hooks: the ~30% of the grammar that isn't pure
//! pass-through. Each hook owns writing the opcode byte itself (or
//! suppressing the packet entirely), since only the hook knows whether
//! the packet survives policy at all.

mod chat;
mod dig;
mod disconnect;
mod encryption;
mod entity_spawn;
mod handshake;
mod login;
mod place;
mod use_entity;
mod welcome;
mod window;

pub use window::handle_block_change;

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;

/// True if `opcode` carries a policy hook rather than pure pass-through.
pub fn has_hook(op: u8) -> bool {
    matches!(
        op,
        opcode::LOGIN
            | opcode::HANDSHAKE
            | opcode::CHAT
            | opcode::USE_ENTITY
            | opcode::DIG
            | opcode::PLACE
            | opcode::PLAYER
            | opcode::NAMED_ENTITY_SPAWN
            | opcode::BLOCK_CHANGE
            | opcode::OPEN_WINDOW
            | opcode::ENCRYPTION_RESPONSE
            | opcode::ENCRYPTION_REQUEST
            | opcode::DISCONNECT
    )
}

/// Run the policy hook registered for `op`. Called only after `op` has
/// already been read off the wire; the hook reads the rest of the
/// packet's fields itself.
pub async fn run(
    op: u8,
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    match op {
        opcode::LOGIN => login::handle(direction, reader, writer, session, ctx).await,
        opcode::HANDSHAKE => handshake::handle(direction, reader, writer, session, ctx).await,
        opcode::CHAT => chat::handle(direction, reader, writer, session, ctx).await,
        opcode::USE_ENTITY => use_entity::handle(direction, reader, writer, session).await,
        opcode::DIG => dig::handle(direction, reader, writer, session, ctx).await,
        opcode::PLACE => place::handle(direction, reader, writer, session, ctx).await,
        opcode::PLAYER => welcome::handle(direction, reader, writer, session, ctx).await,
        opcode::NAMED_ENTITY_SPAWN => entity_spawn::handle(direction, reader, writer, session, ctx).await,
        opcode::BLOCK_CHANGE => window::handle_block_change(direction, reader, writer, session, ctx).await,
        opcode::OPEN_WINDOW => window::handle_open_window(direction, reader, writer, session, ctx).await,
        opcode::ENCRYPTION_REQUEST => encryption::handle_request(direction, reader, writer, session, ctx).await,
        opcode::ENCRYPTION_RESPONSE => encryption::handle_response(direction, reader, writer, session, ctx).await,
        opcode::DISCONNECT => disconnect::handle(direction, reader, writer, session, ctx).await,
        other => unreachable!("policy::run called for opcode {other:#04x} with no registered hook"),
    }
}
