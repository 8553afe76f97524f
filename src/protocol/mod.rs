//! Dispatch: reads one opcode byte and routes it either to a policy
//! hook or to the pass-through grammar table. This is the one place
//! that decides whether an opcode is known at all.

pub mod grammar;
pub mod opcode;

use crate::context::ServerContext;
use crate::error::{Result, TunnelError};
use crate::io::{PacketReader, PacketWriter};
use crate::policy;
use crate::session::Session;

/// Which side of the pair this tunnel carries traffic for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ServerToClient,
    ClientToServer,
}

/// Read and handle exactly one packet. Returns the opcode that was
/// dispatched, so the caller can remember it as `previous` for the next
/// call's error context.
pub async fn dispatch(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
    previous: Option<u8>,
) -> Result<u8> {
    let op = reader.read_u8().await?;

    if opcode::is_mod_specific(op) && !ctx.config.enable_mod_opcodes {
        return Err(TunnelError::ProtocolDesync {
            opcode: op,
            previous,
            reason: "mod-specific opcode seen with enable_mod_opcodes disabled".to_string(),
        });
    }

    if policy::has_hook(op) {
        policy::run(op, direction, reader, writer, session, ctx).await?;
        return Ok(op);
    }

    if let Some(shape) = grammar::shape_for(op) {
        writer.write_u8(op).await?;
        grammar::pass_through(reader, writer, shape).await?;
        return Ok(op);
    }

    Err(TunnelError::ProtocolDesync {
        opcode: op,
        previous,
        reason: "unknown opcode".to_string(),
    })
}
