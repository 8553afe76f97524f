//! `0x01` Login: captures entity id/dimension on the way to the client
//! and rewrites `maxPlayers`; passes through untouched client→server.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    writer.write_u8(opcode::LOGIN).await?;
    match direction {
        Direction::ServerToClient => {
            let entity_id = reader.read_i32().await?;
            writer.write_i32(entity_id).await?;
            *session.entity_id.lock().unwrap() = entity_id;

            let world_name = reader.read_utf16().await?;
            writer.write_utf16(&world_name).await?;

            let dimension = reader.read_i8().await?;
            writer.write_i8(dimension).await?;
            *session.dimension.lock().unwrap() = dimension as i32;

            let _server_max_players = reader.read_i8().await?;
            writer.write_i8(ctx.config.max_players as i8).await?;

            tracing::debug!(
                player = ?session.name(),
                entity_id,
                dimension,
                "login: captured entity id/dimension, rewrote max players"
            );
        }
        Direction::ClientToServer => {
            let version = reader.read_i32().await?;
            writer.write_i32(version).await?;
            let username = reader.read_utf16().await?;
            writer.write_utf16(&username).await?;
            let unused = reader.read_i64().await?;
            writer.write_i64(unused).await?;
            let dimension = reader.read_i8().await?;
            writer.write_i8(dimension).await?;
        }
    }
    Ok(())
}
