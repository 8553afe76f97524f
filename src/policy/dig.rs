//! `0x0E` Dig: start/finish permission checks, locked-chest release on
//! destroy, optional instant-destroy duplication, and the destroyed-
//! block counter.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::registries::Coordinate;
use crate::session::Session;
use std::sync::atomic::Ordering;

const STATUS_START: i8 = 0;
const STATUS_FINISH: i8 = 2;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    if direction != Direction::ClientToServer {
        return pass_through_server_to_client(reader, writer).await;
    }

    let status = reader.read_i8().await?;
    let x = reader.read_i32().await?;
    let y = reader.read_i8().await?;
    let z = reader.read_i32().await?;
    let face = reader.read_i8().await?;
    let coord = Coordinate::new(x, y as i32, z);

    let player = session.name().unwrap_or_default();
    let group = session.permission_group.lock().unwrap().clone();
    let permission = ctx.permissions.block_permission(&group, coord).await;

    let required = match status {
        STATUS_START => permission.use_,
        STATUS_FINISH => permission.destroy,
        _ => true,
    };
    if !required {
        let notice = ctx.notice("block.denied", &[]);
        session.enqueue_inbound_chat(notice);
        tracing::debug!(%player, x, y, z, status, "dig denied by permission");
        return Ok(());
    }

    if status == STATUS_FINISH && ctx.chests.is_locked(coord).await && !ctx.chests.can_open(&player, coord).await {
        tracing::debug!(%player, x, y, z, "dig denied: locked chest not owned by player");
        return Ok(());
    }

    if status == STATUS_START {
        *session.last_used_block.lock().unwrap() = Some(coord);
    }

    if status == STATUS_FINISH {
        if ctx.chests.is_locked(coord).await {
            ctx.chests.release(coord).await.map_err(log_persistence_error)?;
        }
        session.destroyed_blocks.fetch_add(1, Ordering::Relaxed);
    }

    write_dig(writer, status, x, y, z, face).await?;
    if status == STATUS_FINISH && ctx.config.instant_destroy {
        write_dig(writer, status, x, y, z, face).await?;
    }
    Ok(())
}

async fn pass_through_server_to_client(reader: &mut PacketReader, writer: &mut PacketWriter) -> Result<()> {
    let status = reader.read_i8().await?;
    let x = reader.read_i32().await?;
    let y = reader.read_i8().await?;
    let z = reader.read_i32().await?;
    let face = reader.read_i8().await?;
    write_dig(writer, status, x, y as i32, z, face).await
}

async fn write_dig(writer: &mut PacketWriter, status: i8, x: i32, y: i32, z: i32, face: i8) -> Result<()> {
    writer.write_u8(opcode::DIG).await?;
    writer.write_i8(status).await?;
    writer.write_i32(x).await?;
    writer.write_i8(y as i8).await?;
    writer.write_i32(z).await?;
    writer.write_i8(face).await?;
    Ok(())
}

fn log_persistence_error(err: crate::error::TunnelError) -> crate::error::TunnelError {
    tracing::warn!(%err, "chest registry persistence failed");
    err
}
