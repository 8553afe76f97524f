//! `0x0F` Place: item-in-hand permission checks plus the chest-specific
//! sub-protocol (item id `54`) that records the placing coordinate for
//! the subsequent `0x35` block-change to pick up.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{Item, PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::registries::Coordinate;
use crate::session::Session;

/// Item id that places a chest.
const CHEST_ITEM_ID: i16 = 54;
/// Synthetic drop-item status used to desync-correct the client's held
/// item after a denied placement (see `0x0E`).
const SYNTHETIC_DROP_STATUS: i8 = 4;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    if direction != Direction::ClientToServer {
        return pass_through(reader, writer).await;
    }

    let x = reader.read_i32().await?;
    let y = reader.read_i8().await?;
    let z = reader.read_i32().await?;
    let direction_face = reader.read_i8().await?;
    let item = Item::read(reader).await?;
    let block_x = reader.read_i8().await?;
    let block_y = reader.read_i8().await?;
    let block_z = reader.read_i8().await?;

    let group = session.permission_group.lock().unwrap().clone();
    let target = Coordinate::new(x + block_x as i32, y as i32 + block_y as i32, z + block_z as i32);

    let mut deny_reason: Option<&'static str> = None;

    if !ctx.permissions.may_place(&group, item.id).await {
        deny_reason = Some("block.denied");
    } else if item.id == CHEST_ITEM_ID {
        let player = session.name().unwrap_or_default();
        if let Some((_adjacent_coord, lock)) = ctx.chests.adjacent(target).await {
            if lock.is_locked() && lock.owner.as_deref() != Some(player.as_str()) {
                deny_reason = Some("chest.denied");
            }
        }
    }

    if let Some(key) = deny_reason {
        let notice = ctx.notice(key, &[]);
        session.enqueue_inbound_chat(notice);
        write_synthetic_drop(writer, x, y, z, direction_face).await?;
        tracing::debug!(x, y, z, item_id = item.id, "place denied");
        return Ok(());
    }

    if item.id == CHEST_ITEM_ID {
        *session.pending_chest.lock().unwrap() = Some(target);
    }

    writer.write_u8(opcode::PLACE).await?;
    writer.write_i32(x).await?;
    writer.write_i8(y).await?;
    writer.write_i32(z).await?;
    writer.write_i8(direction_face).await?;
    item.write(writer).await?;
    writer.write_i8(block_x).await?;
    writer.write_i8(block_y).await?;
    writer.write_i8(block_z).await?;
    Ok(())
}

async fn write_synthetic_drop(writer: &mut PacketWriter, x: i32, y: i8, z: i32, face: i8) -> Result<()> {
    writer.write_u8(opcode::DIG).await?;
    writer.write_i8(SYNTHETIC_DROP_STATUS).await?;
    writer.write_i32(x).await?;
    writer.write_i8(y).await?;
    writer.write_i32(z).await?;
    writer.write_i8(face).await?;
    Ok(())
}

async fn pass_through(reader: &mut PacketReader, writer: &mut PacketWriter) -> Result<()> {
    writer.write_u8(opcode::PLACE).await?;
    writer.write_i32(reader.read_i32().await?).await?;
    writer.write_i8(reader.read_i8().await?).await?;
    writer.write_i32(reader.read_i32().await?).await?;
    writer.write_i8(reader.read_i8().await?).await?;
    Item::read(reader).await?.write(writer).await?;
    writer.write_i8(reader.read_i8().await?).await?;
    writer.write_i8(reader.read_i8().await?).await?;
    writer.write_i8(reader.read_i8().await?).await?;
    Ok(())
}
