//! `0x35` Block-change and `0x64` Open-window: the chest lock
//! sub-protocol. A placed chest is confirmed by the block-change that
//! follows it; opening a chest checks and may toggle its lock.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::registries::Coordinate;
use crate::session::{ChestLockRequest, Session};

const CHEST_BLOCK_ID: i8 = 54;
const CHEST_INVENTORY_TYPE: i8 = 0;

pub async fn handle_block_change(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let x = reader.read_i32().await?;
    let y = reader.read_i8().await?;
    let z = reader.read_i32().await?;
    let block_type = reader.read_i8().await?;
    let block_metadata = reader.read_i8().await?;

    writer.write_u8(opcode::BLOCK_CHANGE).await?;
    writer.write_i32(x).await?;
    writer.write_i8(y).await?;
    writer.write_i32(z).await?;
    writer.write_i8(block_type).await?;
    writer.write_i8(block_metadata).await?;

    if direction == Direction::ServerToClient && block_type == CHEST_BLOCK_ID {
        let coord = Coordinate::new(x, y as i32, z);
        let matched = {
            let mut pending = session.pending_chest.lock().unwrap();
            if *pending == Some(coord) {
                pending.take();
                true
            } else {
                false
            }
        };
        if matched {
            lock_chest(coord, session, ctx).await?;
        }
    }
    Ok(())
}

pub async fn handle_open_window(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let window_id = reader.read_i8().await?;
    let inventory_type = reader.read_i8().await?;
    let mut title = reader.read_utf16().await?;
    let slots = reader.read_i8().await?;

    if direction == Direction::ServerToClient && inventory_type == CHEST_INVENTORY_TYPE {
        if let Some(coord) = session.last_used_block.lock().unwrap().take() {
            if ctx.chests.get(coord).await.is_none() {
                lock_chest(coord, session, ctx).await?;
            }

            let player = session.name().unwrap_or_default();
            if ctx.chests.is_locked(coord).await && !ctx.chests.can_open(&player, coord).await {
                writer.write_u8(opcode::CLOSE_WINDOW).await?;
                writer.write_i8(window_id).await?;
                tracing::debug!(?coord, %player, "open-window denied: locked chest");
                return Ok(());
            }

            match session.take_chest_lock_request() {
                Some(ChestLockRequest::Unlock) if ctx.chests.is_locked(coord).await => {
                    ctx.chests.release(coord).await.map_err(log_persistence_error)?;
                    title = format!("{title} (unlocked)");
                }
                Some(ChestLockRequest::Lock) if !ctx.chests.is_locked(coord).await => {
                    ctx.chests
                        .give_lock(coord, &player, Some(title.clone()))
                        .await
                        .map_err(log_persistence_error)?;
                    title = format!("{title} (locked)");
                }
                _ => {}
            }
        }
    }

    writer.write_u8(opcode::OPEN_WINDOW).await?;
    writer.write_i8(window_id).await?;
    writer.write_i8(inventory_type).await?;
    writer.write_utf16(&title).await?;
    writer.write_i8(slots).await?;
    Ok(())
}

/// Grant or register the lock for a newly-confirmed chest coordinate:
/// inherit an adjacent chest's owner (double-chest), else honor a
/// pending lock request, else register open.
async fn lock_chest(coord: Coordinate, session: &Session, ctx: &ServerContext) -> Result<()> {
    if let Some((_, adjacent_lock)) = ctx.chests.adjacent(coord).await {
        if adjacent_lock.is_locked() {
            let owner = adjacent_lock.owner.clone().unwrap_or_default();
            return ctx
                .chests
                .give_lock(coord, &owner, adjacent_lock.display_name.clone())
                .await
                .map_err(log_persistence_error);
        }
    }

    match session.take_chest_lock_request() {
        Some(ChestLockRequest::Lock) => {
            let player = session.name().unwrap_or_default();
            ctx.chests.give_lock(coord, &player, None).await.map_err(log_persistence_error)
        }
        _ => ctx.chests.add_open(coord).await.map_err(log_persistence_error),
    }
}

fn log_persistence_error(err: crate::error::TunnelError) -> crate::error::TunnelError {
    tracing::warn!(%err, "chest registry persistence failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};
    use crate::registries::{InMemoryBotRegistry, JsonFileChestRegistry};
    use crate::transport::Aes128Cfb8EncryptionContext;
    use std::sync::Arc;

    fn ctx(chests: Arc<JsonFileChestRegistry>) -> ServerContext {
        ServerContext::new(
            crate::config::TunnelConfig::default(),
            chests,
            Arc::new(InMemoryBotRegistry::new()),
            Arc::new(crate::collaborators::StubAuthenticator::permissive()),
            Arc::new(crate::collaborators::OpenPermissionConfig),
            Arc::new(crate::collaborators::NullCommandProcessor),
            Arc::new(crate::collaborators::NullEventHost),
            Arc::new(crate::collaborators::EnglishTranslator),
        )
    }

    fn session() -> Session {
        let session = Session::new(
            Box::new(Aes128Cfb8EncryptionContext::new()),
            Box::new(Aes128Cfb8EncryptionContext::new()),
        );
        session.set_name("Alice");
        session
    }

    async fn block_change_packet(x: i32, y: i8, z: i32, block_type: i8) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_i32(x).await.unwrap();
        writer.write_i8(y).await.unwrap();
        writer.write_i32(z).await.unwrap();
        writer.write_i8(block_type).await.unwrap();
        writer.write_i8(0).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn confirmed_chest_placement_registers_as_open_with_no_pending_lock() {
        let chests = Arc::new(JsonFileChestRegistry::in_memory());
        let ctx = ctx(chests.clone());
        let session = session();
        let coord = Coordinate::new(1, 64, 1);
        *session.pending_chest.lock().unwrap() = Some(coord);

        let mut reader = reader_over(block_change_packet(1, 64, 1, CHEST_BLOCK_ID).await);
        let (mut writer, _out) = vec_writer();
        handle_block_change(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        let lock = chests.get(coord).await.unwrap();
        assert!(!lock.is_locked());
        assert!(session.pending_chest.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn double_chest_inherits_the_adjacent_owner() {
        let chests = Arc::new(JsonFileChestRegistry::in_memory());
        let owned = Coordinate::new(0, 64, 0);
        chests.give_lock(owned, "Bob", Some("Bob's Chest".into())).await.unwrap();
        let ctx = ctx(chests.clone());
        let session = session();
        let coord = Coordinate::new(1, 64, 0);
        *session.pending_chest.lock().unwrap() = Some(coord);

        let mut reader = reader_over(block_change_packet(1, 64, 0, CHEST_BLOCK_ID).await);
        let (mut writer, _out) = vec_writer();
        handle_block_change(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        let lock = chests.get(coord).await.unwrap();
        assert_eq!(lock.owner.as_deref(), Some("Bob"));
    }

    async fn open_window_packet(window_id: i8, inventory_type: i8, title: &str, slots: i8) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_i8(window_id).await.unwrap();
        writer.write_i8(inventory_type).await.unwrap();
        writer.write_utf16(title).await.unwrap();
        writer.write_i8(slots).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn opening_a_chest_locked_by_another_player_is_denied_with_close_window() {
        let chests = Arc::new(JsonFileChestRegistry::in_memory());
        let coord = Coordinate::new(5, 64, 5);
        chests.give_lock(coord, "Mallory", None).await.unwrap();
        let ctx = ctx(chests);
        let session = session();
        *session.last_used_block.lock().unwrap() = Some(coord);

        let mut reader = reader_over(open_window_packet(1, CHEST_INVENTORY_TYPE, "Chest", 27).await);
        let (mut writer, out) = vec_writer();
        handle_open_window(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::CLOSE_WINDOW);
        assert_eq!(replay.read_i8().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn opening_an_unlocked_chest_with_a_pending_lock_request_locks_it() {
        let chests = Arc::new(JsonFileChestRegistry::in_memory());
        let coord = Coordinate::new(5, 64, 5);
        chests.add_open(coord).await.unwrap();
        let ctx = ctx(chests.clone());
        let session = session();
        *session.last_used_block.lock().unwrap() = Some(coord);
        session.request_chest_lock(ChestLockRequest::Lock);

        let mut reader = reader_over(open_window_packet(1, CHEST_INVENTORY_TYPE, "Chest", 27).await);
        let (mut writer, out) = vec_writer();
        handle_open_window(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        assert!(chests.get(coord).await.unwrap().is_locked());
        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::OPEN_WINDOW);
        replay.skip(2).await.unwrap();
        assert_eq!(replay.read_utf16().await.unwrap(), "Chest (locked)");
    }
}
