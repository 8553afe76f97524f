//! `0x14` Named-entity-spawn: suppressed entirely when the name belongs
//! to a registered bot, otherwise forwarded including the trailing
//! metadata blob.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{MetadataBlob, PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    _session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let entity_id = reader.read_i32().await?;
    let name = reader.read_utf16().await?;
    let x = reader.read_i32().await?;
    let y = reader.read_i32().await?;
    let z = reader.read_i32().await?;
    let rotation = reader.read_i8().await?;
    let pitch = reader.read_i8().await?;
    let current_item = reader.read_i16().await?;
    let metadata = MetadataBlob::read(reader).await?;

    let _ = direction;
    if ctx.bots.is_bot(&name).await {
        tracing::debug!(%name, entity_id, "named-entity-spawn suppressed: known bot");
        return Ok(());
    }

    writer.write_u8(opcode::NAMED_ENTITY_SPAWN).await?;
    writer.write_i32(entity_id).await?;
    writer.write_utf16(&name).await?;
    writer.write_i32(x).await?;
    writer.write_i32(y).await?;
    writer.write_i32(z).await?;
    writer.write_i8(rotation).await?;
    writer.write_i8(pitch).await?;
    writer.write_i16(current_item).await?;
    metadata.write(writer).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};
    use crate::registries::{InMemoryBotRegistry, JsonFileChestRegistry};
    use std::sync::Arc;

    fn ctx() -> ServerContext {
        ServerContext::new(
            crate::config::TunnelConfig::default(),
            Arc::new(JsonFileChestRegistry::in_memory()),
            Arc::new(InMemoryBotRegistry::with_names(["Steve_Bot".to_string()])),
            Arc::new(crate::collaborators::StubAuthenticator::permissive()),
            Arc::new(crate::collaborators::OpenPermissionConfig),
            Arc::new(crate::collaborators::NullCommandProcessor),
            Arc::new(crate::collaborators::NullEventHost),
            Arc::new(crate::collaborators::EnglishTranslator),
        )
    }

    fn session() -> Session {
        Session::new(
            Box::new(crate::transport::Aes128Cfb8EncryptionContext::new()),
            Box::new(crate::transport::Aes128Cfb8EncryptionContext::new()),
        )
    }

    async fn spawn_packet(name: &str) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_i32(99).await.unwrap();
        writer.write_utf16(name).await.unwrap();
        writer.write_i32(1).await.unwrap();
        writer.write_i32(2).await.unwrap();
        writer.write_i32(3).await.unwrap();
        writer.write_i8(0).await.unwrap();
        writer.write_i8(0).await.unwrap();
        writer.write_i16(0).await.unwrap();
        MetadataBlob::default().write(&mut writer).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn bot_spawn_is_suppressed() {
        let ctx = ctx();
        let session = session();
        let mut reader = reader_over(spawn_packet("Steve_Bot").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn real_player_spawn_is_forwarded() {
        let ctx = ctx();
        let session = session();
        let mut reader = reader_over(spawn_packet("Alice").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();
        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::NAMED_ENTITY_SPAWN);
        assert_eq!(replay.read_i32().await.unwrap(), 99);
        assert_eq!(replay.read_utf16().await.unwrap(), "Alice");
    }
}
