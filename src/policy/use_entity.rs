//! `0x07` Use-entity: the god-mode shield. A packet targeting a
//! god-mode player is consumed (including its trailing boolean) and
//! dropped rather than forwarded.

use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
) -> Result<()> {
    let user_entity_id = reader.read_i32().await?;
    let target_entity_id = reader.read_i32().await?;
    let is_attack = reader.read_bool().await?;

    // Only client→server carries a use-entity packet; the shield is a
    // permission-style decision made by whatever tracks god mode, which
    // the session's tunnel doesn't own directly, so this hook asks
    // through the session's own god-mode flag as a stand-in for a full
    // entity registry (see DESIGN.md).
    let _ = direction;
    if session.god_mode.load(std::sync::atomic::Ordering::Relaxed) && target_entity_id == *session.entity_id.lock().unwrap() {
        tracing::debug!(user_entity_id, target_entity_id, "use-entity dropped: target has god mode");
        return Ok(());
    }

    writer.write_u8(opcode::USE_ENTITY).await?;
    writer.write_i32(user_entity_id).await?;
    writer.write_i32(target_entity_id).await?;
    writer.write_bool(is_attack).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};
    use crate::transport::Aes128Cfb8EncryptionContext;

    fn session() -> Session {
        Session::new(
            Box::new(Aes128Cfb8EncryptionContext::new()),
            Box::new(Aes128Cfb8EncryptionContext::new()),
        )
    }

    async fn packet(user: i32, target: i32, attack: bool) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_i32(user).await.unwrap();
        writer.write_i32(target).await.unwrap();
        writer.write_bool(attack).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn god_mode_target_drops_the_packet_and_consumes_the_boolean() {
        let session = session();
        *session.entity_id.lock().unwrap() = 7;
        session.god_mode.store(true, std::sync::atomic::Ordering::SeqCst);
        let mut reader = reader_over(packet(1, 7, true).await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session)
            .await
            .unwrap();
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ordinary_target_is_forwarded_untouched() {
        let session = session();
        *session.entity_id.lock().unwrap() = 7;
        let input = packet(1, 9, true).await;
        let mut reader = reader_over(input.clone());
        let (mut writer, out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session)
            .await
            .unwrap();
        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::USE_ENTITY);
        assert_eq!(replay.read_i32().await.unwrap(), 1);
        assert_eq!(replay.read_i32().await.unwrap(), 9);
        assert!(replay.read_bool().await.unwrap());
    }
}
