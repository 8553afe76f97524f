//! `0x02` Handshake: resolves the player's final name (guest flow,
//! pending out-of-band auth request, or the raw name verbatim) and
//! makes it final for the life of the connection.

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
    match direction {
        Direction::ClientToServer => {
            let version = reader.read_i8().await?;
            let raw_name = reader.read_utf16().await?;
            let name = raw_name.split(';').next().unwrap_or("").to_string();

            let final_name = if name == "Player" || !ctx.authenticator.is_minecraft_up() {
                let pending = match session.peer_ip {
                    Some(ip) => ctx.authenticator.get_auth_request(ip).await,
                    None => None,
                };
                match pending {
                    Some(request) => {
                        let resolved = request.name.clone();
                        ctx.authenticator.complete_login(&request, &resolved).await;
                        resolved
                    }
                    None if ctx.authenticator.allow_guest_join() => {
                        session.guest.store(true, Ordering::SeqCst);
                        ctx.authenticator.get_free_guest_name().await
                    }
                    None => {
                        session.kick("Guests are not allowed to join this server".to_string());
                        return Ok(());
                    }
                }
            } else {
                name
            };

            session.set_name(&final_name);
            writer.write_u8(opcode::HANDSHAKE).await?;
            writer.write_i8(version).await?;
            writer.write_utf16(&final_name).await?;

            let trailing_field = reader.read_i8().await?;
            writer.write_i8(trailing_field).await?;
            let trailing_int = reader.read_i32().await?;
            writer.write_i32(trailing_int).await?;

            tracing::info!(name = %final_name, guest = session.guest.load(Ordering::SeqCst), "handshake resolved");
        }
        Direction::ServerToClient => {
            writer.write_u8(opcode::HANDSHAKE).await?;
            let reply = reader.read_utf16().await?;
            writer.write_utf16(&reply).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};
    use crate::registries::{InMemoryBotRegistry, JsonFileChestRegistry};
    use crate::transport::Aes128Cfb8EncryptionContext;
    use std::sync::Arc;

    fn ctx_no_guests() -> ServerContext {
        ServerContext::new(
            crate::config::TunnelConfig::default(),
            Arc::new(JsonFileChestRegistry::in_memory()),
            Arc::new(InMemoryBotRegistry::new()),
            Arc::new(crate::collaborators::StubAuthenticator::no_guests()),
            Arc::new(crate::collaborators::OpenPermissionConfig),
            Arc::new(crate::collaborators::NullCommandProcessor),
            Arc::new(crate::collaborators::NullEventHost),
            Arc::new(crate::collaborators::EnglishTranslator),
        )
    }

    fn ctx_permissive() -> ServerContext {
        ServerContext::new(
            crate::config::TunnelConfig::default(),
            Arc::new(JsonFileChestRegistry::in_memory()),
            Arc::new(InMemoryBotRegistry::new()),
            Arc::new(crate::collaborators::StubAuthenticator::permissive()),
            Arc::new(crate::collaborators::OpenPermissionConfig),
            Arc::new(crate::collaborators::NullCommandProcessor),
            Arc::new(crate::collaborators::NullEventHost),
            Arc::new(crate::collaborators::EnglishTranslator),
        )
    }

    fn session() -> Session {
        Session::new(
            Box::new(Aes128Cfb8EncryptionContext::new()),
            Box::new(Aes128Cfb8EncryptionContext::new()),
        )
    }

    async fn handshake_packet(name: &str) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_i8(14).await.unwrap();
        writer.write_utf16(name).await.unwrap();
        writer.write_i8(0).await.unwrap();
        writer.write_i32(0).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn literal_player_name_is_assigned_a_guest_identity() {
        let session = session();
        let ctx = ctx_permissive();
        let mut reader = reader_over(handshake_packet("Player").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        assert_eq!(session.name().as_deref(), Some("Guest1"));
        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::HANDSHAKE);
        assert_eq!(replay.read_i8().await.unwrap(), 14);
        assert_eq!(replay.read_utf16().await.unwrap(), "Guest1");
    }

    #[tokio::test]
    async fn guest_disallowed_kicks_instead_of_assigning_a_name() {
        let session = session();
        let ctx = ctx_no_guests();
        let mut reader = reader_over(handshake_packet("Player").await);
        let (mut writer, _out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        assert!(session.kick_reason().is_some());
        assert_eq!(session.name(), None);
    }

    #[tokio::test]
    async fn real_name_strips_a_trailing_semicolon_suffix() {
        let session = session();
        let ctx = ctx_permissive();
        let mut reader = reader_over(handshake_packet("Steve;extra").await);
        let (mut writer, _out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();
        assert_eq!(session.name().as_deref(), Some("Steve"));
    }
}
