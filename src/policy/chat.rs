//! `0x03` Chat: system join/leave notification filtering, mute
//! enforcement, command interception, loopback suppression, and long
//! message wrapping.

use crate::context::ServerContext;
use crate::error::Result;
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;
use regex::Regex;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

/// Outgoing chat lines longer than this many UTF-16 code units are
/// split across multiple `0x03` packets.
const LINE_WRAP_LIMIT: usize = 119;

fn join_leave_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?P<name>\S+) (?P<verb>joined|left) the game$").unwrap())
}

pub async fn handle(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let text = reader.read_utf16().await?;
    match direction {
        Direction::ServerToClient => handle_server_to_client(writer, session, ctx, text).await,
        Direction::ClientToServer => handle_client_to_server(writer, session, ctx, text).await,
    }
}

async fn handle_server_to_client(
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
    text: String,
) -> Result<()> {
    if let Some(captures) = join_leave_pattern().captures(&text) {
        let name = captures["name"].to_string();
        let joined = &captures["verb"] == "joined";

        if ctx.bots.is_bot(&name).await {
            return Ok(());
        }

        if joined {
            ctx.events.player_joined(&name).await;
        } else {
            ctx.events.player_left(&name).await;
        }

        if !ctx.config.enable_events {
            return forward_chat_text(writer, &text).await;
        }

        let key = if joined { "player.joined" } else { "player.left" };
        let localized = ctx.notice(key, &[&name]);
        return forward_chat_text(writer, &localized).await;
    }

    if session.last_forwarded_chat() == Some(text.clone()) {
        session.clear_last_forwarded_chat();
        return Ok(());
    }

    if !ctx.config.chat_console_to_ops
        && text.starts_with("[Server]")
        && *session.permission_group.lock().unwrap() != "op"
    {
        return Ok(());
    }

    if ctx.config.msg_wrap && text.encode_utf16().count() > LINE_WRAP_LIMIT {
        for line in wrap(&text, LINE_WRAP_LIMIT) {
            forward_chat_text(writer, &line).await?;
        }
        return Ok(());
    }

    forward_chat_text(writer, &text).await
}

async fn handle_client_to_server(
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
    text: String,
) -> Result<()> {
    let prefix = ctx.config.command_prefix.as_char();
    let is_command = text.starts_with(prefix);

    if session.muted.load(Ordering::Relaxed) && !is_command {
        let notice = ctx.notice("chat.muted", &[]);
        session.enqueue_inbound_chat(notice);
        tracing::debug!(player = ?session.name(), "chat dropped: player is muted");
        return Ok(());
    }

    if is_command {
        let player = session.name().unwrap_or_default();
        match ctx.commands.execute(&player, &text).await {
            None => return Ok(()),
            Some(crate::collaborators::CommandOutcome::Handled) => return Ok(()),
            Some(crate::collaborators::CommandOutcome::Rewritten(rewritten)) => {
                if !ctx.config.forward_chat {
                    return Ok(());
                }
                session.remember_forwarded_chat(rewritten.clone());
                return forward_chat_text(writer, &rewritten).await;
            }
        }
    }

    if !ctx.config.forward_chat {
        return Ok(());
    }

    session.remember_forwarded_chat(text.clone());
    forward_chat_text(writer, &text).await
}

async fn forward_chat_text(writer: &mut PacketWriter, text: &str) -> Result<()> {
    writer.write_u8(opcode::CHAT).await?;
    writer.write_utf16(text).await
}

fn wrap(text: &str, limit: usize) -> Vec<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    units
        .chunks(limit)
        .map(|chunk| String::from_utf16_lossy(chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{reader_over, vec_writer};
    use crate::registries::{InMemoryBotRegistry, JsonFileChestRegistry};
    use crate::transport::Aes128Cfb8EncryptionContext;
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
            Box::new(Aes128Cfb8EncryptionContext::new()),
            Box::new(Aes128Cfb8EncryptionContext::new()),
        )
    }

    async fn chat_packet(text: &str) -> Vec<u8> {
        let (mut writer, buf) = vec_writer();
        writer.write_utf16(text).await.unwrap();
        buf.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn muted_player_chat_is_dropped_with_a_notice() {
        let session = session();
        session.muted.store(true, Ordering::SeqCst);
        let ctx = ctx();
        let mut reader = reader_over(chat_packet("hello").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        assert!(out.lock().unwrap().is_empty());
        assert_eq!(session.drain_inbound_chat().len(), 1);
    }

    #[tokio::test]
    async fn muted_player_commands_still_pass_through_to_the_processor() {
        let session = session();
        session.muted.store(true, Ordering::SeqCst);
        let ctx = ctx();
        let mut reader = reader_over(chat_packet("/help").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ClientToServer, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();
        assert!(out.lock().unwrap().is_empty());
        assert!(session.drain_inbound_chat().is_empty());
    }

    #[tokio::test]
    async fn bot_join_notifications_are_suppressed() {
        let session = session();
        let ctx = ctx();
        let mut reader = reader_over(chat_packet("Steve_Bot joined the game").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn real_player_join_is_localized_and_forwarded() {
        let session = session();
        let ctx = ctx();
        let mut reader = reader_over(chat_packet("Alice joined the game").await);
        let (mut writer, out) = vec_writer();
        handle(Direction::ServerToClient, &mut reader, &mut writer, &session, &ctx)
            .await
            .unwrap();

        let mut replay = reader_over(out.lock().unwrap().clone());
        assert_eq!(replay.read_u8().await.unwrap(), opcode::CHAT);
        assert_eq!(replay.read_utf16().await.unwrap(), "Alice joined the game");
    }
}
