//! `0xFD`/`0xFC`: the encryption key-exchange handshake. The actual
//! RSA/session-server primitives are opaque byte operations per
//! [`crate::transport::EncryptionContext`]; what this hook drives for
//! real is deciding *when* the shared key is installed and arming the
//! session so both tunnel workers swap to the encrypted stream at the
//! same logical point in the byte stream (see [`crate::tunnel`]).

use crate::context::ServerContext;
use crate::error::{Result, TunnelError};
use crate::io::{PacketReader, PacketWriter};
use crate::protocol::{opcode, Direction};
use crate::session::Session;
use std::sync::atomic::Ordering;

async fn read_len_prefixed(reader: &mut PacketReader) -> Result<Vec<u8>> {
    let len = reader.read_i16().await?.max(0) as usize;
    let mut bytes = Vec::with_capacity(len);
    for _ in 0..len {
        bytes.push(reader.read_u8().await?);
    }
    Ok(bytes)
}

async fn write_len_prefixed(writer: &mut PacketWriter, bytes: &[u8]) -> Result<()> {
    writer.write_i16(bytes.len() as i16).await?;
    writer.write_bytes(bytes).await?;
    Ok(())
}

pub async fn handle_request(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let server_id = reader.read_utf16().await?;
    let public_key = read_len_prefixed(reader).await?;
    let challenge_token = read_len_prefixed(reader).await?;

    if direction != Direction::ServerToClient {
        writer.write_u8(opcode::ENCRYPTION_REQUEST).await?;
        writer.write_utf16(&server_id).await?;
        write_len_prefixed(writer, &public_key).await?;
        write_len_prefixed(writer, &challenge_token).await?;
        return Ok(());
    }

    {
        let mut server_ctx = session.server_encryption.lock().unwrap();
        server_ctx.set_public_key(public_key.clone());
        server_ctx.set_challenge_token(challenge_token.clone());
    }
    {
        let mut client_ctx = session.client_encryption.lock().unwrap();
        client_ctx.set_public_key(public_key.clone());
        client_ctx.set_challenge_token(challenge_token.clone());
    }

    let reflected_server_id = if ctx.config.use_cust_auth { server_id } else { "-".to_string() };

    writer.write_u8(opcode::ENCRYPTION_REQUEST).await?;
    writer.write_utf16(&reflected_server_id).await?;
    write_len_prefixed(writer, &public_key).await?;
    write_len_prefixed(writer, &challenge_token).await?;

    tracing::debug!(player = ?session.name(), "encryption request: public key and challenge token installed");
    Ok(())
}

pub async fn handle_response(
    direction: Direction,
    reader: &mut PacketReader,
    writer: &mut PacketWriter,
    session: &Session,
    ctx: &ServerContext,
) -> Result<()> {
    let shared_key = read_len_prefixed(reader).await?;
    let challenge_response = read_len_prefixed(reader).await?;

    if direction != Direction::ClientToServer {
        writer.write_u8(opcode::ENCRYPTION_RESPONSE).await?;
        write_len_prefixed(writer, &shared_key).await?;
        write_len_prefixed(writer, &challenge_response).await?;
        return Ok(());
    }

    let client_ok = session.client_encryption.lock().unwrap().check_challenge_token(&challenge_response);
    if !client_ok {
        session.kick("Invalid client response".to_string());
        return Err(TunnelError::AuthFailure("invalid client challenge response".to_string()));
    }

    session.client_encryption.lock().unwrap().set_encrypted_shared_key(shared_key.clone());
    session.server_encryption.lock().unwrap().set_encrypted_shared_key(shared_key.clone());

    if let Some(player) = session.name() {
        if let Err(reason) = ctx.authenticator.online_authenticate(&player).await {
            session.kick(reason.clone());
            return Err(TunnelError::AuthFailure(reason));
        }
    }

    let server_challenge_response = session.server_encryption.lock().unwrap().encrypt_challenge_token();

    writer.write_u8(opcode::ENCRYPTION_RESPONSE).await?;
    write_len_prefixed(writer, &shared_key).await?;
    write_len_prefixed(writer, &server_challenge_response).await?;

    session.encryption_armed.store(true, Ordering::SeqCst);
    tracing::info!(player = ?session.name(), "encryption response verified: shared key installed, arming cipher swap");
    Ok(())
}
