//! Reference acceptor binary.
//!
//! Accepts one client connection at a time, dials the configured
//! upstream server, and spawns the two `Tunnel` workers plus the idle
//! watchdog for that player. Not a policy surface: every interesting
//! decision lives in `tunnelmc::policy`; this binary only exists so the
//! crate is runnable end-to-end (see SPEC_FULL.md §6).

use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tunnelmc::config::TunnelConfig;
use tunnelmc::context::ServerContext;
use tunnelmc::io::{PacketReader, PacketWriter};
use tunnelmc::logger;
use tunnelmc::protocol::Direction;
use tunnelmc::session::Session;
use tunnelmc::transport::Aes128Cfb8EncryptionContext;
use tunnelmc::tunnel::{self, Tunnel};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:25565";
const DEFAULT_UPSTREAM_ADDR: &str = "127.0.0.1:25566";
const PROPERTIES_PATH: &str = "server.properties";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    logger::init();

    let listen_addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let upstream_addr = std::env::args().nth(2).unwrap_or_else(|| DEFAULT_UPSTREAM_ADDR.to_string());
    let config = TunnelConfig::from_properties_file_or_default(PROPERTIES_PATH).unwrap_or_default();
    let ctx = Arc::new(ServerContext::with_defaults(config));

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(%listen_addr, %upstream_addr, "tunnel-pair listening");

    loop {
        let (client, peer) = listener.accept().await?;
        let ctx = ctx.clone();
        let upstream_addr = upstream_addr.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(client, peer.ip(), &upstream_addr, ctx).await {
                tracing::warn!(%peer, %err, "connection ended with an error");
            }
        });
    }
}

async fn handle_connection(
    client: TcpStream,
    peer_ip: std::net::IpAddr,
    upstream_addr: &str,
    ctx: Arc<ServerContext>,
) -> std::io::Result<()> {
    let server = TcpStream::connect(upstream_addr).await?;
    let idle_timeout = ctx.config.idle_timeout;

    let (client_read, client_write) = client.into_split();
    let (server_read, server_write) = server.into_split();

    let dumps = tunnelmc::config::TunnelConfig::debug_dumps_requested()
        .then(tunnelmc::io::tee::DebugDumps::from_env);
    let (server_input_dump, server_output_dump, player_input_dump, player_output_dump) = match dumps {
        Some(d) => (d.server_input, d.server_output, d.player_input, d.player_output),
        None => (None, None, None, None),
    };

    let session = Arc::new(Session::with_peer_ip(
        Box::new(Aes128Cfb8EncryptionContext::new()),
        Box::new(Aes128Cfb8EncryptionContext::new()),
        Some(peer_ip),
    ));

    let server_to_client = Tunnel::new(
        Direction::ServerToClient,
        PacketReader::new(Box::new(server_read), server_input_dump),
        PacketWriter::new(Box::new(client_write), player_output_dump),
        session.clone(),
        ctx.clone(),
    );
    let client_to_server = Tunnel::new(
        Direction::ClientToServer,
        PacketReader::new(Box::new(client_read), player_input_dump),
        PacketWriter::new(Box::new(server_write), server_output_dump),
        session.clone(),
        ctx.clone(),
    );

    let watchdog = tokio::spawn(tunnel::watch_idle(session.clone(), idle_timeout));
    tunnel::run_pair(server_to_client, client_to_server).await;
    watchdog.abort();

    tracing::info!(player = ?session.name(), "connection closed");
    Ok(())
}
