//! Debug-dump tee: a decorator, not an inheritance, on the typed I/O
//! layer. When `EXPENSIVE_DEBUG_LOGGING` is set, every byte read or
//! written by a tunnel is additionally appended to a side file so a
//! session can be replayed offline.

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A best-effort append-only byte sink used to tee raw protocol traffic.
/// Write failures are logged and otherwise ignored: losing a debug dump
/// must never affect the tunnel itself.
pub struct DumpFile {
    file: File,
    name: String,
}

impl DumpFile {
    /// Open (creating/truncating) a dump file at `path`.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            file: File::create(path)?,
            name: path.display().to_string(),
        })
    }

    /// Append `bytes` to the dump file.
    pub fn write(&mut self, bytes: &[u8]) {
        if let Err(err) = self.file.write_all(bytes) {
            tracing::warn!("debug dump {} write failed: {err}", self.name);
        }
    }

    /// Record a packet-boundary marker, for dumps where the reader wants
    /// to visually separate one packet's bytes from the next.
    pub fn mark_boundary(&mut self) {
        if let Err(err) = self.file.write_all(b"\n--packet--\n") {
            tracing::warn!("debug dump {} boundary marker failed: {err}", self.name);
        }
    }
}

/// The four dump files enabled by `EXPENSIVE_DEBUG_LOGGING`, named per the
/// direction and stream side they capture.
pub struct DebugDumps {
    /// Bytes read from the server, before any rewriting.
    pub server_input: Option<DumpFile>,
    /// Bytes written to the server.
    pub server_output: Option<DumpFile>,
    /// Bytes read from the player.
    pub player_input: Option<DumpFile>,
    /// Bytes written to the player.
    pub player_output: Option<DumpFile>,
}

impl DebugDumps {
    /// Env var that gates all four dump files.
    pub const ENV_VAR: &'static str = "EXPENSIVE_DEBUG_LOGGING";

    /// Open the dump files if `EXPENSIVE_DEBUG_LOGGING` is set, else a
    /// no-op set of `None`s.
    pub fn from_env() -> Self {
        if std::env::var_os(Self::ENV_VAR).is_none() {
            return Self {
                server_input: None,
                server_output: None,
                player_input: None,
                player_output: None,
            };
        }
        let open = |name: &str| match DumpFile::create(name) {
            Ok(f) => Some(f),
            Err(err) => {
                tracing::warn!("failed to open debug dump {name}: {err}");
                None
            }
        };
        Self {
            server_input: open("ServerStreamInput.debug"),
            server_output: open("ServerStreamOutput.debug"),
            player_input: open("PlayerStreamInput.debug"),
            player_output: open("PlayerStreamOutput.debug"),
        }
    }
}
