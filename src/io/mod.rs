//! Typed I/O layer.
//!
//! Fixed-width big-endian primitives, length-prefixed UTF-16 strings,
//! variable-length integers, and raw byte spans over an indirected
//! async stream. The indirection (`Box<dyn AsyncRead/AsyncWrite>`) is what
//! lets the transport upgrade (see [`crate::transport`]) swap the
//! underlying stream for an encrypted one mid-session without losing
//! buffered bytes: the swap happens on the raw stream held here, not on a
//! read-ahead buffer, so the next call into `PacketReader` after the swap
//! sees the first plaintext byte of the new cipher.
//!
//! Every `write_*` returns the value it was given so callers can fold
//! "parse, remember, forward" into one expression, matching the idiom the
//! rest of the grammar leans on.

pub mod item;
pub mod metadata;
pub mod tee;

use crate::error::{Result, TunnelError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub use item::Item;
pub use metadata::{MetadataBlob, MetadataEntry, MetadataValue};

/// Shared test scaffolding for submodules that need an in-memory writer.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncWrite;

    /// An `AsyncWrite` that appends to a shared, inspectable `Vec<u8>`.
    pub struct VecWriter(pub Arc<Mutex<Vec<u8>>>);

    impl AsyncWrite for VecWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            std::task::Poll::Ready(Ok(buf.len()))
        }
        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }
        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    /// Build a fresh `PacketWriter` plus a handle to its backing buffer.
    pub fn vec_writer() -> (super::PacketWriter, Arc<Mutex<Vec<u8>>>) {
        let shared = Arc::new(Mutex::new(Vec::new()));
        (
            super::PacketWriter::new(Box::new(VecWriter(shared.clone())), None),
            shared,
        )
    }

    /// Build a `PacketReader` over the given bytes.
    pub fn reader_over(bytes: Vec<u8>) -> super::PacketReader {
        super::PacketReader::new(Box::new(std::io::Cursor::new(bytes)), None)
    }
}

/// Size of the scratch buffer used by [`copy`] to mirror opaque byte spans
/// (chunk payloads, NBT blobs, etc.) from the reader to the writer without
/// interpreting them.
pub const SCRATCH_SIZE: usize = 1024;

/// A typed reader over an indirected async stream.
///
/// The stream is boxed so the transport upgrade can swap it for an
/// encrypted stream in place (see [`PacketReader::replace_inner`]).
pub struct PacketReader {
    inner: Box<dyn AsyncRead + Unpin + Send>,
    dump: Option<tee::DumpFile>,
}

/// A typed writer over an indirected async stream.
pub struct PacketWriter {
    inner: Box<dyn AsyncWrite + Unpin + Send>,
    dump: Option<tee::DumpFile>,
}

impl PacketReader {
    /// Wrap a raw stream, optionally teeing every byte read to `dump`.
    pub fn new(inner: Box<dyn AsyncRead + Unpin + Send>, dump: Option<tee::DumpFile>) -> Self {
        Self { inner, dump }
    }

    /// Swap the underlying stream, preserving the dump file.
    pub fn replace_inner(&mut self, inner: Box<dyn AsyncRead + Unpin + Send>) {
        self.inner = inner;
    }

    /// Rewrap the underlying stream in place, e.g. to install an
    /// encrypted decorator mid-session (see [`crate::transport`]). `f`
    /// receives the current raw stream and returns the new one; nothing
    /// buffered is lost because this reader never looks ahead past the
    /// bytes a field actually needs.
    pub fn map_inner(
        &mut self,
        f: impl FnOnce(Box<dyn AsyncRead + Unpin + Send>) -> Box<dyn AsyncRead + Unpin + Send>,
    ) {
        let placeholder: Box<dyn AsyncRead + Unpin + Send> = Box::new(tokio::io::empty());
        let current = std::mem::replace(&mut self.inner, placeholder);
        self.inner = f(current);
    }

    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(buf)
            .await
            .map_err(TunnelError::Transport)?;
        if let Some(dump) = &mut self.dump {
            dump.write(buf);
        }
        Ok(())
    }

    /// Read a single unsigned byte.
    pub async fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.fill(&mut b).await?;
        Ok(b[0])
    }

    /// Read a signed byte.
    pub async fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8().await? as i8)
    }

    /// Read a big-endian `i16`.
    pub async fn read_i16(&mut self) -> Result<i16> {
        let mut b = [0u8; 2];
        self.fill(&mut b).await?;
        Ok(i16::from_be_bytes(b))
    }

    /// Read a big-endian `i32`.
    pub async fn read_i32(&mut self) -> Result<i32> {
        let mut b = [0u8; 4];
        self.fill(&mut b).await?;
        Ok(i32::from_be_bytes(b))
    }

    /// Read a big-endian `i64`.
    pub async fn read_i64(&mut self) -> Result<i64> {
        let mut b = [0u8; 8];
        self.fill(&mut b).await?;
        Ok(i64::from_be_bytes(b))
    }

    /// Read a big-endian IEEE-754 `f32`.
    pub async fn read_f32(&mut self) -> Result<f32> {
        let mut b = [0u8; 4];
        self.fill(&mut b).await?;
        Ok(f32::from_be_bytes(b))
    }

    /// Read a big-endian IEEE-754 `f64`.
    pub async fn read_f64(&mut self) -> Result<f64> {
        let mut b = [0u8; 8];
        self.fill(&mut b).await?;
        Ok(f64::from_be_bytes(b))
    }

    /// Read a boolean (single non-zero byte).
    pub async fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8().await? != 0)
    }

    /// Read a length-prefixed UTF-16 string. The prefix is an *unsigned*
    /// 16-bit count of code units, not bytes and not code points — values
    /// with the high bit set (32768-65535) are valid lengths, not a sign
    /// to reject. Surrogate pairs are not interpreted, matching the wire
    /// format exactly.
    pub async fn read_utf16(&mut self) -> Result<String> {
        let mut b = [0u8; 2];
        self.fill(&mut b).await?;
        let len = u16::from_be_bytes(b) as usize;
        let mut units = Vec::with_capacity(len);
        for _ in 0..len {
            units.push(self.read_i16().await? as u16);
        }
        Ok(String::from_utf16_lossy(&units))
    }

    /// Read a little-endian base-128 varint. Accepts at least 64 bits of
    /// magnitude and does not bound the encoded width.
    pub async fn read_varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8().await?;
            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(value)
    }

    /// Discard `n` bytes without forwarding them.
    pub async fn skip(&mut self, n: usize) -> Result<()> {
        let mut remaining = n;
        let mut buf = [0u8; SCRATCH_SIZE];
        while remaining > 0 {
            let chunk = remaining.min(SCRATCH_SIZE);
            self.fill(&mut buf[..chunk]).await?;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl PacketWriter {
    /// Wrap a raw stream, optionally teeing every byte written to `dump`.
    pub fn new(inner: Box<dyn AsyncWrite + Unpin + Send>, dump: Option<tee::DumpFile>) -> Self {
        Self { inner, dump }
    }

    /// Swap the underlying stream, preserving the dump file.
    pub fn replace_inner(&mut self, inner: Box<dyn AsyncWrite + Unpin + Send>) {
        self.inner = inner;
    }

    /// Rewrap the underlying stream in place; see [`PacketReader::map_inner`].
    pub fn map_inner(
        &mut self,
        f: impl FnOnce(Box<dyn AsyncWrite + Unpin + Send>) -> Box<dyn AsyncWrite + Unpin + Send>,
    ) {
        let placeholder: Box<dyn AsyncWrite + Unpin + Send> = Box::new(tokio::io::sink());
        let current = std::mem::replace(&mut self.inner, placeholder);
        self.inner = f(current);
    }

    async fn put(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).await.map_err(TunnelError::Transport)?;
        if let Some(dump) = &mut self.dump {
            dump.write(buf);
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await.map_err(TunnelError::Transport)
    }

    /// Write an unsigned byte, returning it.
    pub async fn write_u8(&mut self, value: u8) -> Result<u8> {
        self.put(&[value]).await?;
        Ok(value)
    }

    /// Write a signed byte, returning it.
    pub async fn write_i8(&mut self, value: i8) -> Result<i8> {
        self.write_u8(value as u8).await?;
        Ok(value)
    }

    /// Write a big-endian `i16`, returning it.
    pub async fn write_i16(&mut self, value: i16) -> Result<i16> {
        self.put(&value.to_be_bytes()).await?;
        Ok(value)
    }

    /// Write a big-endian `i32`, returning it.
    pub async fn write_i32(&mut self, value: i32) -> Result<i32> {
        self.put(&value.to_be_bytes()).await?;
        Ok(value)
    }

    /// Write a big-endian `i64`, returning it.
    pub async fn write_i64(&mut self, value: i64) -> Result<i64> {
        self.put(&value.to_be_bytes()).await?;
        Ok(value)
    }

    /// Write a big-endian IEEE-754 `f32`, returning it.
    pub async fn write_f32(&mut self, value: f32) -> Result<f32> {
        self.put(&value.to_be_bytes()).await?;
        Ok(value)
    }

    /// Write a big-endian IEEE-754 `f64`, returning it.
    pub async fn write_f64(&mut self, value: f64) -> Result<f64> {
        self.put(&value.to_be_bytes()).await?;
        Ok(value)
    }

    /// Write a boolean, returning it.
    pub async fn write_bool(&mut self, value: bool) -> Result<bool> {
        self.write_u8(if value { 1 } else { 0 }).await?;
        Ok(value)
    }

    /// Write a length-prefixed UTF-16 string, returning the string back.
    pub async fn write_utf16(&mut self, value: &str) -> Result<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_i16(units.len() as i16).await?;
        for unit in units {
            self.write_i16(unit as i16).await?;
        }
        Ok(())
    }

    /// Write a little-endian base-128 varint.
    pub async fn write_varint(&mut self, mut value: u64) -> Result<()> {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte).await?;
            if value == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Write a raw byte span verbatim.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.put(bytes).await
    }
}

/// Read `n` bytes from `reader` and mirror them to `writer` without
/// interpreting them, using a fixed 1024-byte scratch buffer. Used for
/// chunk payloads, NBT blobs, and other opaque byte spans whose framing
/// is carried by a preceding length field.
pub async fn copy(reader: &mut PacketReader, writer: &mut PacketWriter, n: usize) -> Result<()> {
    let mut scratch = [0u8; SCRATCH_SIZE];
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(SCRATCH_SIZE);
        reader.fill(&mut scratch[..chunk]).await?;
        writer.put(&scratch[..chunk]).await?;
        remaining -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::test_support::{reader_over, vec_writer};
    use super::*;

    #[tokio::test]
    async fn varint_roundtrip_64_bit() {
        let values: [u64; 6] = [0, 1, 127, 128, u32::MAX as u64, u64::MAX];
        for &value in &values {
            let (mut writer, buf) = vec_writer();
            writer.write_varint(value).await.unwrap();
            let bytes = buf.lock().unwrap().clone();
            let mut reader = reader_over(bytes);
            let decoded = reader.read_varint().await.unwrap();
            assert_eq!(value, decoded);
        }
    }

    #[tokio::test]
    async fn utf16_roundtrip_code_unit_length() {
        for s in ["", "hello", "héllo wörld", "日本語"] {
            let (mut writer, buf) = vec_writer();
            writer.write_utf16(s).await.unwrap();
            let bytes = buf.lock().unwrap().clone();
            let mut reader = reader_over(bytes);
            let decoded = reader.read_utf16().await.unwrap();
            assert_eq!(s, decoded);
        }
    }

    #[tokio::test]
    async fn utf16_length_prefix_with_the_high_bit_set_is_not_a_desync() {
        // A length of 32771 (0x8003) has the high bit set, so it reads as
        // negative if the prefix is ever mistaken for a signed `i16`.
        const LEN: usize = 32_771;
        let mut bytes = Vec::with_capacity(2 + LEN * 2);
        bytes.extend_from_slice(&(LEN as u16).to_be_bytes());
        for _ in 0..LEN {
            bytes.extend_from_slice(&[0x00, b'A']);
        }
        let mut reader = reader_over(bytes);
        let decoded = reader.read_utf16().await.unwrap();
        assert_eq!(decoded.len(), LEN);
        assert!(decoded.chars().all(|c| c == 'A'));
    }

    #[tokio::test]
    async fn primitives_roundtrip() {
        let (mut writer, buf) = vec_writer();
        writer.write_i8(-5).await.unwrap();
        writer.write_i16(-1000).await.unwrap();
        writer.write_i32(-100_000).await.unwrap();
        writer.write_i64(-10_000_000_000).await.unwrap();
        writer.write_f32(1.5).await.unwrap();
        writer.write_f64(2.25).await.unwrap();
        writer.write_bool(true).await.unwrap();
        let bytes = buf.lock().unwrap().clone();
        let mut reader = reader_over(bytes);
        assert_eq!(reader.read_i8().await.unwrap(), -5);
        assert_eq!(reader.read_i16().await.unwrap(), -1000);
        assert_eq!(reader.read_i32().await.unwrap(), -100_000);
        assert_eq!(reader.read_i64().await.unwrap(), -10_000_000_000);
        assert_eq!(reader.read_f32().await.unwrap(), 1.5);
        assert_eq!(reader.read_f64().await.unwrap(), 2.25);
        assert!(reader.read_bool().await.unwrap());
    }

    #[tokio::test]
    async fn copy_mirrors_opaque_span() {
        let payload: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let mut reader = reader_over(payload.clone());
        let (mut writer, buf) = vec_writer();
        copy(&mut reader, &mut writer, payload.len()).await.unwrap();
        assert_eq!(*buf.lock().unwrap(), payload);
    }
}
