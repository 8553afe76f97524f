//! `AsyncRead`/`AsyncWrite` decorators that apply a [`Cfb8`] keystream to
//! an already-open stream. Installing one of these over a boxed raw
//! stream is what lets the encryption upgrade happen mid-session,
//! without tearing down the connection or losing whatever the typed
//! reader/writer had already buffered in front of it.

use super::cipher::Cfb8;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{self, AsyncRead, AsyncWrite, ReadBuf};

/// Decrypts every byte read from `inner` as it arrives.
pub struct Aes128Cfb8Reader {
    inner: Box<dyn AsyncRead + Unpin + Send>,
    cipher: Cfb8,
}

impl Aes128Cfb8Reader {
    /// Wrap `inner`, decrypting with `cipher` from this point forward.
    pub fn new(inner: Box<dyn AsyncRead + Unpin + Send>, cipher: Cfb8) -> Self {
        Self { inner, cipher }
    }
}

impl AsyncRead for Aes128Cfb8Reader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut me.inner).poll_read(cx, buf);
        if poll.is_ready() {
            me.cipher.decrypt(&mut buf.filled_mut()[before..]);
        }
        poll
    }
}

/// Encrypts every byte before it reaches `inner`. Writes are accepted
/// (encrypted and queued) immediately; the actual bytes reach `inner`
/// on the next `poll_flush`, matching how a buffered writer behaves.
/// Accepting out of step with transmission is safe here because the
/// keystream only depends on the order bytes are encrypted in, not on
/// when they are actually sent.
pub struct Aes128Cfb8Writer {
    inner: Box<dyn AsyncWrite + Unpin + Send>,
    cipher: Cfb8,
    pending: Vec<u8>,
    sent: usize,
}

impl Aes128Cfb8Writer {
    /// Wrap `inner`, encrypting with `cipher` from this point forward.
    pub fn new(inner: Box<dyn AsyncWrite + Unpin + Send>, cipher: Cfb8) -> Self {
        Self { inner, cipher, pending: Vec::new(), sent: 0 }
    }

    fn drain_pending(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.sent < self.pending.len() {
            match Pin::new(&mut self.inner).poll_write(cx, &self.pending[self.sent..]) {
                Poll::Ready(Ok(0)) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "encrypted writer: underlying stream accepted zero bytes",
                    )));
                }
                Poll::Ready(Ok(n)) => self.sent += n,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        self.pending.clear();
        self.sent = 0;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for Aes128Cfb8Writer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let me = self.get_mut();
        let start = me.pending.len();
        me.pending.extend_from_slice(buf);
        me.cipher.encrypt(&mut me.pending[start..]);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        match me.drain_pending(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut me.inner).poll_flush(cx),
            other => other,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        match me.drain_pending(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut me.inner).poll_shutdown(cx),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn writer_then_reader_roundtrips_plaintext() {
        let key = [9u8; 16];
        let (client, server) = tokio::io::duplex(256);
        let (server_read, server_write) = tokio::io::split(server);

        let mut writer = Aes128Cfb8Writer::new(Box::new(server_write), Cfb8::new(&key, &key));
        writer.write_all(b"hello tunnel").await.unwrap();
        writer.flush().await.unwrap();
        drop(writer);

        let mut reader = Aes128Cfb8Reader::new(Box::new(server_read), Cfb8::new(&key, &key));
        let mut out = vec![0u8; 12];
        let (mut client_read, _client_write) = tokio::io::split(client);
        let mut raw = Vec::new();
        client_read.read_to_end(&mut raw).await.unwrap();
        assert_ne!(raw, b"hello tunnel");

        let mut replay = Aes128Cfb8Reader::new(Box::new(std::io::Cursor::new(raw)), Cfb8::new(&key, &key));
        replay.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"hello tunnel");
        let _ = &mut reader;
    }

    #[tokio::test]
    async fn partial_reads_stay_in_sync() {
        let key = [5u8; 16];
        let mut enc = Cfb8::new(&key, &key);
        let plaintext: Vec<u8> = (0u8..40).collect();
        let mut ciphertext = plaintext.clone();
        enc.encrypt(&mut ciphertext);

        let mut reader = Aes128Cfb8Reader::new(Box::new(std::io::Cursor::new(ciphertext)), Cfb8::new(&key, &key));
        let mut first = [0u8; 7];
        let mut rest = [0u8; 33];
        reader.read_exact(&mut first).await.unwrap();
        reader.read_exact(&mut rest).await.unwrap();
        let mut joined = first.to_vec();
        joined.extend_from_slice(&rest);
        assert_eq!(joined, plaintext);
    }
}
