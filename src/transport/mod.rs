//! The encryption upgrade: everything from the 0xFD/0xFC handshake
//! exchange (kept as opaque byte operations, since real RSA and the
//! Mojang session-server handshake are out of scope here) down to the
//! AES-128/CFB-8 stream cipher that is actually installed on the wire
//! (in scope, and fully implemented).

pub mod cipher;
pub mod stream;

pub use cipher::Cfb8;
pub use stream::{Aes128Cfb8Reader, Aes128Cfb8Writer};

use tokio::io::{AsyncRead, AsyncWrite};

/// Per-player encryption state machine driven by the 0xFD/0xFD
/// handshake policy hook. The public-key/challenge-token/shared-key
/// operations are intentionally opaque byte buffers: a production
/// implementation would back them with real RSA, but that primitive
/// itself is out of scope here. What *is* in scope, and real, is the
/// AES-128/CFB-8 stream installed once the shared key is known.
pub trait EncryptionContext: Send + Sync {
    /// Install the server's RSA public key (DER-encoded, opaque here).
    fn set_public_key(&mut self, key: Vec<u8>);

    /// The previously installed public key, if any.
    fn get_public_key(&self) -> Option<&[u8]>;

    /// Install the random challenge token sent in the encryption
    /// request, to be echoed back (RSA-wrapped) by the client.
    fn set_challenge_token(&mut self, token: Vec<u8>);

    /// Whether `candidate` matches the installed challenge token. A
    /// real implementation RSA-decrypts `candidate` first; since RSA
    /// is out of scope here this compares the opaque bytes directly,
    /// which is exactly what a loopback reference implementation
    /// (client and server sharing this same opaque representation)
    /// needs to exercise the handshake end to end.
    fn check_challenge_token(&self, candidate: &[u8]) -> bool;

    /// Produce the (would-be RSA-encrypted) challenge token to send.
    fn encrypt_challenge_token(&self) -> Vec<u8>;

    /// Install the shared secret once the encryption response decodes.
    fn set_encrypted_shared_key(&mut self, key: Vec<u8>);

    /// The installed shared secret, if any.
    fn get_encrypted_shared_key(&self) -> Option<&[u8]>;

    /// Wrap `raw` so every byte read from it is decrypted with the
    /// installed shared key. Panics if no shared key is installed yet.
    fn encrypted_input_stream(
        &self,
        raw: Box<dyn AsyncRead + Unpin + Send>,
    ) -> Box<dyn AsyncRead + Unpin + Send>;

    /// Wrap `raw` so every byte written to it is encrypted with the
    /// installed shared key. Panics if no shared key is installed yet.
    fn encrypted_output_stream(
        &self,
        raw: Box<dyn AsyncWrite + Unpin + Send>,
    ) -> Box<dyn AsyncWrite + Unpin + Send>;
}

/// Reference `EncryptionContext`: stores the handshake byte buffers
/// verbatim and derives the AES-128/CFB-8 key/IV from the first 16
/// bytes of whatever was installed as the shared key (padded with
/// zeroes if shorter), matching this protocol family's convention of
/// reusing the shared secret as both key and IV.
#[derive(Debug, Default)]
pub struct Aes128Cfb8EncryptionContext {
    public_key: Option<Vec<u8>>,
    challenge_token: Option<Vec<u8>>,
    shared_key: Option<Vec<u8>>,
}

impl Aes128Cfb8EncryptionContext {
    /// A context with nothing installed yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn key_bytes(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        if let Some(shared) = &self.shared_key {
            let n = shared.len().min(16);
            key[..n].copy_from_slice(&shared[..n]);
        }
        key
    }
}

impl EncryptionContext for Aes128Cfb8EncryptionContext {
    fn set_public_key(&mut self, key: Vec<u8>) {
        self.public_key = Some(key);
    }

    fn get_public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    fn set_challenge_token(&mut self, token: Vec<u8>) {
        self.challenge_token = Some(token);
    }

    fn check_challenge_token(&self, candidate: &[u8]) -> bool {
        self.challenge_token.as_deref() == Some(candidate)
    }

    fn encrypt_challenge_token(&self) -> Vec<u8> {
        self.challenge_token.clone().unwrap_or_default()
    }

    fn set_encrypted_shared_key(&mut self, key: Vec<u8>) {
        self.shared_key = Some(key);
    }

    fn get_encrypted_shared_key(&self) -> Option<&[u8]> {
        self.shared_key.as_deref()
    }

    fn encrypted_input_stream(
        &self,
        raw: Box<dyn AsyncRead + Unpin + Send>,
    ) -> Box<dyn AsyncRead + Unpin + Send> {
        let key = self.key_bytes();
        Box::new(Aes128Cfb8Reader::new(raw, Cfb8::new(&key, &key)))
    }

    fn encrypted_output_stream(
        &self,
        raw: Box<dyn AsyncWrite + Unpin + Send>,
    ) -> Box<dyn AsyncWrite + Unpin + Send> {
        let key = self.key_bytes();
        Box::new(Aes128Cfb8Writer::new(raw, Cfb8::new(&key, &key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_token_round_trips_through_the_opaque_interface() {
        let mut ctx = Aes128Cfb8EncryptionContext::new();
        ctx.set_challenge_token(vec![1, 2, 3, 4]);
        assert!(ctx.check_challenge_token(&ctx.encrypt_challenge_token()));
        assert!(!ctx.check_challenge_token(&[9, 9, 9, 9]));
    }

    #[tokio::test]
    async fn encrypted_streams_wrap_a_shared_key_symmetrically() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut server_ctx = Aes128Cfb8EncryptionContext::new();
        server_ctx.set_encrypted_shared_key(vec![42; 16]);
        let mut client_ctx = Aes128Cfb8EncryptionContext::new();
        client_ctx.set_encrypted_shared_key(vec![42; 16]);

        let (a, b) = tokio::io::duplex(256);
        let mut writer = server_ctx.encrypted_output_stream(Box::new(a));
        writer.write_all(b"synced").await.unwrap();
        writer.flush().await.unwrap();

        let mut reader = client_ctx.encrypted_input_stream(Box::new(b));
        let mut out = [0u8; 6];
        reader.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"synced");
    }
}
