//! Symmetric layer: AES-256-CBC with PKCS#7 padding under one-time session secrets.

use crate::CipherError;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::prelude::*;
use std::fmt::{self, Debug, Formatter};
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// The length of the symmetric session key (AES-256)
pub const KEY_LENGTH: usize = 32;
/// The length of the CBC initialization vector
pub const IV_LENGTH: usize = 16;
/// The AES block size
pub const BLOCK_LENGTH: usize = 16;

/// The one-time symmetric key and IV for a single message, plus the
/// ciphertext once it exists.
///
/// The key and IV are fixed when the secret is created and cannot be changed
/// afterwards. Enciphering consumes a fresh secret, so a secret never
/// enciphers twice.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
    ciphertext: Option<Vec<u8>>,
}

impl Debug for SessionSecret {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SessionSecret")
            .field("key", &"<redacted>")
            .field("iv", &hex::encode(self.iv))
            .field("ciphertext", &self.ciphertext.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl SessionSecret {
    /// Create a secret with a fresh random key and IV
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        Self {
            key: rng.random(),
            iv: rng.random(),
            ciphertext: None,
        }
    }

    /// Create a secret from a known key and IV, e.g. ones recovered from an
    /// envelope header
    pub fn from_parts<K: AsRef<[u8]>, V: AsRef<[u8]>>(
        key: K,
        iv: V,
    ) -> Result<Self, CipherError> {
        Ok(Self {
            key: to_key(key.as_ref())?,
            iv: to_iv(iv.as_ref())?,
            ciphertext: None,
        })
    }

    /// Attach ciphertext received from the wire. The secret is consumed so
    /// a later decipher uses exactly this ciphertext.
    pub fn with_ciphertext(mut self, ciphertext: Vec<u8>) -> Self {
        self.ciphertext = Some(ciphertext);
        self
    }

    /// The session key
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// The initialization vector
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }

    /// The ciphertext, if enciphering happened or one was attached
    pub fn ciphertext(&self) -> Option<&[u8]> {
        self.ciphertext.as_deref()
    }

    /// Encipher `plaintext` under this secret's key and IV
    fn encipher(mut self, plaintext: &[u8]) -> Self {
        let ct = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        self.ciphertext = Some(ct);
        self
    }

    /// Decipher the attached ciphertext
    pub fn decipher(&self) -> Result<Vec<u8>, CipherError> {
        let ct = self.ciphertext.as_deref().unwrap_or_default();
        decrypt_cbc(ct, &self.key, &self.iv)
    }
}

/// Encipher `plaintext` with AES-256-CBC and PKCS#7 padding.
///
/// Whichever of `key` and `iv` is `None` is generated from the thread CSPRNG.
pub fn encipher<B: AsRef<[u8]>>(
    plaintext: B,
    key: Option<&[u8]>,
    iv: Option<&[u8]>,
) -> Result<SessionSecret, CipherError> {
    let mut secret = SessionSecret::generate();
    if let Some(k) = key {
        secret.key = to_key(k)?;
    }
    if let Some(v) = iv {
        secret.iv = to_iv(v)?;
    }
    Ok(secret.encipher(plaintext.as_ref()))
}

/// Reverse [`encipher`]
pub fn decipher<B: AsRef<[u8]>>(
    ciphertext: B,
    key: &[u8],
    iv: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut key = to_key(key)?;
    let iv = to_iv(iv)?;
    let plaintext = decrypt_cbc(ciphertext.as_ref(), &key, &iv);
    key.zeroize();
    plaintext
}

fn decrypt_cbc(
    ciphertext: &[u8],
    key: &[u8; KEY_LENGTH],
    iv: &[u8; IV_LENGTH],
) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LENGTH != 0 {
        return Err(CipherError::BadPadding);
    }
    Aes256CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::BadPadding)
}

fn to_key(bytes: &[u8]) -> Result<[u8; KEY_LENGTH], CipherError> {
    <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|_| CipherError::InvalidKeyLength(bytes.len()))
}

fn to_iv(bytes: &[u8]) -> Result<[u8; IV_LENGTH], CipherError> {
    <[u8; IV_LENGTH]>::try_from(bytes).map_err(|_| CipherError::InvalidIvLength(bytes.len()))
}
