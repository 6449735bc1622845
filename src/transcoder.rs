use crate::{KeyError, KeyPair};
use derive_more::Display;
use rsa::{BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, traits::PublicKeyParts};

/// Bytes of PKCS#1 v1.5 padding overhead, both block types
pub const PKCS1_OVERHEAD: usize = 11;
const MIN_PADDING: usize = 8;

/// The security property a seal provides, determined by which half of the
/// key pair the sealing side holds.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum Protection {
    /// Sealed with the public half: only the private key holder can open it
    #[display("Confidentiality")]
    Confidentiality,
    /// Sealed with the private half: any public key holder can open it and
    /// knows it came from the private key holder
    #[display("Authenticity")]
    Authenticity,
}

/// Wraps and unwraps short byte strings, e.g. session keys, with RSA.
///
/// The four primitives are exposed by name. [`Transcoder::encrypt`] and
/// [`Transcoder::decrypt`] select between them by which half of the key is
/// loaded, so that a public key holder and a private key holder of the same
/// pair always talk to each other.
#[derive(Clone, Debug)]
pub struct Transcoder {
    key: KeyPair,
}

impl From<KeyPair> for Transcoder {
    fn from(key: KeyPair) -> Self {
        Self::new(key)
    }
}

impl Transcoder {
    /// Take ownership of a loaded key
    pub fn new(key: KeyPair) -> Self {
        Self { key }
    }

    /// The loaded key
    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    /// The largest input the key can wrap
    pub fn max_plaintext_len(&self) -> usize {
        self.key.modulus_len().saturating_sub(PKCS1_OVERHEAD)
    }

    /// What a seal made by this side guarantees
    pub fn protection(&self) -> Protection {
        if self.key.is_private() {
            Protection::Authenticity
        } else {
            Protection::Confidentiality
        }
    }

    /// `private_encrypt` with a private key, `public_encrypt` otherwise
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        match self.protection() {
            Protection::Authenticity => self.private_encrypt(data),
            Protection::Confidentiality => self.public_encrypt(data),
        }
    }

    /// `private_decrypt` with a private key, `public_decrypt` otherwise
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        if self.key.is_private() {
            self.private_decrypt(data)
        } else {
            self.public_decrypt(data)
        }
    }

    /// RSAES-PKCS1-v1_5 encryption with the public half
    pub fn public_encrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.check_plaintext(data)?;
        let mut rng = rand_core::OsRng;
        Ok(self
            .key
            .public_key()
            .encrypt(&mut rng, Pkcs1v15Encrypt, data)?)
    }

    /// Inverse of [`Transcoder::public_encrypt`]
    pub fn private_decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let KeyPair::Private(sk) = &self.key else {
            return Err(KeyError::PrivateKeyRequired);
        };
        self.check_ciphertext(data)?;
        let mut rng = rand_core::OsRng;
        Ok(sk.decrypt_blinded(&mut rng, Pkcs1v15Encrypt, data)?)
    }

    /// Block type 1 padding followed by the blinded private key operation
    pub fn private_encrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let KeyPair::Private(sk) = &self.key else {
            return Err(KeyError::PrivateKeyRequired);
        };
        self.check_plaintext(data)?;
        // an unprefixed signature pads `data` as 00 || 01 || FF..FF || 00 || data
        let mut rng = rand_core::OsRng;
        Ok(sk.sign_with_rng(&mut rng, Pkcs1v15Sign::new_unprefixed(), data)?)
    }

    /// Raw public key operation followed by a block type 1 padding check
    pub fn public_decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.check_ciphertext(data)?;
        let k = self.key.modulus_len();
        let pk = self.key.public_key();
        let c = BigUint::from_bytes_be(data);
        if &c >= pk.n() {
            return Err(KeyError::CiphertextOutOfRange);
        }
        let em = left_pad(&c.modpow(pk.e(), pk.n()), k)?;

        if em[0] != 0x00 || em[1] != 0x01 {
            return Err(KeyError::BadPadding);
        }
        let padding = em[2..].iter().take_while(|b| **b == 0xff).count();
        let separator = 2 + padding;
        if padding < MIN_PADDING || separator >= k || em[separator] != 0x00 {
            return Err(KeyError::BadPadding);
        }
        Ok(em[separator + 1..].to_vec())
    }

    fn check_plaintext(&self, data: &[u8]) -> Result<(), KeyError> {
        let max = self.max_plaintext_len();
        if data.len() > max {
            return Err(KeyError::PlaintextTooLong {
                len: data.len(),
                max,
            });
        }
        Ok(())
    }

    fn check_ciphertext(&self, data: &[u8]) -> Result<(), KeyError> {
        let expected = self.key.modulus_len();
        if data.len() != expected {
            return Err(KeyError::InvalidCiphertextLength {
                len: data.len(),
                expected,
            });
        }
        Ok(())
    }
}

fn left_pad(n: &BigUint, k: usize) -> Result<Vec<u8>, KeyError> {
    let bytes = n.to_bytes_be();
    if bytes.len() > k {
        return Err(KeyError::Rsa("integer too large for modulus".to_string()));
    }
    let mut out = vec![0u8; k - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}
