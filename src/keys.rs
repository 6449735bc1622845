use crate::{KeyError, Result};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    traits::PublicKeyParts,
};
use std::{
    fmt::{self, Debug, Formatter},
    path::Path,
};

/// An RSA key loaded from PEM, either the public or the private half.
///
/// Which half is loaded decides the direction of the envelope: see
/// [`crate::Protection`].
#[derive(Clone, Eq, PartialEq)]
pub enum KeyPair {
    /// Only the public half
    Public(RsaPublicKey),
    /// The private half, from which the public half is derived
    Private(RsaPrivateKey),
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let kind = if self.is_private() { "Private" } else { "Public" };
        write!(f, "{} {{ bits: {} }}", kind, self.modulus_len() * 8)
    }
}

impl From<RsaPublicKey> for KeyPair {
    fn from(pk: RsaPublicKey) -> Self {
        KeyPair::Public(pk)
    }
}

impl From<RsaPrivateKey> for KeyPair {
    fn from(sk: RsaPrivateKey) -> Self {
        KeyPair::Private(sk)
    }
}

impl KeyPair {
    /// Parse PEM text. Accepts PKCS#8 (`PRIVATE KEY`, `PUBLIC KEY`) and
    /// PKCS#1 (`RSA PRIVATE KEY`, `RSA PUBLIC KEY`) labels.
    pub fn from_pem(pem: &str) -> std::result::Result<Self, KeyError> {
        let pem = pem.trim();
        let label = pem
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("-----BEGIN "))
            .and_then(|l| l.strip_suffix("-----"))
            .ok_or_else(|| KeyError::Pem("missing PEM header".to_string()))?;
        match label {
            "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_pem(pem)
                .map(KeyPair::Private)
                .map_err(malformed),
            "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_pem(pem)
                .map(KeyPair::Private)
                .map_err(malformed),
            "PUBLIC KEY" => RsaPublicKey::from_public_key_pem(pem)
                .map(KeyPair::Public)
                .map_err(malformed),
            "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_pem(pem)
                .map(KeyPair::Public)
                .map_err(malformed),
            other => Err(KeyError::Pem(format!("unsupported PEM label {:?}", other))),
        }
    }

    /// Read and parse a PEM file
    pub fn from_pem_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let pem = std::fs::read_to_string(path)?;
        Ok(Self::from_pem(&pem)?)
    }

    /// Generate a new private key with a modulus of `bits` bits
    pub fn generate(bits: usize) -> std::result::Result<Self, KeyError> {
        let mut rng = rand_core::OsRng;
        Ok(KeyPair::Private(RsaPrivateKey::new(&mut rng, bits)?))
    }

    /// A key holding only the public half, for handing to the other side
    pub fn to_public(&self) -> Self {
        KeyPair::Public(self.public_key())
    }

    /// Whether the private half is loaded
    pub fn is_private(&self) -> bool {
        matches!(self, KeyPair::Private(_))
    }

    /// The public half, derived if necessary
    pub fn public_key(&self) -> RsaPublicKey {
        match self {
            KeyPair::Public(pk) => pk.clone(),
            KeyPair::Private(sk) => sk.to_public_key(),
        }
    }

    /// The modulus length in bytes, which is also the wrapped output length
    pub fn modulus_len(&self) -> usize {
        match self {
            KeyPair::Public(pk) => pk.size(),
            KeyPair::Private(sk) => sk.size(),
        }
    }
}

fn malformed<E: fmt::Display>(e: E) -> KeyError {
    KeyError::Pem(e.to_string())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rstest::*;

    #[rstest]
    #[case::pkcs8_private(PRIVATE_PKCS8, true)]
    #[case::pkcs8_public(PUBLIC_PKCS8, false)]
    #[case::pkcs1_private(PRIVATE_PKCS1, true)]
    #[case::pkcs1_public(PUBLIC_PKCS1, false)]
    fn loads_pem(#[case] pem: &str, #[case] private: bool) {
        let key = KeyPair::from_pem(pem).unwrap();
        assert_eq!(key.is_private(), private);
        assert_eq!(key.modulus_len(), 256);
    }

    #[test]
    fn public_half_matches() {
        assert_eq!(private().public_key(), public().public_key());
        assert_eq!(other_private().public_key(), other_public().public_key());
        assert_ne!(private().public_key(), other_public().public_key());
    }

    #[rstest]
    #[case::not_pem("hello")]
    #[case::unknown_label("-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----")]
    #[case::bad_body("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----")]
    fn rejects_malformed(#[case] pem: &str) {
        assert!(matches!(KeyPair::from_pem(pem), Err(KeyError::Pem(_))));
    }

    #[test]
    fn to_public_drops_private_half() {
        let public = private().to_public();
        assert!(!public.is_private());
        assert_eq!(public, super::fixtures::public());
    }

    #[test]
    fn debug_hides_key_material() {
        let s = format!("{:?}", private());
        assert_eq!(s, "Private { bits: 2048 }");
    }
}
