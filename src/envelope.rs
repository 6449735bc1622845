use crate::{
    EnvelopeError, KeyPair, Protection, Transcoder,
    cipher::{self, KEY_LENGTH, SessionSecret},
    packing,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Header name carrying the wrapped session key
pub const KEY_HEADER: &str = "key";
/// Header name carrying the wrapped initialization vector
pub const IV_HEADER: &str = "iv";
/// Length of the authentication tag appended to the ciphertext
pub const TAG_LENGTH: usize = 32;

const MAC_INFO: &[u8] = b"rpc-envelope body mac";

/// The header half of a sealed message: the wrapped session key and IV,
/// each packed as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    /// Packed, wrapped session key
    pub key: String,
    /// Packed, wrapped initialization vector
    pub iv: String,
}

impl EnvelopeHeader {
    /// Header name/value pairs to merge into an HTTP message
    pub fn pairs(&self) -> [(&'static str, &str); 2] {
        [(KEY_HEADER, &self.key), (IV_HEADER, &self.iv)]
    }

    /// Pick the `key` and `iv` fields out of a header mapping. Names are
    /// matched case-insensitively. Other headers are ignored.
    pub fn from_headers<I, K, V>(headers: I) -> Result<Self, EnvelopeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut key = None;
        let mut iv = None;
        for (name, value) in headers {
            let name = name.as_ref();
            if name.eq_ignore_ascii_case(KEY_HEADER) {
                key = Some(value.as_ref().to_string());
            } else if name.eq_ignore_ascii_case(IV_HEADER) {
                iv = Some(value.as_ref().to_string());
            }
        }
        Ok(Self {
            key: key.ok_or(EnvelopeError::MissingHeader(KEY_HEADER))?,
            iv: iv.ok_or(EnvelopeError::MissingHeader(IV_HEADER))?,
        })
    }
}

/// A sealed message as it travels: a text body plus header fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    /// Base64 of the symmetric ciphertext and its authentication tag
    pub body: String,
    /// The wrapped session key and IV
    pub header: EnvelopeHeader,
}

impl std::fmt::Display for Sealed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sealed {{ key: {}, iv: {}, body: {} }}",
            self.header.key, self.header.iv, self.body,
        )
    }
}

/// Seals and opens messages with one side of an RSA key pair.
///
/// Each seal draws a fresh AES-256 key and IV, enciphers the payload in CBC
/// mode, authenticates `iv || ciphertext` with HMAC-SHA256 under a key
/// derived from the session key, and wraps the session key and IV with RSA.
/// Opening reverses every step and fails on the first mismatch.
#[derive(Clone, Debug)]
pub struct Envelope {
    transcoder: Transcoder,
}

impl From<KeyPair> for Envelope {
    fn from(key: KeyPair) -> Self {
        Self::new(key)
    }
}

impl From<Transcoder> for Envelope {
    fn from(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }
}

impl Envelope {
    /// Create an envelope for the given key
    pub fn new(key: KeyPair) -> Self {
        Self {
            transcoder: Transcoder::new(key),
        }
    }

    /// The transcoder wrapping session secrets
    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    /// What messages sealed by this side guarantee
    pub fn protection(&self) -> Protection {
        self.transcoder.protection()
    }

    /// Seal `plaintext` under a fresh session secret
    pub fn seal<B: AsRef<[u8]>>(&self, plaintext: B) -> Result<Sealed, EnvelopeError> {
        let secret = cipher::encipher(plaintext, None, None)?;
        let ciphertext = secret.ciphertext().unwrap_or_default();
        let tag = body_tag(&secret, ciphertext)?;

        let mut body = Vec::with_capacity(ciphertext.len() + TAG_LENGTH);
        body.extend_from_slice(ciphertext);
        body.extend_from_slice(&tag);

        let header = EnvelopeHeader {
            key: packing::pack(self.transcoder.encrypt(secret.key())?)?,
            iv: packing::pack(self.transcoder.encrypt(secret.iv())?)?,
        };
        tracing::debug!(
            body_len = body.len(),
            protection = %self.protection(),
            "sealed envelope"
        );
        Ok(Sealed {
            body: STANDARD.encode(body),
            header,
        })
    }

    /// Open a message sealed by the other half of this key pair
    pub fn open(&self, body: &str, header: &EnvelopeHeader) -> Result<Vec<u8>, EnvelopeError> {
        let mut key = self.transcoder.decrypt(&packing::unpack(&header.key)?)?;
        let iv = self.transcoder.decrypt(&packing::unpack(&header.iv)?)?;
        let secret = SessionSecret::from_parts(&key, &iv);
        key.zeroize();
        let secret = secret?;

        let mut body = STANDARD.decode(body.trim())?;
        if body.len() < TAG_LENGTH {
            return Err(EnvelopeError::Truncated);
        }
        let tag = body.split_off(body.len() - TAG_LENGTH);
        verify_tag(&secret, &body, &tag)?;

        let plaintext = secret.with_ciphertext(body).decipher()?;
        tracing::debug!(plaintext_len = plaintext.len(), "opened envelope");
        Ok(plaintext)
    }

    /// Serialize `value` as JSON and seal it
    pub fn seal_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Sealed, EnvelopeError> {
        self.seal(serde_json::to_vec(value)?)
    }

    /// Open a message and deserialize its JSON payload
    pub fn open_json<T: DeserializeOwned>(
        &self,
        body: &str,
        header: &EnvelopeHeader,
    ) -> Result<T, EnvelopeError> {
        let plaintext = self.open(body, header)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

fn body_mac(secret: &SessionSecret, ciphertext: &[u8]) -> Result<HmacSha256, EnvelopeError> {
    let mut mac_key = [0u8; KEY_LENGTH];
    Hkdf::<Sha256>::new(Some(secret.iv().as_slice()), secret.key().as_slice())
        .expand(MAC_INFO, &mut mac_key)
        .map_err(|_| EnvelopeError::Integrity)?;
    let mac = HmacSha256::new_from_slice(&mac_key).map_err(|_| EnvelopeError::Integrity);
    mac_key.zeroize();
    let mut mac = mac?;
    mac.update(secret.iv());
    mac.update(ciphertext);
    Ok(mac)
}

fn body_tag(secret: &SessionSecret, ciphertext: &[u8]) -> Result<[u8; TAG_LENGTH], EnvelopeError> {
    let mut tag = [0u8; TAG_LENGTH];
    tag.copy_from_slice(&body_mac(secret, ciphertext)?.finalize().into_bytes());
    Ok(tag)
}

fn verify_tag(secret: &SessionSecret, ciphertext: &[u8], tag: &[u8]) -> Result<(), EnvelopeError> {
    body_mac(secret, ciphertext)?
        .verify_slice(tag)
        .map_err(|_| EnvelopeError::Integrity)
}
