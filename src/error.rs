use thiserror::Error;

/// Errors from the symmetric layer.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The symmetric key is not 32 bytes
    #[error("Invalid key length {0}")]
    InvalidKeyLength(usize),
    /// The initialization vector is not 16 bytes
    #[error("Invalid IV length {0}")]
    InvalidIvLength(usize),
    /// Padding was invalid or the ciphertext is not block aligned
    #[error("Bad padding")]
    BadPadding,
}

/// Errors from the integer packing used for header fields.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PackingError {
    /// Input to `pack` was not a multiple of 4 bytes
    #[error("Packing requires a multiple of 4 bytes, got {0}")]
    Unaligned(usize),
    /// A token was not a base-36 32-bit word
    #[error("Invalid packed token: {0:?}")]
    InvalidToken(String),
}

/// Errors from the asymmetric layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The PEM text could not be decoded as an RSA key
    #[error("Malformed key: {0}")]
    Pem(String),
    /// The input is larger than the key can wrap
    #[error("Plaintext of {len} bytes exceeds the maximum of {max}")]
    PlaintextTooLong {
        /// Input length
        len: usize,
        /// Maximum the modulus allows after padding
        max: usize,
    },
    /// A private key operation was requested with only the public half loaded
    #[error("Private key required")]
    PrivateKeyRequired,
    /// Wrapped input is not exactly one modulus long
    #[error("Invalid ciphertext length {len}, expected {expected}")]
    InvalidCiphertextLength {
        /// Input length
        len: usize,
        /// Modulus length in bytes
        expected: usize,
    },
    /// Wrapped input is numerically not below the modulus
    #[error("Ciphertext out of range")]
    CiphertextOutOfRange,
    /// PKCS#1 padding did not verify
    #[error("Bad padding")]
    BadPadding,
    /// Any other failure from the RSA implementation
    #[error("RSA error: {0}")]
    Rsa(String),
}

impl From<rsa::Error> for KeyError {
    fn from(e: rsa::Error) -> Self {
        match e {
            rsa::Error::Decryption => KeyError::BadPadding,
            e => KeyError::Rsa(e.to_string()),
        }
    }
}

/// Errors while sealing or opening an envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Symmetric layer failure
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),
    /// Asymmetric layer failure
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    /// Header field packing failure
    #[error("Packing error: {0}")]
    Packing(#[from] PackingError),
    /// The body is not valid base64
    #[error("Invalid base64 body")]
    Base64,
    /// The body is shorter than the authentication tag
    #[error("Body truncated")]
    Truncated,
    /// The authentication tag did not match
    #[error("Integrity check failed")]
    Integrity,
    /// A required header field was not present
    #[error("Missing header field {0:?}")]
    MissingHeader(&'static str),
    /// The opened payload was not the expected JSON
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<base64::DecodeError> for EnvelopeError {
    fn from(_: base64::DecodeError) -> Self {
        EnvelopeError::Base64
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(e: serde_json::Error) -> Self {
        EnvelopeError::Json(e.to_string())
    }
}

/// An HTTP exchange finished with a status outside `[200, 400)`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Failed. Response code {code}. {message}.")]
pub struct ConnectionError {
    /// HTTP status code
    pub code: u16,
    /// HTTP status message
    pub message: String,
}

/// Errors raised by method handlers on the server side.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MethodError {
    /// No handler is registered under this name
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    /// The handler rejected the parameters
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    /// The handler failed
    #[error("Method failed: {0}")]
    Failed(String),
}

/// The error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Sealing or opening failed
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// The remote answered with a failure status
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The delegate rejected the call
    #[error(transparent)]
    Method(#[from] MethodError),
    /// The HTTP exchange itself failed
    #[error("Transport error: {0}")]
    Transport(String),
    /// The decoded request is not a valid JSON-RPC 2.0 request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Reading key material failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CipherError> for Error {
    fn from(e: CipherError) -> Self {
        Error::Envelope(e.into())
    }
}

impl From<KeyError> for Error {
    fn from(e: KeyError) -> Self {
        Error::Envelope(e.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
