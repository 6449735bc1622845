//! JSON-RPC over plain HTTP, sealed in a hybrid RSA envelope
//!
//! Every message travels as an envelope: a text body plus two header fields,
//! `key` and `iv`. Nobody watching the wire can read the payload.
//!
//! The scheme works as follows:
//!
//! 1. Create a fresh AES-256 session key and a 128-bit IV for the message.
//! 2. Encipher the JSON payload with AES-256-CBC and PKCS#7 padding.
//! 3. Authenticate `iv || ciphertext` with HMAC-SHA256 under a key derived
//!    from the session key with HKDF-SHA256, and append the tag.
//! 4. Base64 encode the ciphertext and tag. This is the body.
//! 5. Wrap the session key and IV separately with RSA PKCS#1 v1.5.
//! 6. Pack each wrapped value as colon-separated base-36 32-bit words. These
//!    are the `key` and `iv` header fields.
//!
//! Opening reverses each step and fails on the first one that does not
//! verify.
//!
//! Which RSA operation wraps the session secret depends on which half of the
//! key pair a side holds:
//!
//! | Holder | Seals with | Opens with | Seal gives |
//! | ------ | ---------- | ---------- | ---------- |
//! | public key | `public_encrypt` | `public_decrypt` | [`Protection::Confidentiality`] |
//! | private key | `private_encrypt` | `private_decrypt` | [`Protection::Authenticity`] |
//!
//! A server keeps the private key and hands the public key to its clients.
//! Requests can then only be read by the server, and replies can only have
//! come from it.
//!
//! # Usage
//! ```
//! use rpc_envelope::{Envelope, KeyPair, MethodTable, RpcServer, RequestObject};
//! use serde_json::json;
//!
//! let server_key = KeyPair::generate(1024).unwrap();
//! let client_key = server_key.to_public();
//!
//! let methods = MethodTable::new().with("ping", |_| Ok(json!("pong")));
//! let server = RpcServer::new(server_key, methods);
//!
//! // What an RpcClient posts
//! let client = Envelope::new(client_key);
//! let request = client.seal_json(&RequestObject::new("ping", None)).unwrap();
//!
//! let reply = server.respond(&request.body, request.header.pairs()).unwrap();
//! let result: serde_json::Value = client.open_json(&reply.body, &reply.header).unwrap();
//! assert_eq!(result, json!("pong"));
//! ```
//!
//! Over HTTP, [`RpcClient`] does the sealing, posting and opening:
//! ```no_run
//! use rpc_envelope::{KeyPair, RpcClient};
//!
//! let key = KeyPair::from_pem_file("config/public.pem").unwrap();
//! let client = RpcClient::new("http://localhost:3000/rpc", key).unwrap();
//! let pong = client.call("ping", None).unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused,
    clippy::mod_module_files
)]
#![deny(clippy::unwrap_used)]

pub mod cipher;
mod client;
mod config;
mod envelope;
mod error;
mod keys;
pub mod packing;
mod request;
mod server;
mod transcoder;
mod transport;

pub use cipher::SessionSecret;
pub use client::RpcClient;
pub use config::{ClientConfig, ServerConfig};
pub use envelope::{Envelope, EnvelopeHeader, IV_HEADER, KEY_HEADER, Sealed, TAG_LENGTH};
pub use error::{
    CipherError, ConnectionError, EnvelopeError, Error, KeyError, MethodError, PackingError,
    Result,
};
pub use keys::KeyPair;
pub use request::{JSONRPC_VERSION, Params, RequestObject};
pub use server::{Delegate, Handler, MethodTable, RpcServer};
pub use transcoder::{PKCS1_OVERHEAD, Protection, Transcoder};
pub use transport::{HttpResponse, HttpTransport, Transport};
