//! Text packing for binary secrets carried in header fields.
//!
//! Bytes are read as big-endian 32-bit words, each word is written in
//! lowercase base 36, and the words are joined with `:`. The result is plain
//! ASCII with no characters that need escaping in an HTTP header.
//!
//! Each word has exactly one spelling. [`unpack`] rejects uppercase digits
//! and leading zeros, so any edit to packed text either fails or changes
//! the bytes.

use crate::PackingError;

const RADIX: u32 = 36;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SEPARATOR: char = ':';

/// Pack `bytes` into colon separated base-36 words.
///
/// The input length must be a multiple of 4.
pub fn pack<B: AsRef<[u8]>>(bytes: B) -> Result<String, PackingError> {
    let bytes = bytes.as_ref();
    if bytes.len() % 4 != 0 {
        return Err(PackingError::Unaligned(bytes.len()));
    }
    let words = bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .map(to_base36)
        .collect::<Vec<_>>();
    Ok(words.join(":"))
}

/// Reverse [`pack`]
pub fn unpack(text: &str) -> Result<Vec<u8>, PackingError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(text.len() / 2);
    for token in text.split(SEPARATOR) {
        out.extend_from_slice(&from_base36(token)?.to_be_bytes());
    }
    Ok(out)
}

fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    // u32::MAX is 7 digits in base 36
    let mut buf = [0u8; 7];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = DIGITS[(n % RADIX) as usize];
        n /= RADIX;
    }
    String::from_utf8_lossy(&buf[i..]).into_owned()
}

fn from_base36(token: &str) -> Result<u32, PackingError> {
    // only the form `to_base36` writes: lowercase digits, no sign, no leading zeros
    let canonical = !token.is_empty()
        && token.bytes().all(|b| DIGITS.contains(&b))
        && (token == "0" || !token.starts_with('0'));
    if !canonical {
        return Err(PackingError::InvalidToken(token.to_string()));
    }
    u32::from_str_radix(token, RADIX).map_err(|_| PackingError::InvalidToken(token.to_string()))
}
