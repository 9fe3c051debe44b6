//! Credential obfuscation shared across Atelier crates
//!
//! This is reversible XOR obfuscation, not encryption. It discourages casual
//! inspection of a stored API key and nothing more; the salt lives for the
//! process lifetime and is passed explicitly by the caller.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Produce a random single-byte salt for the lifetime of this process.
///
/// Falls back to a fixed byte if the OS entropy source is unavailable; the
/// obfuscation guarantee does not depend on salt quality.
pub fn session_salt() -> u8 {
    let mut buf = [0u8; 1];
    if getrandom::getrandom(&mut buf).is_err() {
        return 0x5a;
    }
    buf[0]
}

/// Obfuscate a plaintext value with the given salt.
pub fn obfuscate(plain: &str, salt: u8) -> String {
    let xored: Vec<u8> = plain.bytes().map(|b| b ^ salt).collect();
    BASE64.encode(xored)
}

/// Reverse [`obfuscate`]. Returns `None` when the input was not produced by
/// this module (bad base64 or bytes that do not decode to UTF-8).
pub fn reveal(obfuscated: &str, salt: u8) -> Option<String> {
    let bytes = BASE64.decode(obfuscated).ok()?;
    let restored: Vec<u8> = bytes.iter().map(|b| b ^ salt).collect();
    String::from_utf8(restored).ok()
}
