//! Keyed one-way credential signature (HMAC-SHA1, base64).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use wallet_core::CredentialDigest;

type HmacSha1 = Hmac<Sha1>;

/// Derive the credential digest for a login/password pair.
///
/// The login is the HMAC key and the password the message. Deterministic and
/// side-effect free.
pub fn sign(key: &str, value: &str) -> CredentialDigest {
    // HMAC accepts keys of any length, including empty.
    let mut mac = match HmacSha1::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("hmac accepts keys of any size"),
    };
    mac.update(value.as_bytes());
    CredentialDigest::new(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Recompute the digest for `key`/`value` and compare it to `presented` in
/// constant time.
pub fn verify(key: &str, value: &str, presented: &CredentialDigest) -> bool {
    sign(key, value).ct_eq(presented)
}
