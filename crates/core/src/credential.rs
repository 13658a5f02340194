//! Credential digests (bearer credential + secondary account key).

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Opaque keyed digest derived from a login/password pair.
///
/// Equality through [`CredentialDigest::ct_eq`] runs in constant time for
/// equal-length inputs. The derived `PartialEq` exists for map keys and tests;
/// authentication paths must use `ct_eq`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialDigest(String);

impl CredentialDigest {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Constant-time comparison against another digest.
    pub fn ct_eq(&self, other: &CredentialDigest) -> bool {
        let a = self.0.as_bytes();
        let b = other.0.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }
}

// Never print the credential itself.
impl core::fmt::Debug for CredentialDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CredentialDigest(<redacted>)")
    }
}

impl From<String> for CredentialDigest {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CredentialDigest {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
