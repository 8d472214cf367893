//! Link signatures.
//!
//! A signature binds a student identifier to the deployment's shared secret.
//! Anyone holding the secret can re-derive it; nobody else can mint one for a
//! different student. Signing is a pure function: no per-call state and no
//! caching, so a long-running process and a one-shot command agree.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded 256-bit digest.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// How the shared secret and the student identifier are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// `SHA-256(secret ‖ id)`.
    ///
    /// Matches links already handed out by the web front end. Vulnerable to
    /// length extension in principle; the id is the final input.
    #[default]
    PrefixedSha256,

    /// `HMAC-SHA256(key = secret, message = id)`.
    HmacSha256,
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrefixedSha256 => write!(f, "prefixed-sha256"),
            Self::HmacSha256 => write!(f, "hmac-sha256"),
        }
    }
}

/// Derives and checks student link signatures.
#[derive(Clone)]
pub struct Signer {
    secret: String,
    scheme: SignatureScheme,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer for the given secret.
    #[must_use]
    pub fn new(secret: impl Into<String>, scheme: SignatureScheme) -> Self {
        Self {
            secret: secret.into(),
            scheme,
        }
    }

    /// The scheme this signer uses.
    #[must_use]
    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Derive the lower-case hex signature for a student identifier.
    ///
    /// # Panics
    ///
    /// Never in practice: HMAC-SHA256 accepts keys of any length, so keying
    /// the MAC from the secret cannot fail.
    #[must_use]
    pub fn sign(&self, student_id: &str) -> String {
        match self.scheme {
            SignatureScheme::PrefixedSha256 => {
                let mut hasher = Sha256::new();
                hasher.update(self.secret.as_bytes());
                hasher.update(student_id.as_bytes());
                format!("{:x}", hasher.finalize())
            }
            SignatureScheme::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                    .expect("HMAC accepts any key length");
                mac.update(student_id.as_bytes());
                format!("{:x}", mac.finalize().into_bytes())
            }
        }
    }

    /// Check a candidate signature against a student identifier.
    ///
    /// Surrounding whitespace is ignored on both inputs. Empty inputs and
    /// malformed signatures are rejected, never reported as errors.
    #[must_use]
    pub fn verify(&self, student_id: &str, candidate: &str) -> bool {
        let student_id = student_id.trim();
        let candidate = candidate.trim();

        if student_id.is_empty() || candidate.is_empty() {
            debug!("Rejecting signature check with empty id or signature");
            return false;
        }

        let expected = self.sign(student_id);
        // TODO: compare fixed-width digests so the length check below stops
        // being an observable early return.
        if candidate.len() != expected.len() {
            debug!(student_id, "Signature length mismatch");
            return false;
        }

        let valid = constant_time_eq(candidate.as_bytes(), expected.as_bytes());
        trace!(student_id, valid, "Signature checked");
        valid
    }
}

/// Compare two equal-length byte strings without short-circuiting.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
