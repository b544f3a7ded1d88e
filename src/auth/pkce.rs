//! PKCE S256 verifier and challenge generation
//!
//! This module implements the Proof Key for Code Exchange (PKCE) extension
//! to OAuth 2.0 as defined in RFC 7636, specifically the `S256` challenge
//! method required by the Bitbucket authorization code flow.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random string called the `code_verifier`.
//! 2. The client computes a SHA-256 hash of the verifier and base64url-encodes
//!    it to produce the `code_challenge`.
//! 3. The authorization request includes `code_challenge` and
//!    `code_challenge_method=S256`.
//! 4. The token exchange request includes the original `code_verifier`.
//! 5. The authorization server recomputes the challenge and compares it to
//!    the value sent in step 3, proving possession of the verifier.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Number of random bytes drawn for the verifier.
///
/// RFC 7636 requires at least 32 bytes of entropy and a verifier length in
/// `[43, 128]`; 64 bytes encode to exactly 86 base64url characters.
const VERIFIER_ENTROPY_BYTES: usize = 64;

// ---------------------------------------------------------------------------
// PkceChallenge
// ---------------------------------------------------------------------------

/// A PKCE S256 challenge pair consisting of a verifier and its derived
/// challenge value.
///
/// Created by [`generate`] and consumed by the login flow in
/// `src/auth/flow.rs`. The pair lives only for the duration of one login
/// attempt and is never persisted.
///
/// # Examples
///
/// ```
/// use bbx::auth::pkce::generate;
///
/// let challenge = generate().expect("PKCE generation must not fail");
/// assert_eq!(challenge.method, "S256");
/// assert_eq!(challenge.verifier.len(), 86);
/// ```
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The code verifier: a base64url-encoded (no padding) random string of
    /// exactly 86 characters derived from 64 random bytes.
    ///
    /// This value is sent to the token endpoint in the `code_verifier`
    /// parameter during the authorization code exchange.
    pub verifier: String,

    /// The code challenge: the base64url-encoded (no padding) SHA-256 digest
    /// of the UTF-8 representation of [`Self::verifier`].
    ///
    /// This value is sent to the authorization endpoint in the
    /// `code_challenge` parameter.
    pub challenge: String,

    /// The challenge method.  Always `"S256"` for challenges produced by this
    /// module.
    pub method: String,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a fresh PKCE S256 challenge.
///
/// The verifier is 64 cryptographically random bytes encoded as a
/// base64url string without padding (86 characters).  The challenge is the
/// base64url-encoded SHA-256 digest of the verifier string's UTF-8 bytes,
/// as specified in RFC 7636 section 4.2.
///
/// # Errors
///
/// This function is infallible in practice; it returns a `Result` so that
/// callers can use `?` uniformly.  An error would only occur if the
/// cryptographic random number generator itself failed, which does not
/// happen on supported platforms and is fatal when it does.
///
/// # Examples
///
/// ```
/// use bbx::auth::pkce::generate;
///
/// let pkce = generate().unwrap();
///
/// // Verifier is exactly 86 base64url characters (64 bytes * 4/3 rounded).
/// assert_eq!(pkce.verifier.len(), 86);
///
/// // Method is always S256.
/// assert_eq!(pkce.method, "S256");
///
/// // Verifier and challenge are distinct strings.
/// assert_ne!(pkce.verifier, pkce.challenge);
/// ```
pub fn generate() -> Result<PkceChallenge> {
    use rand::RngCore as _;

    // Step 1: 64 cryptographically random bytes.
    let mut random_bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut random_bytes);

    // Step 2: base64url-encode (no padding) to produce the verifier.
    let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);

    // Step 3: SHA-256 of the UTF-8 bytes of the verifier string
    //         (RFC 7636 section 4.2: ASCII(BASE64URL(SHA256(ASCII(code_verifier)))))
    let digest = Sha256::digest(verifier.as_bytes());

    // Step 4: base64url-encode (no padding) the digest bytes.
    let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());

    Ok(PkceChallenge {
        verifier,
        challenge,
        method: "S256".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use sha2::{Digest, Sha256};

    #[test]
    fn test_generate_produces_correct_verifier_length() {
        let pkce = generate().expect("generate must not fail");
        assert_eq!(
            pkce.verifier.len(),
            86,
            "64 random bytes in base64url without padding produces 86 chars"
        );
    }

    #[test]
    fn test_verifier_length_within_rfc_bounds() {
        let pkce = generate().expect("generate must not fail");
        assert!(
            (43..=128).contains(&pkce.verifier.len()),
            "RFC 7636 requires verifier length in [43, 128], got {}",
            pkce.verifier.len()
        );
    }

    #[test]
    fn test_challenge_is_correct_s256_of_verifier() {
        let pkce = generate().expect("generate must not fail");

        // Recompute the challenge from the verifier.
        let digest = Sha256::digest(pkce.verifier.as_bytes());
        let expected_challenge =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());

        assert_eq!(
            pkce.challenge, expected_challenge,
            "challenge must equal base64url(SHA256(verifier))"
        );
    }

    #[test]
    fn test_method_is_always_s256() {
        let pkce = generate().expect("generate must not fail");
        assert_eq!(pkce.method, "S256");
    }

    #[test]
    fn test_generate_produces_unique_verifiers() {
        let a = generate().expect("first call");
        let b = generate().expect("second call");
        assert_ne!(
            a.verifier, b.verifier,
            "successive calls must produce distinct verifiers"
        );
    }

    #[test]
    fn test_verifier_uses_url_safe_base64_no_padding() {
        let pkce = generate().expect("generate must not fail");
        // base64url characters are [A-Za-z0-9_-]; no '+', '/', or '=' allowed.
        assert!(
            pkce.verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier must only contain base64url characters, got: {}",
            pkce.verifier
        );
        assert!(
            !pkce.verifier.contains('='),
            "verifier must not contain padding '='"
        );
    }

    #[test]
    fn test_challenge_uses_url_safe_base64_no_padding() {
        let pkce = generate().expect("generate must not fail");
        assert!(
            pkce.challenge
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "challenge must only contain base64url characters, got: {}",
            pkce.challenge
        );
        assert!(
            !pkce.challenge.contains('='),
            "challenge must not contain padding '='"
        );
    }

    #[test]
    fn test_verifier_and_challenge_are_distinct() {
        let pkce = generate().expect("generate must not fail");
        assert_ne!(
            pkce.verifier, pkce.challenge,
            "verifier and challenge must not be equal"
        );
    }

    /// Verifies the S256 derivation against the known test vector from
    /// RFC 7636 Appendix B.
    ///
    /// RFC 7636 Appendix B specifies:
    ///   code_verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
    ///   code_challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    #[test]
    fn test_s256_known_answer_rfc7636_appendix_b() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());
        assert_eq!(
            challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
            "S256 challenge must match RFC 7636 Appendix B test vector"
        );
    }
}
