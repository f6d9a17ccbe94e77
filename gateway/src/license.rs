//! License key verification
//!
//! A licensed instance identifies itself with its license key. The gateway
//! only accepts the stream if the key verifies; it never downgrades a bad
//! key to an unlicensed identity. Cryptographic verification is deployment
//! specific, so it plugs in through [`LicenseVerifier`].

use thiserror::Error;

/// Longest license key accepted by [`FormatLicenseVerifier`]
pub const MAX_LICENSE_KEY_LEN: usize = 4096;

/// Why a license key was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseError {
    /// Key is empty or blank
    #[error("license key is empty")]
    Empty,

    /// Key is longer than any valid key
    #[error("license key is {len} bytes, longer than {max}")]
    TooLong { len: usize, max: usize },

    /// Key contains whitespace, control or non-ASCII characters
    #[error("license key contains an invalid character at byte {0}")]
    InvalidCharacter(usize),

    /// Key failed verification
    #[error("license key verification failed: {0}")]
    Rejected(String),
}

/// Verifies license keys presented by licensed instances.
pub trait LicenseVerifier: Send + Sync {
    /// Returns `Ok(())` if `license_key` is acceptable.
    fn verify(&self, license_key: &str) -> Result<(), LicenseError>;
}

/// Accepts any well-formed key: non-empty, bounded, printable ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatLicenseVerifier;

impl LicenseVerifier for FormatLicenseVerifier {
    fn verify(&self, license_key: &str) -> Result<(), LicenseError> {
        if license_key.trim().is_empty() {
            return Err(LicenseError::Empty);
        }
        if license_key.len() > MAX_LICENSE_KEY_LEN {
            return Err(LicenseError::TooLong {
                len: license_key.len(),
                max: MAX_LICENSE_KEY_LEN,
            });
        }
        if let Some(pos) = license_key.bytes().position(|b| !b.is_ascii_graphic()) {
            return Err(LicenseError::InvalidCharacter(pos));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_key() {
        assert_eq!(
            FormatLicenseVerifier.verify("eyJzaWciOiJhYmMifQ.c2lnbmF0dXJl"),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let v = FormatLicenseVerifier;
        assert_eq!(v.verify(""), Err(LicenseError::Empty));
        assert_eq!(v.verify("   "), Err(LicenseError::Empty));
        assert_eq!(v.verify("abc def"), Err(LicenseError::InvalidCharacter(3)));
        assert!(matches!(
            v.verify(&"k".repeat(MAX_LICENSE_KEY_LEN + 1)),
            Err(LicenseError::TooLong { .. })
        ));
    }
}
