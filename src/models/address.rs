//! Address validation and canonical form
//!
//! Every address entering the engine passes through [`validate_address`]
//! exactly once; everything downstream (sources, store keys, session
//! commits) only ever sees the canonical lower-case form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::NetworkProfile;

/// A syntactically valid address in canonical (lower-case) form.
///
/// Only obtainable through [`validate_address`], so holding one is proof
/// the prefix/length/hex checks already ran.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Short form for logs: 0x1f90...c326
    pub fn short(&self) -> String {
        if self.0.len() > 10 {
            format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a raw address string against a network profile.
///
/// Checks run in order: prefix, total length, hex body. Surrounding
/// whitespace is trimmed and letter case is ignored; the returned address
/// is always lower-case.
pub fn validate_address(raw: &str, network: &NetworkProfile) -> AppResult<Address> {
    let canonical = raw.trim().to_lowercase();

    if !canonical.starts_with(network.address_prefix) {
        return Err(AppError::invalid_address(format!(
            "address must start with {}",
            network.address_prefix
        )));
    }

    if canonical.len() != network.address_len {
        return Err(AppError::invalid_address(format!(
            "address must be {} characters, got {}",
            network.address_len,
            canonical.len()
        )));
    }

    let body = &canonical[network.address_prefix.len()..];
    if hex::decode(body).is_err() {
        return Err(AppError::invalid_address(
            "address contains non-hex characters",
        ));
    }

    Ok(Address(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use crate::utils::constants::PROFILE_ETHEREUM;

    const KNOWN_GOOD: &str = "0x1f9090aae28b8a3dceadf281b0f12828e676c326";

    #[test]
    fn test_valid_address_passes() {
        let addr = validate_address(KNOWN_GOOD, &PROFILE_ETHEREUM).unwrap();
        assert_eq!(addr.as_str(), KNOWN_GOOD);
    }

    #[test]
    fn test_mixed_case_is_canonicalized() {
        let addr =
            validate_address("0x1f9090aaE28b8a3dCeaDf281B0F12828e676c326", &PROFILE_ETHEREUM)
                .unwrap();
        assert_eq!(addr.as_str(), KNOWN_GOOD);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let addr = validate_address(&format!("  {}\n", KNOWN_GOOD), &PROFILE_ETHEREUM).unwrap();
        assert_eq!(addr.as_str(), KNOWN_GOOD);
    }

    #[test]
    fn test_missing_prefix_rejected() {
        let err =
            validate_address("1f9090aae28b8a3dceadf281b0f12828e676c326", &PROFILE_ETHEREUM)
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::AddressInvalidFormat);
        assert!(err.message.contains("0x"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = validate_address("0x123", &PROFILE_ETHEREUM).unwrap_err();
        assert_eq!(err.code, ErrorCode::AddressInvalidFormat);
        assert!(err.message.contains("42"));
    }

    #[test]
    fn test_non_hex_body_rejected() {
        // right prefix and length, 'z' in the body
        let err =
            validate_address("0xzf9090aae28b8a3dceadf281b0f12828e676c326", &PROFILE_ETHEREUM)
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::AddressInvalidFormat);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(validate_address("", &PROFILE_ETHEREUM).is_err());
        assert!(validate_address("   ", &PROFILE_ETHEREUM).is_err());
    }

    #[test]
    fn test_short_form() {
        let addr = validate_address(KNOWN_GOOD, &PROFILE_ETHEREUM).unwrap();
        assert_eq!(addr.short(), "0x1f90...c326");
    }
}
