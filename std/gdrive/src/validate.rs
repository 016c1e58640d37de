//! Content size validation for uploads into the managed folder.
//!
//! Every create or write must pass through [`validate_content_size`] before
//! any remote call is issued.

use serde::Serialize;

/// Upload ceiling in megabytes, inclusive.
pub const MAX_CONTENT_MB: f64 = 100.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of checking a payload against [`MAX_CONTENT_MB`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeCheck {
    pub valid: bool,
    /// Size in megabytes rounded to two decimal places.
    pub size_in_mb: f64,
}

impl SizeCheck {
    /// Check a payload of `len` bytes.
    pub fn from_len(len: u64) -> Self {
        let size_in_mb = bytes_to_mb(len);
        Self {
            valid: size_in_mb <= MAX_CONTENT_MB,
            size_in_mb,
        }
    }
}

/// Validate content by its UTF-8 encoded length, not its character count.
pub fn validate_content_size(content: &str) -> SizeCheck {
    SizeCheck::from_len(content.len() as u64)
}

/// Convert a byte count to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use crate::validate::{SizeCheck, bytes_to_mb, validate_content_size};

    const MB: u64 = 1024 * 1024;

    #[test]
    fn small_content_is_valid() {
        let check = validate_content_size(&"x".repeat(1024));
        assert!(check.valid);
        assert_eq!(check.size_in_mb, 0.0);
    }

    #[test]
    fn counts_encoded_bytes() {
        // 'é' is two bytes, '€' is three.
        let content = "é€".repeat(MB as usize / 5 * 2);
        let check = validate_content_size(&content);
        assert_eq!(check.size_in_mb, bytes_to_mb(content.len() as u64));
        assert_eq!(check.size_in_mb, 2.0);
    }

    #[test]
    fn boundary_is_inclusive() {
        let exact = SizeCheck::from_len(100 * MB);
        assert!(exact.valid);
        assert_eq!(exact.size_in_mb, 100.0);

        let over = SizeCheck::from_len(100 * MB + MB / 100 + 1);
        assert!(!over.valid);
        assert_eq!(over.size_in_mb, 100.01);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(bytes_to_mb(MB / 2), 0.5);
        assert_eq!(bytes_to_mb(MB + MB / 3), 1.33);
        assert_eq!(bytes_to_mb(0), 0.0);
    }
}
