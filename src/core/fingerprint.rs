use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Case-insensitive content digest of a task description.
///
/// Used as the dedup key when a line carries no explicit id: two lines whose
/// descriptions differ only in case always map to the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex-encoded MD5 of the upper-cased description (32 characters).
    pub fn of(description: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(description.to_uppercase().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_32_hex_chars() {
        let fp = Fingerprint::of("Write report");
        assert_eq!(fp.as_str().len(), 32);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_ignores_case() {
        for d in ["Write report", "Call Mom about the Bills", "straße"] {
            let fp = Fingerprint::of(d);
            assert_eq!(fp, Fingerprint::of(&d.to_uppercase()));
            assert_eq!(fp, Fingerprint::of(&d.to_lowercase()));
        }
    }

    #[test]
    fn fingerprint_matches_md5_of_uppercase() {
        // md5("ABC")
        assert_eq!(
            Fingerprint::of("abc").as_str(),
            "902fbdd2b1df0c4f70b4a5d23525e932"
        );
    }

    #[test]
    fn different_descriptions_differ() {
        assert_ne!(Fingerprint::of("Buy milk"), Fingerprint::of("Buy eggs"));
    }
}
