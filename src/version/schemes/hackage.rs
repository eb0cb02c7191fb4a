//! Hackage version scheme (Haskell Package Versioning Policy)
//!
//! Versions are non-empty sequences of non-negative integers compared
//! component-wise, so a version sorts below any of its extensions
//! (`1.0 < 1.0.0`).

use crate::version::scheme::VersionScheme;

pub struct HackageScheme;

impl VersionScheme for HackageScheme {
    type Parsed = Vec<u64>;

    fn parse(&self, version: &str) -> Option<Vec<u64>> {
        let version = version.trim();
        if version.is_empty() {
            return None;
        }
        version
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect()
    }
}
