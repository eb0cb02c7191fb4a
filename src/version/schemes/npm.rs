//! npm version scheme (semantic versioning, loose)

use semver::{BuildMetadata, Version};

use crate::version::scheme::VersionScheme;
use crate::version::semver::parse_loose;

pub struct NpmScheme;

impl VersionScheme for NpmScheme {
    type Parsed = Version;

    /// Build metadata is cleared, it never affects precedence
    fn parse(&self, version: &str) -> Option<Version> {
        let mut parsed = parse_loose(version)?;
        parsed.build = BuildMetadata::EMPTY;
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", "1.0.0-beta.1")]
    #[case("1.0.0-beta.2", "1.0.0-beta.1")]
    #[case("1.0.0-rc.1", "1.0.0-beta.11")]
    #[case("2.0.0", "1.99.99")]
    #[case("1.10.0", "1.9.0")]
    fn newer_version_parses_greater(#[case] newer: &str, #[case] older: &str) {
        assert!(NpmScheme.parse(newer).unwrap() > NpmScheme.parse(older).unwrap());
    }

    #[test]
    fn leading_zeros_parse_equal() {
        assert_eq!(NpmScheme.parse("1.02.3"), NpmScheme.parse("1.2.3"));
    }

    #[rstest]
    #[case("1.0.0+build.1", "1.0.0")]
    #[case("1.0.0+b", "1.0.0+a")]
    #[case("2.0.0-rc.1+sha.5114f85", "2.0.0-rc.1")]
    fn build_metadata_parses_equal(#[case] a: &str, #[case] b: &str) {
        assert_eq!(NpmScheme.parse(a), NpmScheme.parse(b));
    }
}
