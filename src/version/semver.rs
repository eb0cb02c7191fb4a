use semver::Version;

/// Parse a version string the way npm's loose mode does.
///
/// Accepts a leading `v` or `=`, surrounding whitespace, and leading zeros
/// in the numeric core. Partial versions like "1.2" are rejected, as npm does.
///
/// Examples:
/// - "v1.2.3" -> Version(1, 2, 3)
/// - "=1.2.3-beta.1" -> Version(1, 2, 3, pre: beta.1)
/// - "01.002.3" -> Version(1, 2, 3)
pub fn parse_loose(version: &str) -> Option<Version> {
    let trimmed = version
        .trim()
        .trim_start_matches('=')
        .trim_start_matches(['v', 'V'])
        .trim();

    if let Ok(parsed) = Version::parse(trimmed) {
        return Some(parsed);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let [major, minor, patch] = parts.as_slice() else {
        return None;
    };

    Version::parse(&format!("{}.{}.{}{}", major, minor, patch, suffix)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", Some((1, 2, 3)))]
    #[case("v1.2.3", Some((1, 2, 3)))]
    #[case("=1.2.3", Some((1, 2, 3)))]
    #[case(" 1.2.3 ", Some((1, 2, 3)))]
    #[case("01.002.3", Some((1, 2, 3)))]
    #[case("1.2.3-beta.1", Some((1, 2, 3)))]
    #[case("1.2", None)]
    #[case("1", None)]
    #[case("latest", None)]
    #[case("", None)]
    fn parse_loose_returns_expected(
        #[case] input: &str,
        #[case] expected: Option<(u64, u64, u64)>,
    ) {
        let parsed = parse_loose(input).map(|v| (v.major, v.minor, v.patch));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parse_loose_keeps_prerelease_with_leading_zero_core() {
        let parsed = parse_loose("01.0.0-rc.1").unwrap();

        assert_eq!(parsed.to_string(), "1.0.0-rc.1");
    }
}
