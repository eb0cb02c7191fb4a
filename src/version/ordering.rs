//! Total ordering of version strings under an ecosystem scheme
//!
//! Versions that fail to parse are never dropped: they are ordered
//! lexicographically and always placed after every valid version.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::version::scheme::VersionScheme;

/// Compare two version strings under `scheme`
///
/// Valid versions compare by the scheme's precedence, a valid version is
/// greater than an invalid one, and two invalid versions compare as strings.
pub fn compare<S: VersionScheme + ?Sized>(scheme: &S, a: &str, b: &str) -> Ordering {
    match (scheme.parse(a), scheme.parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

pub fn is_greater<S: VersionScheme + ?Sized>(scheme: &S, a: &str, b: &str) -> bool {
    compare(scheme, a, b) == Ordering::Greater
}

/// Sort versions newest first
///
/// Versions equal under the scheme collapse to the first spelling seen.
/// Invalid versions follow all valid ones in descending lexicographic order.
pub fn sort_descending<S, I>(scheme: &S, versions: I) -> Vec<String>
where
    S: VersionScheme + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut valid: BTreeMap<S::Parsed, String> = BTreeMap::new();
    let mut invalid: BTreeSet<String> = BTreeSet::new();

    for version in versions {
        let literal = version.as_ref();
        match scheme.parse(literal) {
            Some(parsed) => {
                valid.entry(parsed).or_insert_with(|| literal.to_string());
            }
            None => {
                invalid.insert(literal.to_string());
            }
        }
    }

    valid
        .into_values()
        .rev()
        .chain(invalid.into_iter().rev())
        .collect()
}

/// The greatest version under [`compare`], if any
pub fn max_version<S, I>(scheme: &S, versions: I) -> Option<String>
where
    S: VersionScheme + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    sort_descending(scheme, versions).into_iter().next()
}
