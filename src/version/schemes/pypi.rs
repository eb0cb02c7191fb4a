//! PyPI version scheme (PEP 440)

use std::str::FromStr;

use pep508_rs::pep440_rs::Version;

use crate::version::scheme::VersionScheme;

pub struct PypiScheme;

impl VersionScheme for PypiScheme {
    type Parsed = Version;

    fn parse(&self, version: &str) -> Option<Version> {
        Version::from_str(version.trim()).ok()
    }
}
