//! Version scheme abstraction for different ecosystems

/// Parser for one ecosystem's version syntax
///
/// Each ecosystem has its own version rules:
/// - npm: semantic versioning (1.2.3-beta.1)
/// - NuGet: up to four numeric parts with an optional prerelease (1.0.0.1-rc)
/// - PyPI: PEP 440 (1.0rc1, 2.0.post1)
/// - Hackage: PVP dotted integers (2.2.1.0)
///
/// Two versions whose parsed values compare equal are the same version,
/// whatever their spelling.
pub trait VersionScheme: Send + Sync {
    /// Parsed form of a version. Its `Ord` is the ecosystem's precedence.
    type Parsed: Ord;

    /// Parse a version string, returning None when it does not follow the scheme
    fn parse(&self, version: &str) -> Option<Self::Parsed>;
}
