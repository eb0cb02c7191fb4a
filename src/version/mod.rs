//! Version ordering engine
//!
//! Normalizes and totally orders version strings per ecosystem.
//!
//! # Modules
//!
//! - [`scheme`]: the `VersionScheme` trait each ecosystem implements
//! - [`schemes`]: npm, NuGet, PyPI and Hackage schemes
//! - [`ordering`]: descending sort, comparison and maximum under a scheme
//! - [`semver`]: loose semver parsing shared by npm
//! - [`types`]: `PackageVersions`, a registry's version listing with its dist-tags

pub mod ordering;
pub mod scheme;
pub mod schemes;
pub mod semver;
pub mod types;

pub use ordering::{compare, is_greater, max_version, sort_descending};
pub use scheme::VersionScheme;
pub use types::PackageVersions;
