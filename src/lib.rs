//! Package metadata resolution across ecosystems
//!
//! Resolves package URLs (`pkg:npm/lodash@4.17.21`) against their registry:
//! version enumeration, normalized metadata, source repository inference and
//! artifact download.
//!
//! # Modules
//!
//! - [`purl`]: package coordinates and their package-URL form
//! - [`http`]: document cache shared by every provider
//! - [`version`]: per-ecosystem version ordering
//! - [`repository`]: source repository inference from URLs
//! - [`provider`]: npm, NuGet, Hackage and PyPI providers
//! - [`download`]: artifact download and extraction
//! - [`resolver`]: facade dispatching coordinates to providers

pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod metadata;
pub mod provider;
pub mod purl;
pub mod repository;
pub mod resolver;
pub mod version;

pub use error::{DownloadError, ErrorKind, ResolveError};
pub use metadata::NormalizedMetadata;
pub use purl::{Coordinate, Ecosystem};
pub use resolver::{Resolver, create_default_resolver};
