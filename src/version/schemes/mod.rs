//! Ecosystem-specific version schemes

pub mod hackage;
pub mod npm;
pub mod nuget;
pub mod pypi;

pub use hackage::HackageScheme;
pub use npm::NpmScheme;
pub use nuget::{NugetScheme, NugetVersion};
pub use pypi::PypiScheme;
