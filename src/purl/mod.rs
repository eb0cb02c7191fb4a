//! Package coordinates
//!
//! - [`types`]: the closed set of ecosystem tags
//! - [`coordinate`]: the immutable coordinate value and its package-URL form

pub mod coordinate;
pub mod types;

pub use coordinate::Coordinate;
pub use types::Ecosystem;
