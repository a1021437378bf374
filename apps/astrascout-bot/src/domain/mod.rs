//! Domain Layer - Market readings and normalization rules.
//!
//! This layer contains the canonical market types and the pure functions
//! that map loosely-typed upstream payloads onto them. Nothing here performs
//! I/O.

/// Error taxonomy shared by every layer.
pub mod error;

/// Quotes, sentiment readings and aggregate snapshots.
pub mod market;

/// Ordered-candidate JSON normalization.
pub mod normalize;
