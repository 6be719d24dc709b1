//! Backends module - Filesystem traversal and binary decoding
//!
//! Provides:
//! - scan: Deterministic tree walk with walkdir
//! - metadata: Image and audio header extraction

pub mod metadata;
pub mod scan;
