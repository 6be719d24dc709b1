//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Walk result model (FileRecord, WalkResult, exclusion reasons)
//! - Exclusion rules and the compiled pattern matcher
//! - File classification and decoding
//! - Document rendering
//! - Path normalization utilities
//! - Token estimation for LLM context budgeting

pub mod error;
pub mod file_reader;
pub mod language;
pub mod model;
pub mod paths;
pub mod patterns;
pub mod render;
pub mod tokenizer;
pub mod util;
