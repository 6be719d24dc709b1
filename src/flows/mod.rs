//! Flows module - Operations combining the core pieces into a run
//!
//! Provides:
//! - context: Walk a project and assemble the document
//! - report: Summary line, threshold warnings, JSON run report, file output
//! - prompt: Suggested review prompt

pub mod context;
pub mod prompt;
pub mod report;
