//! serialsum - Serial-section exclusive time summary for mtrace databases
//!
//! This library ranks the locks and hardware critical sections recorded in
//! an mtrace database by exclusive hold time, caches the ranked collection
//! per database content, and projects Amdahl speedup bounds from the
//! dominant serial section.

pub mod amdahl;
pub mod checksum;
pub mod cli;
pub mod collection;
pub mod columns;
pub mod dwarf;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod source;
pub mod summary;

pub use error::{Result, SerialsumError};
