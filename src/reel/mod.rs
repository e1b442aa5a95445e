//! Narrated stock-footage video assembly.
//!
//! A run turns a script, a narration recording and a music track into one
//! video: the script is segmented, each segment is illustrated with stock
//! media found through a search provider, the clips are normalized and cut
//! to their slot, and everything is muxed against the narration.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod planning;
pub mod progress;
pub mod render;
pub mod segment;
pub mod sourcing;
pub mod translate;
pub mod types;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
