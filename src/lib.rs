//! merge-chain: sequential checkpoint merge chains
//!
//! A chain is an ordered set of merge recipes. Each recipe combines up to
//! three source checkpoints into one output via a [`backend::MergeBackend`];
//! later recipes can consume earlier outputs through `__O<position>__`
//! variables. Checkpoint lookup and hashing go through a
//! [`registry::CheckpointRegistry`].

pub mod backend;
pub mod chain;
pub mod config;
pub mod error;
pub mod history;
pub mod registry;
pub mod sheet;
pub mod types;

pub use error::{Error, Result};
