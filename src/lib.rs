//! Bitwise context mixing compressor core.
//!
//! Models predict each bit from long matches, hashed bit histories ([`context_map`])
//! and a DMC forest ([`dmc`]); the predictions are mixed in the logistic domain
//! ([`mixers`]), refined ([`sse`]) and arithmetic coded ([`entropy_coding`]).

pub mod config;
pub mod context_map;
pub mod counters;
pub mod dmc;
pub mod entropy_coding;
pub mod error;
pub mod hash;
pub mod hashmap;
pub mod helpers;
pub mod logistic;
pub mod macros;
pub mod mixers;
pub mod models;
pub mod predictor;
pub mod runner;
pub mod shared;
pub mod sse;
pub mod state_table;

pub use config::Config;
pub use error::{Error, Result};
pub use predictor::Predictor;
pub use runner::{compress, decompress, decode, encode};
