//! C ABI for the beer sloshing simulator
//!
//! Every entry point is `extern "C"` and reports failures through
//! `BeerSimErrorCode`, with a per-thread message available from
//! `beer_sim_get_last_error()`. `build.rs` generates `BeerSimFFI.h` at the
//! workspace root with cbindgen.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod config;
pub mod error;
mod helpers;
pub mod instance;
pub mod queries;
pub mod simulation;

pub use config::BeerSimConfig;
pub use error::BeerSimErrorCode;
pub use instance::BeerSimInstance;
pub use queries::{BeerSimStateInfo, BeerSimStats};
pub use simulation::BeerSimAcceleration;
