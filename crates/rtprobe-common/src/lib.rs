#![doc = "Common types shared across the rtprobe workspace."]

pub mod config;
pub mod error;
pub mod histogram;
pub mod stats;
pub mod time;

pub use config::*;
pub use error::*;
pub use histogram::*;
pub use stats::*;
pub use time::*;
