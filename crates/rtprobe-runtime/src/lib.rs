#![doc = "Real-time execution layer for rtprobe."]

pub mod clock;
pub mod realtime;
pub mod runner;

pub use clock::*;
pub use realtime::*;
pub use runner::*;
