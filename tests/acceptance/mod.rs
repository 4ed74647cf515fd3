pub mod common;

mod pipeline_test;
mod realtime_test;
