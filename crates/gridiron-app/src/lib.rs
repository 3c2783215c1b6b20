// Library root: exposes the pipeline modules to the binary and to the
// integration tests.

pub mod config;
pub mod db;
pub mod export;
pub mod input;
pub mod pipeline;
