// Library root: re-exports all modules so integration tests and the
// `agecurve` binary can access the batch runner's public API.

pub mod config;
pub mod report;
pub mod storage;
