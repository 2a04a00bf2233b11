//! CLI command implementations.

pub mod common;
pub mod compile;
pub mod config;
pub mod info;
pub mod result;
pub mod run;
pub mod status;
pub mod version;
