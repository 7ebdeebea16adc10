//! CLI command implementations

pub mod clean;
pub mod run;
pub mod status;
