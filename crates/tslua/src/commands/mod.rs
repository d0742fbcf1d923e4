//! CLI command implementations

pub mod check;
pub mod compile;
pub mod explain;
pub mod init;
