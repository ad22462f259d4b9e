//! Command implementations for wheelenv-cli

pub mod check;
pub mod provision;

pub use check::run_check;
pub use provision::run_provision;
