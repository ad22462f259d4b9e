//! Filesystem primitives for wheelenv
//!
//! Provides normalized path handling, atomic writes, advisory directory
//! locks and format-agnostic config loading.

pub mod config;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use lock::DirLock;
pub use path::NormalizedPath;
