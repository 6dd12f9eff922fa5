//! Filesystem primitives for readme-sync
//!
//! Everything the sync engine does to bytes on disk goes through this crate:
//! content digests, file state probes, atomic writes, metadata-preserving
//! copies, collision-safe moves and format-agnostic config persistence.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod state;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, expand_home, validate_path_identifier};
pub use state::FileState;
