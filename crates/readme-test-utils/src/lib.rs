//! Shared test utilities for the readme-sync workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace), a temporary
//!   source tree, mirror folder and config home

pub mod workspace;

pub use workspace::TestWorkspace;
