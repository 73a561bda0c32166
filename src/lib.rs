//! # Reposift
//!
//! Filters and enriches a stream of repository records by running each one
//! through an ordered sequence of checks (file existence, commit search,
//! cloning, shell commands, line-of-code thresholds) and persists the
//! survivors with their accumulated metadata. Runs are checkpointed: an
//! interrupted chain resumes at the exact item and check where it stopped.
//!
//! ## Usage
//!
//! ```bash
//! reposift run --config chain.yml
//! ```
//!
//! ## Modules
//!
//! - `chain` - Task chain execution engine with checkpoint and result persistence
//! - `config` - YAML chain definitions with construction-time validation
//! - `github` - GitHub search backend collaborator behind a mockable trait
//! - `source` - Resumable item sources (live query and file replay)
//! - `subprocess` - Unified subprocess abstraction layer for testing
//! - `tasks` - Domain check factories and the fluent chain builder
//! - `walk` - Filesystem walking and line-count helpers
pub mod chain;
pub mod config;
pub mod github;
pub mod source;
pub mod subprocess;
pub mod tasks;
pub mod walk;
