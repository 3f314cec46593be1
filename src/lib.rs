//! # Bug Similarity
//!
//! Duplicate-bug detection over a snapshot of bug-tracker records.
//!
//! The algorithms live in `bug-similarity-core`; this crate wires them to
//! a TOML configuration, a newline-delimited JSON corpus, on-disk model
//! artifacts, and the `bugsim` command line.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌────────────────────┐
//! │ bugs.json   │──▶│ Strategy::build  │──▶│ *.similaritymodel  │
//! │ (JSONL)     │   │ lsi / bm25 / wmd │   │ (checksummed)      │
//! └─────────────┘   └────────┬─────────┘   └─────────┬──────────┘
//!                            │                       │
//!                            ▼                       ▼
//!                   ┌──────────────────────────────────────┐
//!                   │ similar / distance / evaluate (CLI)  │
//!                   └──────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bugsim strategies                  # list registered strategies
//! bugsim build bm25                  # train and save an artifact
//! bugsim similar bm25 1234567        # nearest bugs to 1234567
//! bugsim evaluate bm25 --json        # recall / precision / MAP
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`source`] | Corpus loading |
//! | [`progress`] | Evaluation progress on stderr |
//! | [`strategies`] | Strategy listing |
//! | [`build_cmd`] | Build, save, and load strategies |
//! | [`similar`] | Similar-bug queries |
//! | [`distance`] | Pairwise distance queries |
//! | [`evaluate`] | Duplicate-retrieval evaluation |
//! | [`tracking_cmd`] | Release-tracking labels and classifier |

pub mod build_cmd;
pub mod config;
pub mod distance;
pub mod evaluate;
pub mod logging;
pub mod progress;
pub mod similar;
pub mod source;
pub mod strategies;
pub mod tracking_cmd;
