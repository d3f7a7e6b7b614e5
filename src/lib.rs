//! # data-inbox
//!
//! Fileset drift detection for partner data deliveries.
//!
//! Partners drop delimited text files into watch directories. For every
//! partner, a run decides whether new data arrived, pairs each new file
//! with the most similar previously recorded file, compares header rows
//! and records a status per partner and per file under a monotonically
//! increasing run id. A plain-text report is rebuilt from those rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Availability │──▶│   Matcher   │──▶│ Header diff  │
//! │  (per dir)   │   │ (fuzzy name)│   │ (set diff)   │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             ▼
//!                    ┌─────────────┐   ┌──────────────┐
//!                    │   Report    │◀──│ Store/SQLite │
//!                    └─────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`error`] | Per-file error type |
//! | [`models`] | Core data types and status codes |
//! | [`registry`] | Immutable per-run snapshots |
//! | [`fuzzy`] | Filename similarity |
//! | [`availability`] | Partner availability classifier |
//! | [`header`] | Header diff engine |
//! | [`matcher`] | Fileset matcher |
//! | [`filetype`] | Filetype classifier for the fileset build |
//! | [`report`] | Report aggregator |
//! | [`confirm`] | Yes/no confirmation capability |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`db`] | Database connection and backup |
//! | [`migrate`] | Schema creation and seed loading |
//! | [`check`] | Drift check orchestration |
//! | [`build`] | Fileset build orchestration |

pub mod availability;
pub mod build;
pub mod check;
pub mod config;
pub mod confirm;
pub mod db;
pub mod error;
pub mod filetype;
pub mod fuzzy;
pub mod header;
pub mod logging;
pub mod matcher;
pub mod migrate;
pub mod models;
pub mod registry;
pub mod report;
pub mod sqlite_store;
pub mod store;
