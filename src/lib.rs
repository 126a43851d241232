//! Batch ETL over French DVF real-estate transaction records.
//!
//! Three independently triggerable stages move data through storage tiers:
//! ingest (published archives → bronze), bronze→silver (streaming
//! normalization into the canonical table format) and silver→gold (streaming
//! aggregation into JSON reports). Stages share no process state; they
//! communicate only through objects in the [`storage`] boundary.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod process;
pub mod storage;
