// src/contract/mod.rs

//! Textual result contract between the orchestrator and its operations.
//!
//! An operation talks back only through its exit code and stdout. Stdout
//! carries three kinds of markers:
//!
//! - `HTTP response status code: <int>`
//! - `"Status": "<value>"` (one per job: the submitted job, then sub-jobs)
//! - `"Summary": "<value>"` (JSON-escaped free text)
//!
//! plus the [`markers::UNVERIFIED_STATUS`] line when the poller gave up.
//!
//! [`markers`] produces these lines inside the operation; [`parser`] reads
//! them back in the orchestrator. Nothing else in the crate depends on the
//! grammar.

pub mod markers;
pub mod parser;

pub use parser::{ContractReport, parse};
