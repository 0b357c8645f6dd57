//! # Ward Core
//!
//! Core business logic for the inpatient encounter workflow store.
//!
//! This crate holds the single source of truth for the clinical and
//! administrative state of every currently-admitted patient:
//! - One [`EncounterRecord`] per admission, keyed by patient id
//! - A pure derivation step recomputing discharge readiness and workflow
//!   phase after every merge
//! - Snapshot persistence to a best-effort local cache, restored on the
//!   first access after a restart
//! - Synchronous change notification to subscribed front-end modules
//!
//! **No API concerns**: screens, navigation, and permission checks live with
//! their own components; this crate is consumed entirely in-process.

pub mod config;
pub mod encounter;
pub mod store;
pub mod workflow;

pub use config::StoreConfig;
pub use encounter::{
    ClinicalStatus, ClinicalSync, DischargeChecks, EncounterPatch, EncounterRecord,
    RegisterAdmissionInput, WorkflowStatus,
};
pub use store::{EncounterStore, Snapshot, Subscription};
