//! Encounter record model and partial-update carriers.
//!
//! This module defines the domain types the store operates on:
//! - [`EncounterRecord`], one per admitted patient
//! - [`EncounterPatch`], the general partial update used by every mutation
//! - [`ClinicalSync`] and [`DischargeChecks`], the narrowed payloads the
//!   clinical and discharge modules send
//! - [`RegisterAdmissionInput`], the admission-registration carrier
//!
//! Notes:
//! - `discharge_ready` and `workflow_status` are derived fields; they are
//!   recomputed from the primitive fields after every merge and any incoming
//!   value for them is overwritten
//! - The record's serde form is also its cache wire form: a JSON object with
//!   snake_case keys, lowercase / kebab-case enum strings, and an ISO-8601
//!   `updated_at`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ward_types::NonEmptyText;

/// Clinician-set acuity flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalStatus {
    /// Requires continuous attention.
    Critical,
    /// Under heightened observation.
    Watch,
    /// Routine care.
    #[default]
    Stable,
}

/// Coarse lifecycle bucket used by dashboards to group patients.
///
/// Derived, never set directly by callers: transitions fall out of the
/// recomputation in [`crate::workflow`]. The one caller-directed entry is
/// the terminal `Discharged` phase via
/// [`EncounterStore::mark_discharged`](crate::EncounterStore::mark_discharged).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    /// Registered, no care activity recorded yet.
    #[default]
    Admitted,
    /// Care activity in progress.
    InCare,
    /// Nothing outstanding; all discharge gates cleared.
    ReadyForDischarge,
    /// Terminal. Kept for reporting, excluded from active workflows.
    Discharged,
}

/// The clinical/administrative state of one inpatient admission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncounterRecord {
    /// Stable identifier of the current admission; primary key.
    pub patient_id: String,
    /// Identifier of the administrative admission, generated once.
    pub admission_id: String,
    /// Identifier of the clinical encounter, generated once.
    pub encounter_id: String,
    /// Medical record number; secondary lookup key.
    pub mrn: String,

    pub patient_name: String,
    pub consultant: String,
    pub ward: String,
    pub bed: String,
    pub diagnosis: String,

    /// Clinician-set acuity flag.
    pub clinical_status: ClinicalStatus,

    /// Outstanding order count fed by the orders module.
    pub pending_orders: u32,
    /// Outstanding diagnostic count fed by the diagnostics module.
    pub pending_diagnostics: u32,
    /// Outstanding medication count fed by the medication module.
    pub pending_medications: u32,

    /// Billing sign-off gate.
    pub billing_cleared: bool,
    /// Pharmacy sign-off gate.
    pub pharmacy_cleared: bool,
    /// Follow-up arrangement gate.
    pub follow_up_ready: bool,

    /// Derived: all counters zero, all gates cleared, not discharged.
    pub discharge_ready: bool,
    /// Derived: see [`crate::workflow`].
    pub workflow_status: WorkflowStatus,

    /// Stamped on every committed mutation.
    pub updated_at: DateTime<Utc>,
}

impl EncounterRecord {
    /// Field-wise comparison ignoring `updated_at`.
    ///
    /// The commit discipline drops any mutation whose recomputed record does
    /// not meaningfully differ from the previous one; the timestamp alone is
    /// not a meaningful difference.
    pub fn differs_from(&self, other: &Self) -> bool {
        let normalized = Self {
            updated_at: self.updated_at,
            ..other.clone()
        };
        *self != normalized
    }
}

/// Clamps a caller-supplied counter value to the valid range.
///
/// Counters are non-negative by invariant; callers occasionally send
/// decrements past zero and those must floor rather than wrap.
pub(crate) fn clamp_counter(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// A partial update to one encounter record.
///
/// Every field is optional; `None` leaves the record's field untouched, so a
/// patch never clears a field unless it carries an explicit replacement
/// value. Counter fields are `i64` so an out-of-range input survives to the
/// clamp instead of failing at the boundary. `workflow_status` is a
/// derivation hint only — the recomputation overwrites it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncounterPatch {
    pub patient_name: Option<String>,
    pub consultant: Option<String>,
    pub ward: Option<String>,
    pub bed: Option<String>,
    pub diagnosis: Option<String>,
    pub clinical_status: Option<ClinicalStatus>,
    pub pending_orders: Option<i64>,
    pub pending_diagnostics: Option<i64>,
    pub pending_medications: Option<i64>,
    pub billing_cleared: Option<bool>,
    pub pharmacy_cleared: Option<bool>,
    pub follow_up_ready: Option<bool>,
    pub workflow_status: Option<WorkflowStatus>,
}

impl EncounterPatch {
    /// Shallow-merges the present fields over `record`, returning the
    /// candidate for recomputation. Counters clamp to ≥ 0 here, at the
    /// write.
    pub fn apply_to(&self, record: &EncounterRecord) -> EncounterRecord {
        let mut candidate = record.clone();

        if let Some(patient_name) = &self.patient_name {
            candidate.patient_name = patient_name.clone();
        }
        if let Some(consultant) = &self.consultant {
            candidate.consultant = consultant.clone();
        }
        if let Some(ward) = &self.ward {
            candidate.ward = ward.clone();
        }
        if let Some(bed) = &self.bed {
            candidate.bed = bed.clone();
        }
        if let Some(diagnosis) = &self.diagnosis {
            candidate.diagnosis = diagnosis.clone();
        }
        if let Some(clinical_status) = self.clinical_status {
            candidate.clinical_status = clinical_status;
        }
        if let Some(pending_orders) = self.pending_orders {
            candidate.pending_orders = clamp_counter(pending_orders);
        }
        if let Some(pending_diagnostics) = self.pending_diagnostics {
            candidate.pending_diagnostics = clamp_counter(pending_diagnostics);
        }
        if let Some(pending_medications) = self.pending_medications {
            candidate.pending_medications = clamp_counter(pending_medications);
        }
        if let Some(billing_cleared) = self.billing_cleared {
            candidate.billing_cleared = billing_cleared;
        }
        if let Some(pharmacy_cleared) = self.pharmacy_cleared {
            candidate.pharmacy_cleared = pharmacy_cleared;
        }
        if let Some(follow_up_ready) = self.follow_up_ready {
            candidate.follow_up_ready = follow_up_ready;
        }
        if let Some(workflow_status) = self.workflow_status {
            candidate.workflow_status = workflow_status;
        }

        candidate
    }
}

/// Update payload from the orders/diagnostics/medication modules.
#[derive(Clone, Debug, Default)]
pub struct ClinicalSync {
    pub pending_orders: Option<i64>,
    pub pending_diagnostics: Option<i64>,
    pub pending_medications: Option<i64>,
    pub clinical_status: Option<ClinicalStatus>,
    pub diagnosis: Option<String>,
}

/// Update payload from the billing/pharmacy/discharge modules.
#[derive(Clone, Debug, Default)]
pub struct DischargeChecks {
    pub billing_cleared: Option<bool>,
    pub pharmacy_cleared: Option<bool>,
    pub follow_up_ready: Option<bool>,
}

/// Input to admission registration.
///
/// Descriptive fields are [`NonEmptyText`], so "overwrite only when the
/// input supplies a non-empty value" holds by construction: blank form
/// fields fold to `None` before they reach the store.
#[derive(Clone, Debug)]
pub struct RegisterAdmissionInput {
    /// Existing identifier to register under; generated when absent.
    pub patient_id: Option<String>,
    /// Medical record number; the merge key for repeat admissions.
    pub mrn: NonEmptyText,
    pub patient_name: Option<NonEmptyText>,
    pub consultant: Option<NonEmptyText>,
    pub ward: Option<NonEmptyText>,
    pub diagnosis: Option<NonEmptyText>,
}
