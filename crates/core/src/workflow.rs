//! Pure derivation of discharge readiness and workflow phase.
//!
//! Every mutation path merges its input into a candidate record and then
//! calls [`recompute`] before comparing and committing. Keeping the rules in
//! one side-effect-free function means they can be exercised in isolation
//! from the store, and applying them twice is the same as applying them
//! once.

use crate::encounter::{EncounterRecord, WorkflowStatus};

/// Recomputes the derived fields of a candidate record.
///
/// `discharge_ready` is true iff the record is not already discharged, all
/// three pending counters are zero, and all three discharge gates are
/// cleared. `workflow_status` resolves, in order: a discharged candidate
/// stays discharged; a ready candidate is ready-for-discharge; an admitted
/// candidate with no care activity stays admitted; anything else is in-care.
///
/// Counter non-negativity is carried by the types; the write path clamps
/// caller-supplied values before they reach this function.
pub fn recompute(candidate: EncounterRecord) -> EncounterRecord {
    let already_discharged = candidate.workflow_status == WorkflowStatus::Discharged;

    let nothing_pending = candidate.pending_orders == 0
        && candidate.pending_diagnostics == 0
        && candidate.pending_medications == 0;
    let gates_cleared =
        candidate.billing_cleared && candidate.pharmacy_cleared && candidate.follow_up_ready;

    let discharge_ready = !already_discharged && nothing_pending && gates_cleared;

    let workflow_status = if already_discharged {
        WorkflowStatus::Discharged
    } else if discharge_ready {
        WorkflowStatus::ReadyForDischarge
    } else if candidate.workflow_status == WorkflowStatus::Admitted {
        WorkflowStatus::Admitted
    } else {
        WorkflowStatus::InCare
    };

    EncounterRecord {
        discharge_ready,
        workflow_status,
        ..candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::ClinicalStatus;
    use chrono::Utc;

    fn candidate(workflow_status: WorkflowStatus) -> EncounterRecord {
        EncounterRecord {
            patient_id: "p1".into(),
            admission_id: "a1".into(),
            encounter_id: "e1".into(),
            mrn: "M1".into(),
            patient_name: "Asha Rao".into(),
            consultant: "Dr Mehta".into(),
            ward: "7B".into(),
            bed: "12".into(),
            diagnosis: "Pneumonia".into(),
            clinical_status: ClinicalStatus::Stable,
            pending_orders: 0,
            pending_diagnostics: 0,
            pending_medications: 0,
            billing_cleared: true,
            pharmacy_cleared: true,
            follow_up_ready: true,
            discharge_ready: false,
            workflow_status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn clear_candidate_becomes_ready_for_discharge() {
        let derived = recompute(candidate(WorkflowStatus::InCare));
        assert!(derived.discharge_ready);
        assert_eq!(derived.workflow_status, WorkflowStatus::ReadyForDischarge);
    }

    #[test]
    fn any_pending_counter_blocks_readiness() {
        let setters: [fn(&mut EncounterRecord); 3] = [
            |r| r.pending_orders = 1,
            |r| r.pending_diagnostics = 1,
            |r| r.pending_medications = 1,
        ];
        for set in setters {
            let mut input = candidate(WorkflowStatus::InCare);
            set(&mut input);
            let derived = recompute(input);
            assert!(!derived.discharge_ready);
            assert_eq!(derived.workflow_status, WorkflowStatus::InCare);
        }
    }

    #[test]
    fn any_open_gate_blocks_readiness() {
        let setters: [fn(&mut EncounterRecord); 3] = [
            |r| r.billing_cleared = false,
            |r| r.pharmacy_cleared = false,
            |r| r.follow_up_ready = false,
        ];
        for set in setters {
            let mut input = candidate(WorkflowStatus::InCare);
            set(&mut input);
            assert!(!recompute(input).discharge_ready);
        }
    }

    #[test]
    fn admitted_stays_admitted_while_not_ready() {
        let mut input = candidate(WorkflowStatus::Admitted);
        input.billing_cleared = false;
        let derived = recompute(input);
        assert_eq!(derived.workflow_status, WorkflowStatus::Admitted);
        assert!(!derived.discharge_ready);
    }

    #[test]
    fn ready_for_discharge_falls_back_to_in_care_when_work_reappears() {
        let mut input = recompute(candidate(WorkflowStatus::InCare));
        assert_eq!(input.workflow_status, WorkflowStatus::ReadyForDischarge);

        input.pending_orders = 2;
        let derived = recompute(input);
        assert_eq!(derived.workflow_status, WorkflowStatus::InCare);
        assert!(!derived.discharge_ready);
    }

    #[test]
    fn discharged_is_a_fixpoint_and_never_ready() {
        let derived = recompute(candidate(WorkflowStatus::Discharged));
        assert_eq!(derived.workflow_status, WorkflowStatus::Discharged);
        assert!(!derived.discharge_ready);
    }

    #[test]
    fn recompute_is_idempotent() {
        for status in [
            WorkflowStatus::Admitted,
            WorkflowStatus::InCare,
            WorkflowStatus::ReadyForDischarge,
            WorkflowStatus::Discharged,
        ] {
            let mut input = candidate(status);
            input.pending_diagnostics = 1;
            let once = recompute(input.clone());
            let twice = recompute(once.clone());
            assert_eq!(once, twice);

            let clear_once = recompute(candidate(status));
            let clear_twice = recompute(clear_once.clone());
            assert_eq!(clear_once, clear_twice);
        }
    }

    #[test]
    fn readiness_holds_until_a_dependent_field_changes() {
        let ready = recompute(candidate(WorkflowStatus::InCare));
        assert!(ready.discharge_ready);

        // Unrelated descriptive churn does not revoke readiness.
        let mut renamed = ready.clone();
        renamed.consultant = "Dr Iyer".into();
        assert!(recompute(renamed).discharge_ready);

        // A dependent field changing does.
        let mut reopened = ready.clone();
        reopened.pharmacy_cleared = false;
        assert!(!recompute(reopened).discharge_ready);
    }
}
