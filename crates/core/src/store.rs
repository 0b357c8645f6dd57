//! The encounter workflow store.
//!
//! One [`EncounterStore`] is constructed at process start and shared (by
//! `Arc`) with every front-end module. It owns the census of admitted
//! patients, applies every mutation as one serialized
//! read-merge-derive-compare-commit-notify sequence, persists the committed
//! snapshot to the best-effort cache, and notifies subscribers.
//!
//! ## Concurrency model
//!
//! A single mutation mutex serializes writers end to end, so no two
//! mutations ever interleave. The published snapshot lives behind its own
//! lock as an immutable `Arc`, which gives readers two guarantees:
//! - no tearing: a snapshot handle never changes underneath the reader
//! - read-after-notify: a listener that re-reads the store during
//!   notification observes the snapshot that triggered it
//!
//! Listeners run synchronously on the mutating thread, in registration
//! order. They must not block and must not mutate the store reentrantly.
//!
//! ## Failure model
//!
//! Lookups and writes addressed to unknown patients are silent no-ops
//! (logged at debug level). Cache failures are logged at warn level and
//! swallowed; the in-memory census is the source of truth for the lifetime
//! of the process.

use crate::config::StoreConfig;
use crate::encounter::{
    ClinicalStatus, ClinicalSync, DischargeChecks, EncounterPatch, EncounterRecord,
    RegisterAdmissionInput, WorkflowStatus,
};
use crate::workflow;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use uuid::Uuid;
use ward_cache::SnapshotCache;
use ward_types::NonEmptyText;

/// The full census at one instant: patient id to encounter record.
pub type Snapshot = BTreeMap<String, EncounterRecord>;

type Listener = Arc<dyn Fn() + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: Listener,
}

/// Handle returned by [`EncounterStore::subscribe`].
///
/// Cancelling removes the listener; calling [`cancel`](Subscription::cancel)
/// more than once is safe and does nothing further.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Vec<ListenerEntry>>>,
}

impl Subscription {
    /// Removes the subscribed listener. Idempotent.
    pub fn cancel(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut guard = listeners.lock().unwrap_or_else(PoisonError::into_inner);
            guard.retain(|entry| entry.id != self.id);
        }
    }
}

/// Process-wide store of encounter workflow state.
pub struct EncounterStore {
    config: StoreConfig,
    cache: SnapshotCache,
    /// Serializes every mutation end to end, hydration included.
    mutation: Mutex<()>,
    hydrated: AtomicBool,
    /// The published census. Replaced wholesale on commit, never edited in
    /// place, so outstanding handles stay internally consistent.
    snapshot: RwLock<Arc<Snapshot>>,
    listeners: Arc<Mutex<Vec<ListenerEntry>>>,
    next_listener_id: AtomicU64,
}

impl EncounterStore {
    /// Creates a store over the given configuration.
    ///
    /// No I/O happens here; the cached census is restored lazily on the
    /// first read or mutation.
    pub fn new(config: StoreConfig) -> Self {
        let cache = SnapshotCache::new(config.cache_path());
        Self {
            config,
            cache,
            mutation: Mutex::new(()),
            hydrated: AtomicBool::new(false),
            snapshot: RwLock::new(Arc::new(Snapshot::new())),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the current census.
    ///
    /// Safe to call at any time; the first call hydrates from the cache.
    /// Between commits the returned `Arc` is pointer-identical, so a
    /// dropped no-op mutation is indistinguishable from no mutation at all.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.ensure_hydrated();
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// All records, ordered for ward displays: non-discharged before
    /// discharged, then ascending case-insensitive patient name, ties
    /// broken by patient id.
    pub fn all(&self) -> Vec<EncounterRecord> {
        let snapshot = self.snapshot();
        let mut records: Vec<EncounterRecord> = snapshot.values().cloned().collect();
        records.sort_by(|a, b| {
            let a_discharged = a.workflow_status == WorkflowStatus::Discharged;
            let b_discharged = b.workflow_status == WorkflowStatus::Discharged;
            a_discharged
                .cmp(&b_discharged)
                .then_with(|| {
                    a.patient_name
                        .to_lowercase()
                        .cmp(&b.patient_name.to_lowercase())
                })
                .then_with(|| a.patient_id.cmp(&b.patient_id))
        });
        records
    }

    /// Looks up one record by patient id.
    pub fn by_patient_id(&self, patient_id: &str) -> Option<EncounterRecord> {
        self.snapshot().get(patient_id).cloned()
    }

    /// Looks up one record by medical record number.
    ///
    /// MRNs are expected unique among active records but may recur in
    /// discharged history; an active record wins over a discharged one.
    pub fn by_mrn(&self, mrn: &str) -> Option<EncounterRecord> {
        let snapshot = self.snapshot();
        find_by_mrn(&snapshot, mrn).cloned()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Registers an admission, creating a record or refreshing the existing
    /// one with the same MRN.
    ///
    /// A matching MRN merges: descriptive fields are overwritten only from
    /// supplied (hence non-empty) input values, no identifiers are
    /// regenerated, and a discharged record re-enters care. Otherwise a
    /// fresh record is created with generated identifiers, zero counters,
    /// open gates, and an `Admitted` status.
    ///
    /// Returns the record as committed (or, when nothing changed, as it
    /// already stood).
    pub fn register_admission(&self, input: RegisterAdmissionInput) -> EncounterRecord {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.hydrate_locked();
        let current = self.current();

        if let Some(existing) = find_by_mrn(&current, input.mrn.as_str()).cloned() {
            let mut candidate = existing.clone();
            if let Some(patient_name) = &input.patient_name {
                candidate.patient_name = patient_name.as_str().to_owned();
            }
            if let Some(consultant) = &input.consultant {
                candidate.consultant = consultant.as_str().to_owned();
            }
            if let Some(ward) = &input.ward {
                candidate.ward = ward.as_str().to_owned();
            }
            if let Some(diagnosis) = &input.diagnosis {
                candidate.diagnosis = diagnosis.as_str().to_owned();
            }
            if candidate.workflow_status == WorkflowStatus::Discharged {
                candidate.workflow_status = WorkflowStatus::InCare;
            }

            let next = workflow::recompute(candidate);
            if next.differs_from(&existing) {
                self.commit(&current, next)
            } else {
                existing
            }
        } else {
            let patient_id = input
                .patient_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(generate_id);

            let record = workflow::recompute(EncounterRecord {
                patient_id,
                admission_id: generate_id(),
                encounter_id: generate_id(),
                mrn: input.mrn.as_str().to_owned(),
                patient_name: optional_text(&input.patient_name),
                consultant: optional_text(&input.consultant),
                ward: optional_text(&input.ward),
                bed: String::new(),
                diagnosis: optional_text(&input.diagnosis),
                clinical_status: ClinicalStatus::Stable,
                pending_orders: 0,
                pending_diagnostics: 0,
                pending_medications: 0,
                billing_cleared: false,
                pharmacy_cleared: false,
                follow_up_ready: false,
                discharge_ready: false,
                workflow_status: WorkflowStatus::Admitted,
                updated_at: Utc::now(),
            });

            self.commit(&current, record)
        }
    }

    /// Applies a partial update to the addressed record.
    ///
    /// Unknown ids are dropped silently, as are writes addressed to a
    /// discharged record: the terminal phase only ends through re-admission
    /// via [`register_admission`](Self::register_admission). A patch whose
    /// recomputed result matches the previous record field for field is
    /// dropped without committing, persisting, or notifying.
    pub fn patch(&self, patient_id: &str, patch: EncounterPatch) {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.hydrate_locked();
        let current = self.current();

        let Some(previous) = current.get(patient_id).cloned() else {
            tracing::debug!("ignoring write for unknown patient {patient_id}");
            return;
        };
        if previous.workflow_status == WorkflowStatus::Discharged {
            tracing::debug!("ignoring write for discharged patient {patient_id}");
            return;
        }

        let next = workflow::recompute(patch.apply_to(&previous));
        if next.differs_from(&previous) {
            self.commit(&current, next);
        }
    }

    /// Places (or moves) the patient to a bed, marking care as started.
    pub fn assign_bed(
        &self,
        patient_id: &str,
        bed: impl Into<String>,
        ward: impl Into<String>,
        diagnosis: Option<String>,
    ) {
        self.patch(
            patient_id,
            EncounterPatch {
                bed: Some(bed.into()),
                ward: Some(ward.into()),
                diagnosis,
                workflow_status: Some(WorkflowStatus::InCare),
                ..Default::default()
            },
        );
    }

    /// Applies an update from the orders/diagnostics/medication modules,
    /// marking care as started.
    pub fn sync_clinical(&self, patient_id: &str, sync: ClinicalSync) {
        self.patch(
            patient_id,
            EncounterPatch {
                pending_orders: sync.pending_orders,
                pending_diagnostics: sync.pending_diagnostics,
                pending_medications: sync.pending_medications,
                clinical_status: sync.clinical_status,
                diagnosis: sync.diagnosis,
                workflow_status: Some(WorkflowStatus::InCare),
                ..Default::default()
            },
        );
    }

    /// Applies an update from the billing/pharmacy/discharge modules.
    pub fn sync_discharge_checks(&self, patient_id: &str, checks: DischargeChecks) {
        self.patch(
            patient_id,
            EncounterPatch {
                billing_cleared: checks.billing_cleared,
                pharmacy_cleared: checks.pharmacy_cleared,
                follow_up_ready: checks.follow_up_ready,
                ..Default::default()
            },
        );
    }

    /// Moves the record into the terminal `Discharged` phase and zeros the
    /// pending counters. Unknown ids are dropped silently; discharging a
    /// discharged record changes nothing and notifies nobody.
    pub fn mark_discharged(&self, patient_id: &str) {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.hydrate_locked();
        let current = self.current();

        let Some(previous) = current.get(patient_id).cloned() else {
            tracing::debug!("ignoring discharge for unknown patient {patient_id}");
            return;
        };

        let mut candidate = previous.clone();
        candidate.workflow_status = WorkflowStatus::Discharged;
        candidate.pending_orders = 0;
        candidate.pending_diagnostics = 0;
        candidate.pending_medications = 0;

        let next = workflow::recompute(candidate);
        if next.differs_from(&previous) {
            self.commit(&current, next);
        }
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Registers a listener invoked synchronously, once, after every
    /// committed mutation, in registration order.
    ///
    /// Listeners re-read the store for the new state rather than receiving
    /// it as an argument. They must not block, and must not mutate the
    /// store from inside the callback. Subscribing or cancelling from
    /// inside a listener is fine; the change takes effect from the next
    /// notification.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        guard.push(ListenerEntry {
            id,
            listener: Arc::new(listener),
        });
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn current(&self) -> Arc<Snapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn ensure_hydrated(&self) {
        if self.hydrated.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.hydrate_locked();
    }

    /// Restores the census from the cache over the seeded defaults.
    ///
    /// Callers must hold the mutation mutex. Malformed cached entries are
    /// skipped individually; an unreadable cache is treated as absent.
    fn hydrate_locked(&self) {
        if self.hydrated.load(Ordering::Acquire) {
            return;
        }

        let mut census: Snapshot = self
            .config
            .seed()
            .iter()
            .cloned()
            .map(|record| {
                let record = workflow::recompute(record);
                (record.patient_id.clone(), record)
            })
            .collect();

        match self.cache.load::<Map<String, Value>>() {
            Ok(Some(document)) => {
                for (patient_id, value) in document {
                    match restore_entry(census.get(&patient_id), &value) {
                        Some(record) => {
                            census.insert(record.patient_id.clone(), record);
                        }
                        None => {
                            tracing::warn!("skipping malformed cached encounter {patient_id}");
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!("encounter cache unavailable, starting from defaults: {error}");
            }
        }

        let mut published = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *published = Arc::new(census);
        drop(published);

        self.hydrated.store(true, Ordering::Release);
    }

    /// Publishes `record` into a fresh snapshot, persists it best-effort,
    /// and notifies listeners. Callers must hold the mutation mutex and
    /// must have established that the record meaningfully changed.
    fn commit(&self, current: &Snapshot, record: EncounterRecord) -> EncounterRecord {
        let mut record = record;
        record.updated_at = Utc::now();

        let mut next = current.clone();
        next.insert(record.patient_id.clone(), record.clone());
        let next = Arc::new(next);

        {
            let mut published = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            *published = Arc::clone(&next);
        }

        if let Err(error) = self.cache.store(next.as_ref()) {
            tracing::warn!("failed to persist encounter snapshot: {error}");
        }

        self.notify();
        record
    }

    fn notify(&self) {
        // Snapshot the listener list first so listeners may subscribe or
        // cancel without deadlocking the dispatch.
        let listeners: Vec<Listener> = {
            let guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            guard
                .iter()
                .map(|entry| Arc::clone(&entry.listener))
                .collect()
        };
        for listener in listeners {
            listener();
        }
    }
}

fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn optional_text(text: &Option<NonEmptyText>) -> String {
    text.as_ref().map(|t| t.as_str().to_owned()).unwrap_or_default()
}

fn find_by_mrn<'a>(census: &'a Snapshot, mrn: &str) -> Option<&'a EncounterRecord> {
    let mut discharged_match = None;
    for record in census.values() {
        if record.mrn != mrn {
            continue;
        }
        if record.workflow_status != WorkflowStatus::Discharged {
            return Some(record);
        }
        if discharged_match.is_none() {
            discharged_match = Some(record);
        }
    }
    discharged_match
}

/// Rebuilds one record from its cached JSON form.
///
/// The cached fields are merged over the seeded record for the same patient
/// when one exists, otherwise over a blank default, and the result is
/// re-derived. Returns `None` for entries that do not carry a usable
/// `patient_id` or do not decode as a record.
fn restore_entry(seeded: Option<&EncounterRecord>, cached: &Value) -> Option<EncounterRecord> {
    let cached = cached.as_object()?;

    let declared_id = cached
        .get("patient_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let base = seeded
        .cloned()
        .unwrap_or_else(|| blank_record(declared_id));

    let mut merged = match serde_json::to_value(&base) {
        Ok(Value::Object(fields)) => fields,
        _ => return None,
    };
    for (field, value) in cached {
        if merged.contains_key(field) {
            merged.insert(field.clone(), value.clone());
        }
    }

    let record: EncounterRecord = serde_json::from_value(Value::Object(merged)).ok()?;
    Some(workflow::recompute(record))
}

fn blank_record(patient_id: &str) -> EncounterRecord {
    EncounterRecord {
        patient_id: patient_id.to_owned(),
        admission_id: String::new(),
        encounter_id: String::new(),
        mrn: String::new(),
        patient_name: String::new(),
        consultant: String::new(),
        ward: String::new(),
        bed: String::new(),
        diagnosis: String::new(),
        clinical_status: ClinicalStatus::Stable,
        pending_orders: 0,
        pending_diagnostics: 0,
        pending_medications: 0,
        billing_cleared: false,
        pharmacy_cleared: false,
        follow_up_ready: false,
        discharge_ready: false,
        workflow_status: WorkflowStatus::Admitted,
        updated_at: Utc::now(),
    }
}
