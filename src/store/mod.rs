//! Domain stores
//!
//! [`Ledger`] is the lifecycle-scoped state container that owns the
//! in-memory snapshot and every mutation path into it. All mutations go
//! through `&mut self`, so the compiler serializes them: rule application,
//! duplicate detection, and integrity validation for one mutation always
//! complete before the next mutation begins. Each mutation stages its
//! changes on a copy of the snapshot, validates, and only then swaps the
//! copy in; a rejected mutation leaves the committed state untouched.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod goals;
pub mod rules;
pub mod transactions;

pub use budgets::BudgetStatus;
pub use transactions::{CommitOutcome, TransferOutcome};

use tracing::{info, warn};

use crate::config::{LedgerPaths, Settings};
use crate::crypto::DerivedKey;
use crate::engine::{repair, validate, DuplicateDetector, Violation};
use crate::error::{LedgerError, LedgerResult};
use crate::migrate::migrate;
use crate::models::Snapshot;
use crate::storage::SnapshotStore;

/// The engine's state container: owns the snapshot, the persistence store,
/// and the engines, for the lifetime of an app session.
pub struct Ledger {
    paths: LedgerPaths,
    settings: Settings,
    store: SnapshotStore,
    key: Option<DerivedKey>,
    detector: DuplicateDetector,
    snapshot: Snapshot,
}

impl Ledger {
    /// Open the ledger: load the durable snapshot (if any), migrate it to
    /// the current schema, repair what can be repaired, and hydrate.
    ///
    /// Fails with a migration error for snapshots from newer app versions,
    /// with [`LedgerError::CannotDecrypt`] for a wrong passphrase, and with
    /// [`LedgerError::Integrity`] when hard violations survive repair (the
    /// caller should offer restore-from-backup).
    pub fn open(paths: LedgerPaths, passphrase: Option<&str>) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        let settings = Settings::load_or_create(&paths)?;
        let key = settings.unlock(passphrase)?;
        let store = SnapshotStore::new(
            paths.snapshot_file(),
            paths.backup_dir(),
            settings.backup_retention,
        );

        let snapshot = match store.load(key.as_ref())? {
            Some(raw) => {
                let migrated = migrate(raw)?;
                let (repaired, violations) = repair(migrated);
                let (hard, soft): (Vec<_>, Vec<_>) =
                    violations.into_iter().partition(Violation::is_hard);
                if !hard.is_empty() {
                    return Err(LedgerError::Integrity { violations: hard });
                }
                for violation in soft {
                    warn!(%violation, "snapshot loaded with soft violation");
                }
                repaired
            }
            None => Snapshot::empty(),
        };

        info!(
            accounts = snapshot.accounts.len(),
            transactions = snapshot.transactions.len(),
            encrypted = key.is_some(),
            "ledger opened"
        );

        Ok(Self {
            detector: DuplicateDetector::new(settings.dedupe.clone()),
            paths,
            settings,
            store,
            key,
            snapshot,
        })
    }

    /// Read-only view of the committed state. Export and notification
    /// collaborators consume this; they never write back.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The paths this ledger works under
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// Persist the current committed snapshot.
    ///
    /// The state is serialized synchronously at the call, so what lands on
    /// disk is exactly the commit point at which `flush` was invoked, and
    /// the write itself is atomic.
    pub fn flush(&self) -> LedgerResult<()> {
        self.store.save(&self.snapshot, self.key.as_ref())
    }

    /// Turn on snapshot encryption with the given passphrase and re-save
    /// the snapshot encrypted.
    pub fn enable_encryption(&mut self, passphrase: &str) -> LedgerResult<()> {
        let key = self.settings.enable_encryption(passphrase)?;
        self.settings.save(&self.paths)?;
        self.key = Some(key);
        self.flush()
    }

    /// Run the repair pass over the committed state, returning whatever
    /// violations remain unfixed.
    pub fn run_repair(&mut self) -> Vec<Violation> {
        let (repaired, remaining) = repair(self.snapshot.clone());
        self.snapshot = repaired;
        remaining
    }

    /// Validate `staged`, commit it if no hard violations, and return the
    /// soft ones for the caller to surface.
    pub(crate) fn commit(&mut self, mut staged: Snapshot) -> LedgerResult<Vec<Violation>> {
        staged.recompute_balances();
        let (hard, soft): (Vec<_>, Vec<_>) =
            validate(&staged).into_iter().partition(Violation::is_hard);
        if !hard.is_empty() {
            return Err(LedgerError::Integrity { violations: hard });
        }
        self.snapshot = staged;
        Ok(soft)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// An open ledger over a throwaway directory
    pub fn open_ledger() -> (TempDir, Ledger) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let ledger = Ledger::open(paths, None).unwrap();
        (temp_dir, ledger)
    }
}
