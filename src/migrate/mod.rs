//! Forward-only schema migration
//!
//! The persisted snapshot is upgraded as an opaque JSON document before it
//! is ever deserialized into models, so old documents never have to match
//! the current structs. Upgraders are single-step, pure, and set-if-missing,
//! which makes an interrupted run safe to re-execute from the same raw
//! input. Documents from a newer app version are refused outright; there
//! is no lossy downgrade path.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Snapshot, SCHEMA_VERSION};

/// A single-step schema upgrade, tagged with the version it upgrades *from*
struct Upgrader {
    from: u32,
    name: &'static str,
    run: fn(Value) -> LedgerResult<Value>,
}

/// Every upgrade step this build knows about, in chain order.
/// Bump [`SCHEMA_VERSION`] together with a new entry here.
const UPGRADERS: &[Upgrader] = &[
    Upgrader {
        from: 1,
        name: "transaction-flags",
        run: upgrade_transaction_flags,
    },
    Upgrader {
        from: 2,
        name: "currency-and-transfer-groups",
        run: upgrade_currency_and_transfer_groups,
    },
    Upgrader {
        from: 3,
        name: "rule-enabled-and-rollover",
        run: upgrade_rule_enabled_and_rollover,
    },
];

/// Upgrade a raw persisted document to the current schema and deserialize it.
///
/// Fails with [`LedgerError::UnsupportedSchema`] when the document declares
/// a version newer than this build supports, and with
/// [`LedgerError::MissingUpgrader`] when the chain has a gap.
pub fn migrate(raw: Value) -> LedgerResult<Snapshot> {
    migrate_with(UPGRADERS, raw)
}

fn migrate_with(upgraders: &[Upgrader], raw: Value) -> LedgerResult<Snapshot> {
    let declared = raw
        .get("schema_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| LedgerError::Migration("snapshot is missing schema_version".into()))?
        as u32;

    if declared > SCHEMA_VERSION {
        return Err(LedgerError::UnsupportedSchema {
            found: declared,
            latest: SCHEMA_VERSION,
        });
    }
    if declared == 0 {
        return Err(LedgerError::Migration(
            "schema_version 0 is not a valid snapshot version".into(),
        ));
    }

    let mut value = raw;
    for version in declared..SCHEMA_VERSION {
        let upgrader = upgraders
            .iter()
            .find(|u| u.from == version)
            .ok_or(LedgerError::MissingUpgrader { from: version })?;
        debug!(
            from = version,
            to = version + 1,
            step = upgrader.name,
            "applying snapshot upgrade"
        );
        value = (upgrader.run)(value)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("schema_version".into(), json!(version + 1));
        }
    }

    serde_json::from_value(value).map_err(|e| {
        LedgerError::Migration(format!(
            "snapshot does not match schema version {}: {}",
            SCHEMA_VERSION, e
        ))
    })
}

/// v1 -> v2: transactions gain tag, origin, void, and review fields
fn upgrade_transaction_flags(mut value: Value) -> LedgerResult<Value> {
    for txn in entries_mut(&mut value, "transactions") {
        set_if_missing(txn, "tags", json!([]));
        set_if_missing(txn, "origin", json!("manual"));
        set_if_missing(txn, "voided", json!(false));
        set_if_missing(txn, "review", json!(false));
    }
    Ok(value)
}

/// v2 -> v3: accounts and transactions gain a currency; the old
/// `transfer_peer` transaction link becomes a shared `transfer_group` (the
/// lexicographically smaller leg id, so the grouping is deterministic) plus
/// a `counter_account_id` on each leg.
fn upgrade_currency_and_transfer_groups(mut value: Value) -> LedgerResult<Value> {
    for account in entries_mut(&mut value, "accounts") {
        set_if_missing(account, "currency", json!("USD"));
    }

    let mut account_of = std::collections::HashMap::new();
    if let Some(txns) = value.get("transactions").and_then(Value::as_array) {
        for txn in txns.iter().filter_map(Value::as_object) {
            if let (Some(id), Some(account_id)) = (
                txn.get("id").and_then(Value::as_str),
                txn.get("account_id").and_then(Value::as_str),
            ) {
                account_of.insert(id.to_string(), account_id.to_string());
            }
        }
    }

    for txn in entries_mut(&mut value, "transactions") {
        set_if_missing(txn, "currency", json!("USD"));

        let peer_id = txn
            .get("transfer_peer")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(peer_id) = peer_id {
            if !txn.contains_key("transfer_group") {
                let self_id = txn
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let group = if self_id <= peer_id {
                    self_id
                } else {
                    peer_id.clone()
                };
                txn.insert("transfer_group".into(), json!(group));
            }
            if !txn.contains_key("counter_account_id") {
                if let Some(account_id) = account_of.get(&peer_id) {
                    txn.insert("counter_account_id".into(), json!(account_id));
                }
            }
            txn.remove("transfer_peer");
        }
    }
    Ok(value)
}

/// v3 -> v4: rules gain the enabled flag, budgets gain a rollover policy,
/// and the goals collection is introduced
fn upgrade_rule_enabled_and_rollover(mut value: Value) -> LedgerResult<Value> {
    for rule in entries_mut(&mut value, "rules") {
        set_if_missing(rule, "enabled", json!(true));
    }
    for budget in entries_mut(&mut value, "budgets") {
        set_if_missing(budget, "rollover", json!("none"));
    }
    if let Some(obj) = value.as_object_mut() {
        if !obj.contains_key("goals") {
            obj.insert("goals".into(), json!([]));
        }
    }
    Ok(value)
}

fn entries_mut<'a>(
    value: &'a mut Value,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    value
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn set_if_missing(obj: &mut Map<String, Value>, key: &str, default: Value) {
    if !obj.contains_key(key) {
        obj.insert(key.to_string(), default);
    }
}
