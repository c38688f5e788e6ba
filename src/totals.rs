use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SelectionError;
use crate::models::{ActivitySnapshot, UserTotals};

/// Collapse a period's snapshots into one totals record per user.
///
/// For each (user, pool) the snapshot with the latest timestamp is canonical;
/// on equal timestamps the earliest one in input order is kept. Snapshots
/// without a pool or timestamp never become canonical but still register
/// their user, who then receives zero totals if nothing else is recorded.
pub fn aggregate_totals(
    snapshots: &[ActivitySnapshot],
    week: i32,
) -> Result<Vec<UserTotals>, SelectionError> {
    let mut latest: BTreeMap<&str, BTreeMap<&str, &ActivitySnapshot>> = BTreeMap::new();

    for snapshot in snapshots {
        validate_snapshot(snapshot)?;
        let per_pool = latest.entry(snapshot.user_address.as_str()).or_default();

        let (Some(pool_type), Some(timestamp)) = (&snapshot.pool_type, snapshot.timestamp) else {
            debug!(user = %snapshot.user_address, "snapshot without pool or timestamp skipped");
            continue;
        };

        per_pool
            .entry(pool_type.as_str())
            .and_modify(|current| {
                if current.timestamp.is_some_and(|seen| timestamp > seen) {
                    *current = snapshot;
                }
            })
            .or_insert(snapshot);
    }

    let totals = latest
        .into_iter()
        .map(|(user_address, per_pool)| {
            let mut total_actions = 0.0;
            let mut volumes = BTreeMap::new();
            for (pool_type, snapshot) in per_pool {
                total_actions += snapshot.actions();
                volumes.insert(pool_type.to_string(), snapshot.volume());
            }
            UserTotals {
                user_address: user_address.to_string(),
                week,
                total_actions,
                volumes,
            }
        })
        .collect::<Vec<_>>();

    debug!(week, users = totals.len(), snapshots = snapshots.len(), "aggregated totals");
    Ok(totals)
}

fn validate_snapshot(snapshot: &ActivitySnapshot) -> Result<(), SelectionError> {
    if snapshot.user_address.trim().is_empty() {
        return Err(SelectionError::Aggregation {
            user: snapshot.user_address.clone(),
            reason: "empty user address".to_string(),
        });
    }

    for (field, value) in snapshot.counters() {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                return Err(SelectionError::Aggregation {
                    user: snapshot.user_address.clone(),
                    reason: format!("{field} is {value}"),
                });
            }
        }
    }

    Ok(())
}
