use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::config::ScoreWeights;
use crate::models::{StoredSlot, UserTotals};
use crate::score;

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSummary {
    pub pool_type: String,
    pub users: usize,
    pub total_volume: f64,
}

pub fn summarize_by_pool(totals: &[UserTotals]) -> Vec<PoolSummary> {
    let mut map: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for user in totals {
        for (pool_type, volume) in &user.volumes {
            let entry = map.entry(pool_type.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += volume;
        }
    }

    let mut summaries: Vec<PoolSummary> = map
        .into_iter()
        .map(|(pool_type, (users, total_volume))| PoolSummary {
            pool_type: pool_type.to_string(),
            users,
            total_volume,
        })
        .collect();

    summaries.sort_by(|a, b| b.total_volume.total_cmp(&a.total_volume));
    summaries
}

pub fn build_report(slot: &StoredSlot, totals: &[UserTotals], weights: &ScoreWeights) -> String {
    let summaries = summarize_by_pool(totals);
    let by_user: HashMap<&str, &UserTotals> = totals
        .iter()
        .map(|t| (t.user_address.as_str(), t))
        .collect();
    let normalized: HashMap<String, f64> = score::normalize_scores(totals, weights)
        .map(|scores| {
            scores
                .into_iter()
                .map(|s| (s.user_address, s.score))
                .collect()
        })
        .unwrap_or_default();

    let mut output = String::new();
    let status = if slot.slot.done { "done" } else { "open" };

    let _ = writeln!(output, "# Assessor Slot Report");
    let _ = writeln!(
        output,
        "Slot {} for {} (week {}, {})",
        slot.id, slot.slot.assessor, slot.slot.week, status
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Period Activity");

    if summaries.is_empty() {
        let _ = writeln!(output, "No totals recorded for this week.");
    } else {
        let _ = writeln!(output, "- {} users with totals", totals.len());
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {:.2} volume across {} users",
                summary.pool_type, summary.total_volume, summary.users
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Assigned Users");

    if slot.slot.users.is_empty() {
        let _ = writeln!(output, "No users assigned to this slot.");
    } else {
        for user in slot.slot.users.iter() {
            match by_user.get(user.as_str()) {
                Some(t) => {
                    let _ = writeln!(
                        output,
                        "- {}: {:.0} actions, {:.2} volume, score {:.2} (raw {:.2})",
                        user,
                        t.total_actions,
                        t.total_volume(),
                        normalized.get(user).copied().unwrap_or(0.0),
                        score::raw_score(t, weights)
                    );
                }
                None => {
                    let _ = writeln!(output, "- {}: no totals for this week", user);
                }
            }
        }
    }

    output
}
