use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SelectionConfig;
use crate::error::SelectionError;
use crate::models::{AssessorSlot, UserTotals};
use crate::pool::build_pool;
use crate::sampler::sample;
use crate::score::normalize_scores;

/// Slot produced by one randomization run, with the pool shape it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub slot: AssessorSlot,
    pub pool_size: usize,
    pub zero_weight: Vec<String>,
}

/// Build an open slot for the assessor.
///
/// `open_slot_week` is the slot store's answer for this assessor: the week of
/// a slot not yet marked done, from any week. The slot is only created when
/// there is none.
pub fn assign_slot(
    assessor: &str,
    week: i32,
    users: Vec<String>,
    open_slot_week: Option<i32>,
) -> Result<AssessorSlot, SelectionError> {
    if assessor.trim().is_empty() {
        return Err(SelectionError::InvalidAssessor);
    }
    if let Some(open_week) = open_slot_week {
        return Err(SelectionError::DuplicateSlot {
            assessor: assessor.to_string(),
            open_week,
        });
    }

    Ok(AssessorSlot {
        assessor: assessor.to_string(),
        week,
        done: false,
        users,
    })
}

/// Score the period's totals, draw `slot_size` users and assign them.
pub fn randomize_assessor_slot<R: Rng + ?Sized>(
    assessor: &str,
    week: i32,
    totals: &[UserTotals],
    config: &SelectionConfig,
    open_slot_week: Option<i32>,
    rng: &mut R,
) -> Result<Assignment, SelectionError> {
    // Nothing is drawn for an assessor that cannot receive a slot.
    let slot = assign_slot(assessor, week, Vec::new(), open_slot_week)?;

    let scores = normalize_scores(totals, &config.weights)?;
    let pool = build_pool(&scores);
    let pool_size = pool.len();
    let zero_weight: Vec<String> = pool.zero_weight().iter().map(|u| u.to_string()).collect();
    if !zero_weight.is_empty() {
        warn!(week, users = zero_weight.len(), "users below one pool entry cannot be selected");
    }

    let users = sample(pool, config.slot_size, rng)?;
    info!(assessor, week, pool_size, users = users.len(), "assessor slot randomized");

    Ok(Assignment {
        slot: AssessorSlot { users, ..slot },
        pool_size,
        zero_weight,
    })
}
