use crate::config::ScoreWeights;
use crate::error::SelectionError;
use crate::models::{ScoredUser, UserTotals};

pub fn raw_score(totals: &UserTotals, weights: &ScoreWeights) -> f64 {
    totals.total_actions * weights.ratio_actions + totals.total_volume() * weights.ratio_volume
}

/// Rescale raw scores so the population sums to `total_multiplier`.
pub fn normalize_scores(
    totals: &[UserTotals],
    weights: &ScoreWeights,
) -> Result<Vec<ScoredUser>, SelectionError> {
    let mut raw = Vec::with_capacity(totals.len());
    let mut sum = 0.0;
    for t in totals {
        let score = raw_score(t, weights);
        sum += score;
        if !score.is_finite() || !sum.is_finite() {
            return Err(SelectionError::ScoreOverflow {
                user: t.user_address.clone(),
            });
        }
        raw.push(score);
    }

    if sum <= 0.0 {
        return Err(SelectionError::NoActivity);
    }

    let mass = f64::from(weights.total_multiplier);
    Ok(totals
        .iter()
        .zip(raw)
        .map(|(t, score)| ScoredUser {
            user_address: t.user_address.clone(),
            score: score / sum * mass,
        })
        .collect())
}
