use std::collections::HashSet;

use crate::models::ScoredUser;

/// Weighted multiset of users: each user appears once per whole point of score.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool<'a> {
    entries: Vec<&'a str>,
    zero_weight: Vec<&'a str>,
}

impl<'a> Pool<'a> {
    /// Users whose truncated score is zero and who therefore cannot be drawn.
    pub fn zero_weight(&self) -> &[&'a str] {
        &self.zero_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn distinct_users(&self) -> usize {
        self.entries.iter().collect::<HashSet<_>>().len()
    }

    #[cfg(test)]
    pub fn occurrences(&self, user: &str) -> usize {
        self.entries.iter().filter(|entry| **entry == user).count()
    }

    pub(crate) fn into_entries(self) -> Vec<&'a str> {
        self.entries
    }
}

pub fn entry_count(score: f64) -> usize {
    if score.is_finite() && score >= 1.0 {
        score.floor() as usize
    } else {
        0
    }
}

pub fn build_pool(scores: &[ScoredUser]) -> Pool<'_> {
    let capacity = scores.iter().map(|s| entry_count(s.score)).sum();
    let mut entries = Vec::with_capacity(capacity);
    let mut zero_weight = Vec::new();

    for scored in scores {
        match entry_count(scored.score) {
            0 => zero_weight.push(scored.user_address.as_str()),
            count => entries.extend(std::iter::repeat(scored.user_address.as_str()).take(count)),
        }
    }

    Pool {
        entries,
        zero_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(user: &str, score: f64) -> ScoredUser {
        ScoredUser {
            user_address: user.to_string(),
            score,
        }
    }

    #[test]
    fn entries_follow_truncated_scores() {
        let scores = vec![
            scored("0xaaa", 9.0909),
            scored("0xbbb", 45.4545),
            scored("0xccc", 45.4545),
        ];
        let pool = build_pool(&scores);

        assert_eq!(pool.len(), 99);
        assert_eq!(pool.occurrences("0xaaa"), 9);
        assert_eq!(pool.occurrences("0xbbb"), 45);
        assert_eq!(pool.occurrences("0xccc"), 45);
        assert_eq!(pool.distinct_users(), 3);
        assert!(pool.zero_weight().is_empty());
    }

    #[test]
    fn normalized_three_user_population_pools_nine_and_forty_fives() {
        use crate::config::ScoreWeights;
        use crate::models::UserTotals;
        use crate::score::normalize_scores;

        let population: Vec<UserTotals> = [
            ("0xaaa", 10.0, 0.0),
            ("0xbbb", 0.0, 100.0),
            ("0xccc", 0.0, 100.0),
        ]
        .into_iter()
        .map(|(user, actions, volume)| UserTotals {
            user_address: user.to_string(),
            week: 1,
            total_actions: actions,
            volumes: [("stETH".to_string(), volume)].into_iter().collect(),
        })
        .collect();
        let weights = ScoreWeights {
            ratio_actions: 3.0,
            ratio_volume: 1.5,
            total_multiplier: 100,
        };
        let scores = normalize_scores(&population, &weights).unwrap();
        let pool = build_pool(&scores);

        assert_eq!(pool.occurrences("0xaaa"), 9);
        assert_eq!(pool.occurrences("0xbbb"), 45);
        assert_eq!(pool.occurrences("0xccc"), 45);
        assert_eq!(pool.len(), 99);
        assert!(pool.zero_weight().is_empty());
    }

    #[test]
    fn fractional_users_are_reported_not_pooled() {
        let scores = vec![scored("0xaaa", 99.4), scored("0xbbb", 0.6), scored("0xccc", 0.0)];
        let pool = build_pool(&scores);

        assert_eq!(pool.len(), 99);
        assert_eq!(pool.occurrences("0xbbb"), 0);
        assert_eq!(pool.zero_weight(), &["0xbbb", "0xccc"]);
    }

    #[test]
    fn entry_count_handles_edges() {
        assert_eq!(entry_count(1.0), 1);
        assert_eq!(entry_count(0.999), 0);
        assert_eq!(entry_count(-3.0), 0);
        assert_eq!(entry_count(f64::NAN), 0);
    }

    proptest::proptest! {
        #[test]
        fn pool_size_is_sum_of_floors(raw in proptest::collection::vec(0.0f64..60.0, 0..30)) {
            let scores: Vec<ScoredUser> = raw
                .iter()
                .enumerate()
                .map(|(i, score)| scored(&format!("0x{i:03}"), *score))
                .collect();
            let pool = build_pool(&scores);

            let expected: usize = raw.iter().map(|s| s.floor() as usize).sum();
            proptest::prop_assert_eq!(pool.len(), expected);
            for s in &scores {
                if s.score >= 1.0 {
                    proptest::prop_assert!(pool.occurrences(&s.user_address) >= 1);
                } else {
                    proptest::prop_assert!(pool.zero_weight().contains(&s.user_address.as_str()));
                }
            }
        }
    }
}
