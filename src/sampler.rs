use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::error::SelectionError;
use crate::pool::Pool;

/// Draw `k` distinct users from the pool without replacement.
///
/// Each draw picks a uniform index into the remaining entries and removes
/// that entry. Drawing a user already picked discards the entry and does not
/// count toward `k`.
pub fn sample<R: Rng + ?Sized>(
    pool: Pool<'_>,
    k: usize,
    rng: &mut R,
) -> Result<Vec<String>, SelectionError> {
    let available = pool.distinct_users();
    if available < k {
        return Err(SelectionError::InsufficientPool {
            required: k,
            available,
        });
    }

    let mut remaining = pool.into_entries();
    let mut picked: Vec<String> = Vec::with_capacity(k);
    let mut seen: HashSet<&str> = HashSet::with_capacity(k);
    let mut discarded = 0usize;

    while picked.len() < k {
        if remaining.is_empty() {
            return Err(SelectionError::InsufficientPool {
                required: k,
                available: picked.len(),
            });
        }

        let index = rng.gen_range(0..remaining.len());
        let user = remaining.swap_remove(index);
        if seen.insert(user) {
            picked.push(user.to_string());
        } else {
            discarded += 1;
        }
    }

    debug!(picked = picked.len(), discarded, left = remaining.len(), "sampled pool");
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoredUser;
    use crate::pool::build_pool;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scores(weights: &[(&str, f64)]) -> Vec<ScoredUser> {
        weights
            .iter()
            .map(|(user, score)| ScoredUser {
                user_address: user.to_string(),
                score: *score,
            })
            .collect()
    }

    fn population(n: usize) -> Vec<ScoredUser> {
        (0..n)
            .map(|i| ScoredUser {
                user_address: format!("0x{i:03}"),
                score: (i % 7 + 1) as f64,
            })
            .collect()
    }

    #[test]
    fn returns_distinct_users() {
        let scores = population(30);
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample(build_pool(&scores), 10, &mut rng).unwrap();

        assert_eq!(picked.len(), 10);
        let unique: HashSet<&String> = picked.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn fails_when_too_few_distinct_users() {
        let scores = scores(&[("0xaaa", 50.0), ("0xbbb", 50.0)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            sample(build_pool(&scores), 10, &mut rng),
            Err(SelectionError::InsufficientPool {
                required: 10,
                available: 2
            })
        );
    }

    #[test]
    fn takes_every_user_when_k_matches_population() {
        let scores = scores(&[("0xaaa", 40.0), ("0xbbb", 1.0), ("0xccc", 3.0)]);
        let mut rng = StdRng::seed_from_u64(99);
        let mut picked = sample(build_pool(&scores), 3, &mut rng).unwrap();
        picked.sort();
        assert_eq!(picked, vec!["0xaaa", "0xbbb", "0xccc"]);
    }

    #[test]
    fn zero_k_is_empty() {
        let scores = scores(&[("0xaaa", 2.0)]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sample(build_pool(&scores), 0, &mut rng), Ok(Vec::new()));
    }

    #[test]
    fn same_seed_same_selection() {
        let scores = population(25);
        let first = sample(build_pool(&scores), 10, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = sample(build_pool(&scores), 10, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn heavier_users_are_picked_more_often() {
        let scores = scores(&[("0xheavy", 90.0), ("0xlight", 1.0), ("0xmid", 9.0)]);
        let mut rng = StdRng::seed_from_u64(2024);
        let mut heavy_first = 0;
        for _ in 0..2_000 {
            let picked = sample(build_pool(&scores), 1, &mut rng).unwrap();
            if picked[0] == "0xheavy" {
                heavy_first += 1;
            }
        }
        // expected 1800 of 2000
        assert!(heavy_first > 1_650, "heavy user picked {heavy_first} times");
    }

    proptest::proptest! {
        #[test]
        fn never_returns_duplicates(seed in proptest::prelude::any::<u64>(), n in 1usize..40, k in 0usize..40) {
            let scores = population(n);
            let result = sample(build_pool(&scores), k, &mut StdRng::seed_from_u64(seed));
            if k <= n {
                let picked = result.unwrap();
                let unique: HashSet<&String> = picked.iter().collect();
                proptest::prop_assert_eq!(picked.len(), k);
                proptest::prop_assert_eq!(unique.len(), k);
            } else {
                let is_insufficient = matches!(result, Err(SelectionError::InsufficientPool { .. }));
                proptest::prop_assert!(is_insufficient);
            }
        }
    }
}
