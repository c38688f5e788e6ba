use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One raw activity measurement for a user in a pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySnapshot {
    pub user_address: String,
    pub pool_type: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub action_count_longs: Option<f64>,
    pub action_count_shorts: Option<f64>,
    pub action_count_lps: Option<f64>,
    pub volume_longs: Option<f64>,
    pub volume_shorts: Option<f64>,
    pub volume_lps: Option<f64>,
}

impl ActivitySnapshot {
    pub fn counters(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("action_count_longs", self.action_count_longs),
            ("action_count_shorts", self.action_count_shorts),
            ("action_count_lps", self.action_count_lps),
            ("volume_longs", self.volume_longs),
            ("volume_shorts", self.volume_shorts),
            ("volume_lps", self.volume_lps),
        ]
    }

    pub fn actions(&self) -> f64 {
        self.action_count_longs.unwrap_or(0.0)
            + self.action_count_shorts.unwrap_or(0.0)
            + self.action_count_lps.unwrap_or(0.0)
    }

    pub fn volume(&self) -> f64 {
        self.volume_longs.unwrap_or(0.0)
            + self.volume_shorts.unwrap_or(0.0)
            + self.volume_lps.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTotals {
    pub user_address: String,
    pub week: i32,
    pub total_actions: f64,
    pub volumes: BTreeMap<String, f64>,
}

impl UserTotals {
    pub fn total_volume(&self) -> f64 {
        self.volumes.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredUser {
    pub user_address: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessorSlot {
    pub assessor: String,
    pub week: i32,
    pub done: bool,
    pub users: Vec<String>,
}

/// A slot as held by the slot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSlot {
    pub id: Uuid,
    #[serde(flatten)]
    pub slot: AssessorSlot,
}
