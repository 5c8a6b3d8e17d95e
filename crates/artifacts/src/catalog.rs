//! Merged user–game interaction table and per-user preference queries.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use reco_core::types::{GameId, InteractionRecord, UserId};
use reco_core::{RecoError, RecoResult};

const DEFAULT_PREFERENCE_PERCENTILE: f64 = 75.0;

/// Read-only view over the merged interaction table. Name⇄id resolution is
/// first-occurrence canonical; duplicate (user, game) rows are kept as-is.
#[derive(Debug)]
pub struct InteractionCatalog {
    records: Vec<InteractionRecord>,
    by_user: HashMap<UserId, Vec<usize>>,
    name_by_game: HashMap<GameId, String>,
    id_by_name: HashMap<String, GameId>,
    preference_percentile: f64,
}

impl InteractionCatalog {
    pub fn from_records(records: Vec<InteractionRecord>) -> RecoResult<Self> {
        let mut by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut name_by_game: HashMap<GameId, String> = HashMap::new();
        let mut id_by_name: HashMap<String, GameId> = HashMap::new();

        for (i, record) in records.iter().enumerate() {
            if !(0.0..=1.0).contains(&record.rating) {
                return Err(RecoError::ArtifactLoad(format!(
                    "interaction row {i}: rating {} outside [0, 1]",
                    record.rating
                )));
            }
            by_user.entry(record.user_id).or_default().push(i);
            name_by_game
                .entry(record.game_id)
                .or_insert_with(|| record.game_name.clone());
            id_by_name
                .entry(record.game_name.clone())
                .or_insert(record.game_id);
        }

        Ok(Self {
            records,
            by_user,
            name_by_game,
            id_by_name,
            preference_percentile: DEFAULT_PREFERENCE_PERCENTILE,
        })
    }

    /// Read the merged interaction table (CSV with a
    /// `user_id,game_id,game_name,rating` header).
    pub fn load(path: &Path) -> RecoResult<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            RecoError::ArtifactLoad(format!("interactions: cannot open {}: {e}", path.display()))
        })?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: InteractionRecord = row.map_err(|e| {
                RecoError::ArtifactLoad(format!(
                    "interactions: bad row in {}: {e}",
                    path.display()
                ))
            })?;
            records.push(record);
        }
        let catalog = Self::from_records(records)?;
        info!(
            interactions = catalog.len(),
            users = catalog.user_count(),
            games = catalog.game_count(),
            "Interaction catalog loaded"
        );
        Ok(catalog)
    }

    /// Override the percentile defining each user's preference set.
    pub fn with_preference_percentile(mut self, percentile: f64) -> Self {
        self.preference_percentile = percentile;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn game_count(&self) -> usize {
        self.name_by_game.len()
    }

    /// The user's top-quartile interactions: every record whose rating is at
    /// or above the user's own percentile cutoff, best first. Ties at the
    /// cutoff are included, so a user with one game gets that game back.
    /// Empty for an unknown user — a cold-start signal, not an error.
    pub fn preferences_for(&self, user_id: UserId) -> Vec<InteractionRecord> {
        let Some(rows) = self.by_user.get(&user_id) else {
            return Vec::new();
        };

        let mut ratings: Vec<f32> = rows.iter().map(|&i| self.records[i].rating).collect();
        ratings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let cutoff = percentile(&ratings, self.preference_percentile);

        let mut top: Vec<InteractionRecord> = rows
            .iter()
            .map(|&i| self.records[i].clone())
            .filter(|r| r.rating >= cutoff)
            .collect();
        // Stable sort: equal ratings keep table order.
        top.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top
    }

    pub fn game_name_for(&self, game_id: GameId) -> RecoResult<&str> {
        self.name_by_game
            .get(&game_id)
            .map(String::as_str)
            .ok_or_else(|| RecoError::not_found("game id", game_id))
    }

    pub fn game_id_for(&self, game_name: &str) -> RecoResult<GameId> {
        self.id_by_name
            .get(game_name)
            .copied()
            .ok_or_else(|| RecoError::not_found("game name", game_name))
    }
}

/// Percentile with linear interpolation over an ascending-sorted slice.
fn percentile(sorted: &[f32], pct: f64) -> f32 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let lo_val = sorted[lo] as f64;
    let hi_val = sorted[hi] as f64;
    (lo_val + (hi_val - lo_val) * frac) as f32
}
