//! User-based and content-based candidate generation, and the hybrid
//! re-ranking entry point.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use reco_artifacts::{EmbeddingStore, InteractionCatalog};
use reco_core::config::{AppConfig, RecommendConfig};
use reco_core::types::{Recommendation, UserId};
use reco_core::{RecoError, RecoResult};

use crate::blend::{blend, BlendSource};
use crate::similarity::nearest_neighbors;

/// Query engine over the loaded stores. Stores are immutable and shared;
/// each call allocates its own intermediates, so concurrent queries need
/// no locking.
pub struct RecommenderEngine {
    store: Arc<EmbeddingStore>,
    catalog: Arc<InteractionCatalog>,
    config: RecommendConfig,
}

impl RecommenderEngine {
    pub fn new(
        store: Arc<EmbeddingStore>,
        catalog: Arc<InteractionCatalog>,
        config: RecommendConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Load every artifact from the configured paths and build an engine
    /// ready to serve queries.
    pub fn from_config(config: &AppConfig) -> RecoResult<Self> {
        let store = EmbeddingStore::load(&config.artifacts)?;
        let catalog = InteractionCatalog::load(Path::new(&config.artifacts.interactions_path))?
            .with_preference_percentile(config.recommend.preference_percentile);
        info!("Recommender engine ready");
        Ok(Self::new(
            Arc::new(store),
            Arc::new(catalog),
            config.recommend.clone(),
        ))
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Users nearest to `user_id` in embedding space, nearest first.
    pub fn similar_users(&self, user_id: UserId, n: usize) -> RecoResult<Vec<UserId>> {
        let Some(index) = self.store.user_index(user_id) else {
            return Err(RecoError::UserNotFound(user_id));
        };
        let neighbors = nearest_neighbors(self.store.user_matrix(), index, n);
        Ok(neighbors
            .iter()
            .filter_map(|nb| self.store.user_id_at(nb.index))
            .collect())
    }

    /// Games nearest to `game_name` in embedding space, nearest first,
    /// deduplicated within the result.
    pub fn similar_games(&self, game_name: &str, n: usize) -> RecoResult<Vec<String>> {
        let game_id = self.catalog.game_id_for(game_name)?;
        let Some(index) = self.store.game_index(game_id) else {
            return Err(RecoError::not_found("game embedding", game_id));
        };
        let neighbors = nearest_neighbors(self.store.game_matrix(), index, n);

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for nb in &neighbors {
            let Some(id) = self.store.game_id_at(nb.index) else {
                continue;
            };
            match self.catalog.game_name_for(id) {
                Ok(name) => {
                    if seen.insert(name) {
                        names.push(name.to_string());
                    }
                }
                Err(_) => {
                    warn!(game_id = id, "Embedded game missing from catalog, skipping");
                }
            }
        }
        Ok(names)
    }

    /// User-based collaborative recommendations: aggregate the top-quartile
    /// games of the user's nearest neighbors, score each game by how many
    /// neighbors prefer it, and drop games the user already rates highly.
    pub fn user_recommendations(
        &self,
        user_id: UserId,
        n: usize,
    ) -> RecoResult<Vec<Recommendation>> {
        let neighbors = self.similar_users(user_id, self.config.similar_users)?;
        let own: HashSet<String> = self
            .catalog
            .preferences_for(user_id)
            .into_iter()
            .map(|r| r.game_name)
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();
        for other in neighbors {
            for record in self.catalog.preferences_for(other) {
                if own.contains(&record.game_name) {
                    continue;
                }
                if !counts.contains_key(&record.game_name) {
                    first_seen.push(record.game_name.clone());
                }
                *counts.entry(record.game_name).or_insert(0) += 1;
            }
        }

        let mut recs: Vec<Recommendation> = first_seen
            .into_iter()
            .map(|game| {
                let score = counts[&game] as f64;
                Recommendation { game, score }
            })
            .collect();
        // Stable sort: equal counts keep first-seen order.
        recs.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recs.truncate(n);
        debug!(user_id, count = recs.len(), "User-based candidates ready");
        Ok(recs)
    }

    /// Content-based candidates: nearest games for each of the user's top
    /// seed games, concatenated in seed order. Duplicates across seeds are
    /// kept — the blend rewards a game surfaced by several seeds.
    pub fn content_recommendations(&self, user_id: UserId) -> RecoResult<Vec<String>> {
        let prefs = self.catalog.preferences_for(user_id);
        let mut names = Vec::new();
        for record in prefs.iter().take(self.config.seed_games) {
            match self.similar_games(&record.game_name, self.config.neighbors_per_seed) {
                Ok(similar) => names.extend(similar),
                Err(err) => {
                    warn!(
                        game = %record.game_name,
                        error = %err,
                        "Skipping content seed without a usable embedding"
                    );
                }
            }
        }
        debug!(user_id, count = names.len(), "Content-based candidates ready");
        Ok(names)
    }

    /// Blend the collaborative and content-based sources into one ranked
    /// list. Games the user already rates highly never appear. An unknown
    /// user id yields `UserNotFound`, distinct from an empty result.
    pub fn hybrid_recommendations(
        &self,
        user_id: UserId,
        n: usize,
        user_weight: f64,
        content_weight: f64,
    ) -> RecoResult<Vec<Recommendation>> {
        info!(user_id, n, "Generating hybrid recommendations");

        let user_names: Vec<String> = self
            .user_recommendations(user_id, self.config.user_rec_limit)?
            .into_iter()
            .map(|r| r.game)
            .collect();
        let content_names = self.content_recommendations(user_id)?;

        let known: HashSet<String> = self
            .catalog
            .preferences_for(user_id)
            .into_iter()
            .map(|r| r.game_name)
            .collect();

        // User source first: equal-score ties favor the collaborative list.
        let sources = [
            BlendSource::new(user_names, user_weight),
            BlendSource::new(content_names, content_weight),
        ];
        let mut ranked: Vec<Recommendation> = blend(&sources)
            .into_iter()
            .filter(|(game, _)| !known.contains(game))
            .map(|(game, score)| Recommendation { game, score })
            .collect();
        ranked.truncate(n);

        debug!(user_id, count = ranked.len(), "Hybrid recommendations ready");
        Ok(ranked)
    }

    /// Hybrid recommendations with the configured depth and weights.
    pub fn recommend(&self, user_id: UserId) -> RecoResult<Vec<Recommendation>> {
        self.hybrid_recommendations(
            user_id,
            self.config.top_n,
            self.config.user_weight,
            self.config.content_weight,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_artifacts::{EmbeddingMatrix, IdCodec};
    use reco_core::types::{GameId, InteractionRecord};

    fn unit(angle_deg: f32) -> Vec<f32> {
        let rad = angle_deg.to_radians();
        vec![rad.cos(), rad.sin()]
    }

    fn codec<Id: Copy + Eq + std::hash::Hash + std::fmt::Display>(ids: &[Id]) -> IdCodec<Id> {
        let forward: std::collections::HashMap<Id, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        IdCodec::from_forward("test", forward).unwrap()
    }

    fn record(user_id: UserId, game_id: GameId, name: &str, rating: f32) -> InteractionRecord {
        InteractionRecord {
            user_id,
            game_id,
            game_name: name.to_string(),
            rating,
        }
    }

    /// Eight users at indices 0..8; the query user 103 sits at index 3.
    /// Its nearest neighbors are index 7 (user 107) then index 2 (user 102).
    /// Games: GameZ=1, GameA=2, GameB=3, GameC=4, with GameC closest to
    /// GameZ in game space.
    fn build_engine() -> RecommenderEngine {
        let user_ids: Vec<UserId> = (100..108).collect();
        let user_angles = [90.0, 120.0, 10.0, 0.0, 150.0, 180.0, 210.0, 5.0];
        let users = EmbeddingMatrix::from_rows(
            "users",
            user_angles.iter().map(|&a| unit(a)).collect(),
        )
        .unwrap();

        let game_ids: Vec<GameId> = vec![1, 2, 3, 4];
        let game_angles = [0.0, 90.0, 135.0, 10.0];
        let games = EmbeddingMatrix::from_rows(
            "games",
            game_angles.iter().map(|&a| unit(a)).collect(),
        )
        .unwrap();

        let store =
            EmbeddingStore::from_parts(users, games, codec(&user_ids), codec(&game_ids))
                .unwrap();

        let catalog = InteractionCatalog::from_records(vec![
            // Query user's own library: GameZ is the lone preference.
            record(103, 1, "GameZ", 0.9),
            // Neighbor 107 prefers GameA and GameB.
            record(107, 2, "GameA", 0.8),
            record(107, 3, "GameB", 0.8),
            // Neighbor 102 prefers GameB.
            record(102, 3, "GameB", 0.7),
            // Users consulted only by the cold-start scenario.
            record(104, 4, "GameC", 0.55),
            record(105, 4, "GameC", 0.6),
        ])
        .unwrap();

        let config = RecommendConfig {
            similar_users: 2,
            ..RecommendConfig::default()
        };
        RecommenderEngine::new(Arc::new(store), Arc::new(catalog), config)
    }

    #[test]
    fn test_similar_users_nearest_first() {
        let engine = build_engine();
        let similar = engine.similar_users(103, 2).unwrap();
        assert_eq!(similar, vec![107, 102]);
    }

    #[test]
    fn test_user_recs_count_scoring() {
        // Both neighbors prefer GameB, only one prefers GameA.
        let engine = build_engine();
        let recs = engine.user_recommendations(103, 10).unwrap();
        assert_eq!(recs[0].game, "GameB");
        assert_eq!(recs[0].score, 2.0);
        assert_eq!(recs[1].game, "GameA");
        assert_eq!(recs[1].score, 1.0);
    }

    #[test]
    fn test_user_recs_exclude_own_preferences() {
        let engine = build_engine();
        let recs = engine.user_recommendations(103, 10).unwrap();
        assert!(recs.iter().all(|r| r.game != "GameZ"));
    }

    #[test]
    fn test_similar_games_excludes_seed_itself() {
        let engine = build_engine();
        let similar = engine.similar_games("GameZ", 10).unwrap();
        // Nearest to GameZ (0°) is GameC (10°), then GameA (90°), GameB (135°).
        assert_eq!(similar, vec!["GameC", "GameA", "GameB"]);
    }

    #[test]
    fn test_content_recs_seeded_by_own_preferences() {
        let engine = build_engine();
        let names = engine.content_recommendations(103).unwrap();
        assert_eq!(names, vec!["GameC", "GameA", "GameB"]);
    }

    #[test]
    fn test_hybrid_never_contains_own_preferences() {
        let engine = build_engine();
        let recs = engine.recommend(103).unwrap();
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.game != "GameZ"));
    }

    #[test]
    fn test_hybrid_scores_sum_both_sources() {
        let engine = build_engine();
        let recs = engine
            .hybrid_recommendations(103, 10, 1.0, 0.5)
            .unwrap();
        // User list: [GameB, GameA]; content list: [GameC, GameA, GameB].
        // GameB: 1.0/1 + 0.5/3; GameA: 1.0/2 + 0.5/2; GameC: 0.5/1.
        let scores: HashMap<&str, f64> =
            recs.iter().map(|r| (r.game.as_str(), r.score)).collect();
        assert!((scores["GameB"] - (1.0 + 0.5 / 3.0)).abs() < 1e-9);
        assert!((scores["GameA"] - 0.75).abs() < 1e-9);
        assert!((scores["GameC"] - 0.5).abs() < 1e-9);
        assert_eq!(recs[0].game, "GameB");
    }

    #[test]
    fn test_hybrid_unknown_user_is_typed_sentinel() {
        let engine = build_engine();
        let err = engine.recommend(999).unwrap_err();
        assert!(matches!(err, RecoError::UserNotFound(999)));
    }

    #[test]
    fn test_hybrid_idempotent() {
        let engine = build_engine();
        let first = engine.recommend(103).unwrap();
        let second = engine.recommend(103).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_interaction_user_degrades_to_user_recs() {
        // User 100 has an embedding but no interactions: content source is
        // empty and the hybrid reduces to pure user-based scoring.
        let engine = build_engine();
        assert!(engine.catalog.preferences_for(100).is_empty());
        assert!(engine.content_recommendations(100).unwrap().is_empty());

        let recs = engine.recommend(100).unwrap();
        assert!(!recs.is_empty());
        let user_only: Vec<String> = engine
            .user_recommendations(100, engine.config().user_rec_limit)
            .unwrap()
            .into_iter()
            .map(|r| r.game)
            .collect();
        let hybrid: Vec<String> = recs.into_iter().map(|r| r.game).collect();
        assert_eq!(hybrid, user_only);
    }

    #[test]
    fn test_truncates_to_n() {
        let engine = build_engine();
        let recs = engine.hybrid_recommendations(103, 1, 1.0, 0.5).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].game, "GameB");
    }
}
