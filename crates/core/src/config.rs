use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `GAME_RECO__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
}

/// Paths to the artifacts produced by preprocessing and training:
/// two normalized embedding matrices, four id⇄index codec tables,
/// and the merged interaction table.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_user_embeddings_path")]
    pub user_embeddings_path: String,
    #[serde(default = "default_game_embeddings_path")]
    pub game_embeddings_path: String,
    #[serde(default = "default_user_to_index_path")]
    pub user_to_index_path: String,
    #[serde(default = "default_index_to_user_path")]
    pub index_to_user_path: String,
    #[serde(default = "default_game_to_index_path")]
    pub game_to_index_path: String,
    #[serde(default = "default_index_to_game_path")]
    pub index_to_game_path: String,
    #[serde(default = "default_interactions_path")]
    pub interactions_path: String,
}

/// Tunables for recommendation generation.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendConfig {
    /// Nearest users consulted by the collaborative source.
    #[serde(default = "default_similar_users")]
    pub similar_users: usize,
    /// Depth of the user-based list entering the hybrid blend.
    #[serde(default = "default_user_rec_limit")]
    pub user_rec_limit: usize,
    /// Top preference games used to seed content-based lookups.
    #[serde(default = "default_seed_games")]
    pub seed_games: usize,
    /// Nearest games fetched per content seed.
    #[serde(default = "default_neighbors_per_seed")]
    pub neighbors_per_seed: usize,
    /// Per-user rating percentile defining the preference set.
    #[serde(default = "default_preference_percentile")]
    pub preference_percentile: f64,
    /// Final result depth.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_user_weight")]
    pub user_weight: f64,
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,
}

// Default functions
fn default_user_embeddings_path() -> String {
    "artifacts/weights/user_embeddings.json".to_string()
}
fn default_game_embeddings_path() -> String {
    "artifacts/weights/game_embeddings.json".to_string()
}
fn default_user_to_index_path() -> String {
    "artifacts/processed/user_to_index.json".to_string()
}
fn default_index_to_user_path() -> String {
    "artifacts/processed/index_to_user.json".to_string()
}
fn default_game_to_index_path() -> String {
    "artifacts/processed/game_to_index.json".to_string()
}
fn default_index_to_game_path() -> String {
    "artifacts/processed/index_to_game.json".to_string()
}
fn default_interactions_path() -> String {
    "artifacts/processed/interactions.csv".to_string()
}
fn default_similar_users() -> usize {
    10
}
fn default_user_rec_limit() -> usize {
    20
}
fn default_seed_games() -> usize {
    5
}
fn default_neighbors_per_seed() -> usize {
    10
}
fn default_preference_percentile() -> f64 {
    75.0
}
fn default_top_n() -> usize {
    10
}
fn default_user_weight() -> f64 {
    1.0
}
fn default_content_weight() -> f64 {
    0.5
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            user_embeddings_path: default_user_embeddings_path(),
            game_embeddings_path: default_game_embeddings_path(),
            user_to_index_path: default_user_to_index_path(),
            index_to_user_path: default_index_to_user_path(),
            game_to_index_path: default_game_to_index_path(),
            index_to_game_path: default_index_to_game_path(),
            interactions_path: default_interactions_path(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            similar_users: default_similar_users(),
            user_rec_limit: default_user_rec_limit(),
            seed_games: default_seed_games(),
            neighbors_per_seed: default_neighbors_per_seed(),
            preference_percentile: default_preference_percentile(),
            top_n: default_top_n(),
            user_weight: default_user_weight(),
            content_weight: default_content_weight(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("GAME_RECO")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
