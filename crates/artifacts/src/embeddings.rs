//! Normalized embedding matrices and id-aware lookups over them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use tracing::info;

use crate::codec::IdCodec;
use reco_core::config::ArtifactConfig;
use reco_core::types::{GameId, UserId};
use reco_core::{RecoError, RecoResult};

/// Tolerance for the unit-norm row check at load time.
const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Dense matrix of L2-normalized embedding vectors, one row per encoded
/// entity index. The unit-norm invariant is enforced here, once, so query
/// code can treat dot products as cosine similarity.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    rows: Array2<f32>,
}

impl EmbeddingMatrix {
    pub fn new(label: &str, rows: Array2<f32>) -> RecoResult<Self> {
        for (i, row) in rows.rows().into_iter().enumerate() {
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(RecoError::ArtifactLoad(format!(
                    "{label}: row {i} has L2 norm {norm}, expected 1.0"
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn from_rows(label: &str, rows: Vec<Vec<f32>>) -> RecoResult<Self> {
        let count = rows.len();
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if dim == 0 {
            return Err(RecoError::ArtifactLoad(format!(
                "{label}: matrix is empty or has zero-width rows"
            )));
        }
        let mut flat = Vec::with_capacity(count * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(RecoError::ArtifactLoad(format!(
                    "{label}: row {i} has {} values, expected {dim}",
                    row.len()
                )));
            }
            flat.extend(row);
        }
        let rows = Array2::from_shape_vec((count, dim), flat)
            .map_err(|e| RecoError::ArtifactLoad(format!("{label}: {e}")))?;
        Self::new(label, rows)
    }

    /// Read a matrix artifact (JSON array of rows).
    pub fn load(label: &str, path: &Path) -> RecoResult<Self> {
        let file = File::open(path).map_err(|e| {
            RecoError::ArtifactLoad(format!("{label}: cannot open {}: {e}", path.display()))
        })?;
        let rows: Vec<Vec<f32>> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RecoError::ArtifactLoad(format!("{label}: cannot parse {}: {e}", path.display()))
        })?;
        Self::from_rows(label, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.rows.row(index)
    }

    /// Dot product of every row against `query`. Rows are unit-norm, so for
    /// a unit-norm query this is cosine similarity.
    pub fn scores_against(&self, query: ArrayView1<'_, f32>) -> Array1<f32> {
        self.rows.dot(&query)
    }
}

/// Read-only store of user and game embeddings with their codec tables.
/// Loaded once at startup; shared across queries without locking.
#[derive(Debug)]
pub struct EmbeddingStore {
    users: EmbeddingMatrix,
    games: EmbeddingMatrix,
    user_codec: IdCodec<UserId>,
    game_codec: IdCodec<GameId>,
}

impl EmbeddingStore {
    /// Load both matrices and all four codec tables from the configured
    /// paths. Any missing or shape-mismatched artifact is fatal.
    pub fn load(cfg: &ArtifactConfig) -> RecoResult<Self> {
        let users = EmbeddingMatrix::load("user embeddings", Path::new(&cfg.user_embeddings_path))?;
        let games = EmbeddingMatrix::load("game embeddings", Path::new(&cfg.game_embeddings_path))?;
        let user_codec = IdCodec::load(
            "user",
            Path::new(&cfg.user_to_index_path),
            Path::new(&cfg.index_to_user_path),
        )?;
        let game_codec = IdCodec::load(
            "game",
            Path::new(&cfg.game_to_index_path),
            Path::new(&cfg.index_to_game_path),
        )?;
        let store = Self::from_parts(users, games, user_codec, game_codec)?;
        info!(
            users = store.users.len(),
            games = store.games.len(),
            user_dim = store.user_dimension(),
            game_dim = store.game_dimension(),
            "Embedding store loaded"
        );
        Ok(store)
    }

    /// Assemble a store from already-validated parts, checking that each
    /// matrix has exactly one row per codec entry.
    pub fn from_parts(
        users: EmbeddingMatrix,
        games: EmbeddingMatrix,
        user_codec: IdCodec<UserId>,
        game_codec: IdCodec<GameId>,
    ) -> RecoResult<Self> {
        if users.len() != user_codec.len() {
            return Err(RecoError::ArtifactLoad(format!(
                "user embeddings have {} rows but the codec has {} entries",
                users.len(),
                user_codec.len()
            )));
        }
        if games.len() != game_codec.len() {
            return Err(RecoError::ArtifactLoad(format!(
                "game embeddings have {} rows but the codec has {} entries",
                games.len(),
                game_codec.len()
            )));
        }
        Ok(Self {
            users,
            games,
            user_codec,
            game_codec,
        })
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.user_codec.index_of(user_id)
    }

    pub fn game_index(&self, game_id: GameId) -> Option<usize> {
        self.game_codec.index_of(game_id)
    }

    pub fn user_id_at(&self, index: usize) -> Option<UserId> {
        self.user_codec.id_at(index)
    }

    pub fn game_id_at(&self, index: usize) -> Option<GameId> {
        self.game_codec.id_at(index)
    }

    pub fn user_vector(&self, user_id: UserId) -> RecoResult<ArrayView1<'_, f32>> {
        let index = self
            .user_index(user_id)
            .ok_or_else(|| RecoError::not_found("user", user_id))?;
        Ok(self.users.row(index))
    }

    pub fn game_vector(&self, game_id: GameId) -> RecoResult<ArrayView1<'_, f32>> {
        let index = self
            .game_index(game_id)
            .ok_or_else(|| RecoError::not_found("game", game_id))?;
        Ok(self.games.row(index))
    }

    pub fn user_dimension(&self) -> usize {
        self.users.dimension()
    }

    pub fn game_dimension(&self) -> usize {
        self.games.dimension()
    }

    pub fn user_matrix(&self) -> &EmbeddingMatrix {
        &self.users
    }

    pub fn game_matrix(&self) -> &EmbeddingMatrix {
        &self.games
    }
}
