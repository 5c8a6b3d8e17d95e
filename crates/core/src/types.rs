use serde::{Deserialize, Serialize};

/// External user id (platform account id).
pub type UserId = u64;

/// External game id (store appid).
pub type GameId = u32;

/// One user–game interaction from the merged table. `rating` is the
/// play-time-derived implicit rating, normalized to [0, 1] upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub game_id: GameId,
    pub game_name: String,
    pub rating: f32,
}

/// One row of a recommendation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub game: String,
    pub score: f64,
}
