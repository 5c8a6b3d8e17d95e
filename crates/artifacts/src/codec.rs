//! Bidirectional id⇄index lookup tables built by preprocessing.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::hash::Hash;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use reco_core::{RecoError, RecoResult};

/// Bijective mapping between external ids and dense embedding-row indices
/// `0..N-1`. Immutable after construction.
#[derive(Debug, Clone)]
pub struct IdCodec<Id> {
    to_index: HashMap<Id, usize>,
    to_id: Vec<Id>,
}

impl<Id> IdCodec<Id>
where
    Id: Copy + Eq + Hash + Display,
{
    /// Build a codec from a forward table, validating that the indices are
    /// dense over `0..len` with no duplicates.
    pub fn from_forward(label: &str, to_index: HashMap<Id, usize>) -> RecoResult<Self> {
        let len = to_index.len();
        let mut to_id: Vec<Option<Id>> = vec![None; len];
        for (&id, &index) in &to_index {
            if index >= len {
                return Err(RecoError::ArtifactLoad(format!(
                    "{label} codec: index {index} out of range for {len} entries"
                )));
            }
            if to_id[index].replace(id).is_some() {
                return Err(RecoError::ArtifactLoad(format!(
                    "{label} codec: duplicate index {index}"
                )));
            }
        }
        // Dense + no duplicates + equal counts means every slot is filled.
        let to_id = to_id.into_iter().map(|slot| slot.unwrap()).collect();
        Ok(Self { to_index, to_id })
    }

    /// Load the forward and reverse JSON tables and cross-check that they
    /// are mutually inverse over the same set.
    pub fn load(label: &str, forward_path: &Path, reverse_path: &Path) -> RecoResult<Self>
    where
        Id: DeserializeOwned,
    {
        let forward: HashMap<Id, usize> = read_json(label, forward_path)?;
        let reverse: HashMap<usize, Id> = read_json(label, reverse_path)?;

        if forward.len() != reverse.len() {
            return Err(RecoError::ArtifactLoad(format!(
                "{label} codec: forward table has {} entries, reverse has {}",
                forward.len(),
                reverse.len()
            )));
        }
        for (id, index) in &forward {
            match reverse.get(index) {
                Some(back) if back == id => {}
                _ => {
                    return Err(RecoError::ArtifactLoad(format!(
                        "{label} codec: tables are not mutually inverse at index {index}"
                    )));
                }
            }
        }

        let codec = Self::from_forward(label, forward)?;
        debug!(label, entries = codec.len(), "Codec tables loaded");
        Ok(codec)
    }

    pub fn index_of(&self, id: Id) -> Option<usize> {
        self.to_index.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<Id> {
        self.to_id.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_id.is_empty()
    }
}

fn read_json<T: DeserializeOwned>(label: &str, path: &Path) -> RecoResult<T> {
    let file = File::open(path).map_err(|e| {
        RecoError::ArtifactLoad(format!("{label} codec: cannot open {}: {e}", path.display()))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        RecoError::ArtifactLoad(format!("{label} codec: cannot parse {}: {e}", path.display()))
    })
}
