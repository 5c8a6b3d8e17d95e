//! Artifact loading and the read-only stores the engine queries:
//! id⇄index codecs, normalized embedding matrices, and the merged
//! user–game interaction catalog. Everything here is built once at
//! startup and never mutated afterwards.

pub mod catalog;
pub mod codec;
pub mod embeddings;

pub use catalog::InteractionCatalog;
pub use codec::IdCodec;
pub use embeddings::{EmbeddingMatrix, EmbeddingStore};
