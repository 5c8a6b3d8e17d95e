//! Nearest-neighbor search over a normalized embedding matrix.

use reco_artifacts::EmbeddingMatrix;

/// One neighbor hit: corpus row index and its cosine similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub score: f32,
}

/// Rank the corpus rows nearest to the row at `query_index`, best first.
///
/// Rows are unit-norm, so the dot product is cosine similarity. The query's
/// own row is excluded by index — duplicate vectors elsewhere in the corpus
/// stay in. Equal scores keep ascending index order. `query_index` must be
/// a valid row of `corpus` (codec-derived indices always are).
pub fn nearest_neighbors(corpus: &EmbeddingMatrix, query_index: usize, n: usize) -> Vec<Neighbor> {
    if n == 0 {
        return Vec::new();
    }
    let scores = corpus.scores_against(corpus.row(query_index));

    let mut neighbors: Vec<Neighbor> = scores
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != query_index)
        .map(|(index, &score)| Neighbor { index, score })
        .collect();
    neighbors.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(n);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(angles_deg: &[f32]) -> EmbeddingMatrix {
        let rows = angles_deg
            .iter()
            .map(|a| {
                let rad = a.to_radians();
                vec![rad.cos(), rad.sin()]
            })
            .collect();
        EmbeddingMatrix::from_rows("test", rows).unwrap()
    }

    #[test]
    fn test_never_returns_self() {
        let corpus = matrix(&[0.0, 10.0, 20.0, 170.0]);
        for query in 0..4 {
            let neighbors = nearest_neighbors(&corpus, query, 10);
            assert!(neighbors.iter().all(|nb| nb.index != query));
            assert_eq!(neighbors.len(), 3);
        }
    }

    #[test]
    fn test_ranked_by_similarity() {
        let corpus = matrix(&[0.0, 10.0, 20.0, 170.0]);
        let neighbors = nearest_neighbors(&corpus, 0, 3);
        let indices: Vec<usize> = neighbors.iter().map(|nb| nb.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        // Scores are non-increasing.
        for pair in neighbors.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_truncates_to_n() {
        let corpus = matrix(&[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(nearest_neighbors(&corpus, 0, 2).len(), 2);
        assert_eq!(nearest_neighbors(&corpus, 0, 100).len(), 4);
    }

    #[test]
    fn test_n_zero_is_empty() {
        let corpus = matrix(&[0.0, 10.0]);
        assert!(nearest_neighbors(&corpus, 0, 0).is_empty());
    }

    #[test]
    fn test_single_row_corpus_has_no_neighbors() {
        let corpus = matrix(&[0.0]);
        assert!(nearest_neighbors(&corpus, 0, 5).is_empty());
    }

    #[test]
    fn test_duplicate_vectors_kept_and_ties_stable() {
        // All rows identical: every non-self score ties at 1.0, so the
        // result keeps ascending index order.
        let corpus = matrix(&[45.0, 45.0, 45.0, 45.0]);
        let neighbors = nearest_neighbors(&corpus, 1, 10);
        let indices: Vec<usize> = neighbors.iter().map(|nb| nb.index).collect();
        assert_eq!(indices, vec![0, 2, 3]);
    }
}
