//! Retrieval metrics over a distance matrix
//!
//! Each track is used as a query against all other tracks. Candidates are
//! ranked by ascending distance (ties broken by index) and the members of
//! the query's clique are the relevant results.

use acoss_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Cut-off for MT10 and precision at 10
pub const TOP_K: usize = 10;

/// Mean retrieval scores over all evaluable queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean average precision
    pub map: f64,
    /// Mean rank of the first correctly identified cover (1 = best)
    pub mr1: f64,
    /// Mean number of covers in the top 10
    pub mt10: f64,
    /// Mean precision at 10
    pub p_at_10: f64,
    /// Queries with at least one cover in the collection
    pub num_queries: usize,
}

/// Score a square distance matrix against clique labels
///
/// Queries whose clique has no other member are skipped.
///
/// # Examples
/// ```
/// use acoss_bench::evaluation::evaluate;
///
/// let labels = vec!["A".to_string(), "A".to_string(), "B".to_string(), "B".to_string()];
/// let distances = vec![
///     vec![0.0, 0.1, 0.9, 0.8],
///     vec![0.1, 0.0, 0.7, 0.9],
///     vec![0.9, 0.7, 0.0, 0.2],
///     vec![0.8, 0.9, 0.2, 0.0],
/// ];
/// let metrics = evaluate(&distances, &labels).unwrap();
/// assert_eq!(metrics.map, 1.0);
/// assert_eq!(metrics.mr1, 1.0);
/// ```
pub fn evaluate(distances: &[Vec<f64>], labels: &[String]) -> Result<Metrics> {
    let n = labels.len();
    if distances.len() != n || distances.iter().any(|row| row.len() != n) {
        return Err(Error::InvalidInput(format!(
            "Distance matrix must be {}x{} to match the labels",
            n, n
        )));
    }

    let mut totals = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let mut num_queries = 0usize;

    for query in 0..n {
        let mut ranking: Vec<usize> = (0..n).filter(|&j| j != query).collect();
        ranking.sort_by(|&a, &b| {
            distances[query][a]
                .total_cmp(&distances[query][b])
                .then(a.cmp(&b))
        });

        // 1-based ranks of the query's covers
        let cover_ranks: Vec<usize> = ranking
            .iter()
            .enumerate()
            .filter(|(_, &j)| labels[j] == labels[query])
            .map(|(position, _)| position + 1)
            .collect();
        let Some(&first_rank) = cover_ranks.first() else {
            continue;
        };
        num_queries += 1;

        let precision_sum: f64 = cover_ranks
            .iter()
            .enumerate()
            .map(|(hit, &rank)| (hit + 1) as f64 / rank as f64)
            .sum();
        let top_hits = cover_ranks.iter().take_while(|&&rank| rank <= TOP_K).count();

        totals.0 += precision_sum / cover_ranks.len() as f64;
        totals.1 += first_rank as f64;
        totals.2 += top_hits as f64;
        totals.3 += top_hits as f64 / TOP_K as f64;
    }

    if num_queries == 0 {
        return Err(Error::InvalidInput(
            "No query has a cover in the collection".to_string(),
        ));
    }

    let q = num_queries as f64;
    Ok(Metrics {
        map: totals.0 / q,
        mr1: totals.1 / q,
        mt10: totals.2 / q,
        p_at_10: totals.3 / q,
        num_queries,
    })
}
