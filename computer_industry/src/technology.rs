//! Technology generations and their frontiers.

use serde::{Deserialize, Serialize};

/// Immutable descriptor of one technology generation.
///
/// The frontier is the corner `(cheap_limit, perf_limit)` of the reachable
/// cost/performance rectangle; `diagonal` is its Euclidean distance from the
/// origin and normalizes distance measures in the adoption rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub label: String,
    /// Cheapness frontier: upper bound on the cheapness index a product on
    /// this technology can reach (higher means cheaper).
    pub cheap_limit: f64,
    /// Performance frontier.
    pub perf_limit: f64,
    /// Euclidean diagonal of the frontier rectangle.
    pub diagonal: f64,
    /// Lower bound of the initial budget drawn by entrants on this
    /// technology.
    pub min_init_budget: f64,
    /// Width of the initial budget draw interval.
    pub init_budget_range: f64,
    /// Number of firms spawned when this technology generation enters.
    pub num_entrants: usize,
}

impl Technology {
    pub fn new(
        label: &str,
        cheap_limit: f64,
        perf_limit: f64,
        min_init_budget: f64,
        init_budget_range: f64,
        num_entrants: usize,
    ) -> Self {
        Technology {
            label: label.to_string(),
            cheap_limit,
            perf_limit,
            diagonal: (cheap_limit * cheap_limit + perf_limit * perf_limit).sqrt(),
            min_init_budget,
            init_budget_range,
            num_entrants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn diagonal_is_euclidean_norm_of_frontier_corner() {
        let tec = Technology::new("TR", 3.0, 4.0, 100.0, 50.0, 10);
        assert_relative_eq!(tec.diagonal, 5.0);
    }
}
