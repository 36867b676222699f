//! Percentile-based congestion penalty on top of HPWL.
//!
//! The worst `p` fraction of congestion bins is averaged (in percent of
//! nominal capacity) and turned into a wirelength markup
//! `hpwl * (1 + k * 100 * figure)`.

use eda_common::grid::GridMap;
use rayon::prelude::*;

pub const PENALTY_COEFFICIENT: f64 = 0.03;

/// Lower bound applied to each percentile figure, in percent.
pub const CONGESTION_FLOOR: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Percentile {
    pub fraction: f64,
    pub label: &'static str,
}

pub const PERCENTILES: [Percentile; 4] = [
    Percentile {
        fraction: 0.005,
        label: "0.5p",
    },
    Percentile {
        fraction: 0.01,
        label: "1p",
    },
    Percentile {
        fraction: 0.02,
        label: "2p",
    },
    Percentile {
        fraction: 0.05,
        label: "5p",
    },
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenaltyEntry {
    pub percentile: Percentile,
    /// Mean demand of the selected bins, in percent, after the floor.
    pub congestion: f64,
    pub penalized_wirelength: f64,
}

/// Number of top bins averaged for `fraction` of `n` bins. Zero means the
/// whole map is averaged.
fn top_count(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction).floor() as usize
}

fn mean_of_top(sorted: &[f64], count: usize) -> f64 {
    let tail = if count == 0 {
        sorted
    } else {
        &sorted[sorted.len() - count.min(sorted.len())..]
    };
    tail.iter().sum::<f64>() / tail.len() as f64
}

pub fn compute_penalties(congestion_map: &GridMap, hpwl: f64) -> [PenaltyEntry; 4] {
    let mut cells = congestion_map.values().to_vec();
    // Stable sort under the IEEE total order.
    cells.par_sort_by(f64::total_cmp);

    PERCENTILES.map(|percentile| {
        let count = top_count(cells.len(), percentile.fraction);
        let figure = (mean_of_top(&cells, count) * 100.0).max(CONGESTION_FLOOR);
        PenaltyEntry {
            percentile,
            congestion: figure,
            penalized_wirelength: hpwl * (1.0 + PENALTY_COEFFICIENT * 100.0 * figure),
        }
    })
}
