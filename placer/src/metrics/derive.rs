//! Secondary metrics computed from raw operator outputs.

use eda_common::db::region::{MovableArea, RegionValue};
use eda_common::error::EvalError;
use eda_common::grid::GridMap;

/// Denominators at or below this are treated as zero.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Nominal capacity of a normalised demand bin.
pub const NOMINAL_CAPACITY: f64 = 1.0;

pub fn ratio(numerator: f64, denominator: f64, metric: &'static str) -> Result<f64, EvalError> {
    if denominator.abs() <= DEGENERATE_EPSILON {
        return Err(EvalError::NumericDegenerate(metric));
    }
    Ok(numerator / denominator)
}

/// Maps a degenerate ratio to zero: nothing to divide means no load, and no
/// load means no overflow.
pub fn zero_if_degenerate(result: Result<f64, EvalError>) -> Result<f64, EvalError> {
    match result {
        Err(EvalError::NumericDegenerate(metric)) => {
            log::debug!("{}: zero denominator, reporting 0", metric);
            Ok(0.0)
        }
        other => other,
    }
}

/// Excess area over movable area. A scalar excess uses the total movable
/// area; a per-region excess is divided element-wise by the fence-region
/// areas, which must have the same length.
pub fn normalize_overflow(
    excess: &RegionValue,
    area: &MovableArea,
) -> Result<RegionValue, EvalError> {
    match excess {
        RegionValue::Scalar(e) => Ok(RegionValue::Scalar(zero_if_degenerate(ratio(
            *e,
            area.total,
            "overflow",
        ))?)),
        RegionValue::PerRegion(excess) => {
            let fence = area.fence_regions.as_deref().unwrap_or(&[]);
            if fence.len() != excess.len() {
                return Err(EvalError::RegionCountMismatch {
                    excess: excess.len(),
                    areas: fence.len(),
                });
            }
            excess
                .iter()
                .zip(fence)
                .map(|(&e, &a)| zero_if_degenerate(ratio(e, a, "overflow")))
                .collect::<Result<Vec<_>, _>>()
                .map(RegionValue::PerRegion)
        }
    }
}

/// Global overflow: total excess over total movable area, whatever the region
/// decomposition.
pub fn normalize_global_overflow(excess: &RegionValue, area: &MovableArea) -> Result<f64, EvalError> {
    zero_if_degenerate(ratio(excess.total(), area.total, "goverflow"))
}

/// `sum(max(map - 1, 0)) / sum(map)`: the share of total demand above nominal
/// capacity. Consumes the map since the excess is computed in place.
pub fn demand_overflow_ratio(map: GridMap, metric: &'static str) -> Result<f64, EvalError> {
    let total = map.sum();
    if total.abs() <= DEGENERATE_EPSILON {
        return Err(EvalError::NumericDegenerate(metric));
    }
    let excess = map.into_excess(NOMINAL_CAPACITY).sum();
    Ok(excess / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scalar_overflow_uses_total_area() {
        let r = normalize_overflow(&RegionValue::Scalar(200.0), &MovableArea::new(1000.0)).unwrap();
        assert_relative_eq!(r.as_scalar().unwrap(), 0.2);
    }

    #[test]
    fn zero_area_gives_zero_ratio() {
        let r = normalize_overflow(&RegionValue::Scalar(5.0), &MovableArea::new(0.0)).unwrap();
        assert_eq!(r, RegionValue::Scalar(0.0));
    }

    #[test]
    fn per_region_overflow_is_elementwise() {
        let area = MovableArea::with_fence_regions(600.0, vec![100.0, 200.0, 300.0]);
        let r = normalize_overflow(&RegionValue::PerRegion(vec![10.0, 50.0, 0.0]), &area).unwrap();
        let RegionValue::PerRegion(v) = r else {
            panic!("expected per-region ratios");
        };
        assert_relative_eq!(v[0], 0.1);
        assert_relative_eq!(v[1], 0.25);
        assert_relative_eq!(v[2], 0.0);
    }

    #[test]
    fn region_count_mismatch_is_rejected() {
        let area = MovableArea::with_fence_regions(300.0, vec![100.0, 200.0]);
        let err = normalize_overflow(&RegionValue::PerRegion(vec![1.0, 2.0, 3.0]), &area)
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::RegionCountMismatch { excess: 3, areas: 2 }
        ));

        let err = normalize_overflow(&RegionValue::PerRegion(vec![1.0]), &MovableArea::new(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::RegionCountMismatch { excess: 1, areas: 0 }
        ));
    }

    #[test]
    fn global_overflow_ignores_regions() {
        let area = MovableArea::with_fence_regions(400.0, vec![100.0, 300.0]);
        let g = normalize_global_overflow(&RegionValue::PerRegion(vec![20.0, 60.0]), &area).unwrap();
        assert_relative_eq!(g, 0.2);
    }

    #[test]
    fn constant_demand_below_capacity_has_no_overflow() {
        for v in [0.0001, 0.5, 1.0] {
            let r = demand_overflow_ratio(GridMap::filled(1, 8, 8, v), "rudy").unwrap();
            assert_eq!(r, 0.0);
        }
    }

    #[test]
    fn constant_demand_above_capacity() {
        for v in [1.2, 2.0, 7.5] {
            let r = demand_overflow_ratio(GridMap::filled(1, 8, 8, v), "rudy").unwrap();
            assert_relative_eq!(r, (v - 1.0) / v, max_relative = 1e-12);
        }
    }

    #[test]
    fn empty_demand_is_degenerate() {
        let err = demand_overflow_ratio(GridMap::new(1, 4, 4), "pin").unwrap_err();
        assert!(matches!(err, EvalError::NumericDegenerate("pin")));
        assert_eq!(zero_if_degenerate(Err(err)).unwrap(), 0.0);
    }
}
