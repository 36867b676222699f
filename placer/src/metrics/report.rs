//! The per-step report line. Field order and precision are fixed; log
//! tooling parses these lines.

use super::snapshot::MetricsSnapshot;
use eda_common::db::region::RegionValue;
use eda_common::util::format::{fixed, sci, sci_list};
use std::fmt::{self, Write};

/// A scalar at `scalar_precision`, or a bracketed list at 3 digits.
fn region(value: &RegionValue, scalar_precision: usize) -> String {
    match value {
        RegionValue::Scalar(v) => sci(*v, scalar_precision),
        RegionValue::PerRegion(v) => sci_list(v, 3),
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.values;
        let mut line = format!("iteration {:4}", self.iteration);

        if let Some((outer, middle, inner)) = self.detailed_step {
            write!(line, ", ({:4}, {:2}, {:2})", outer, middle, inner)?;
        }
        if let Some(x) = v.objective {
            write!(line, ", Obj {}", sci(x, 6))?;
        }
        if let Some(x) = v.wirelength {
            write!(line, ", WL {}", sci(x, 3))?;
        }
        if let Some(x) = &v.density {
            write!(line, ", Density {}", region(x, 3))?;
        }
        if let Some(x) = &v.density_weight {
            write!(line, ", DensityWeight {}", region(x, 6))?;
        }
        if let Some(x) = v.hpwl {
            write!(line, ", HPWL {}", sci(x, 3))?;
        }
        if let Some(x) = v.rmst_wl {
            write!(line, ", RMSTWL {}", sci(x, 3))?;
        }
        if let Some(x) = &v.overflow {
            write!(line, ", Overflow {}", region(x, 6))?;
        }
        if let Some(x) = v.goverflow {
            write!(line, ", Global Overflow {}", sci(x, 6))?;
        }
        if let Some(x) = &v.max_density {
            write!(line, ", MaxDensity {}", region(x, 3))?;
        }
        if let Some(x) = v.rudy_utilization {
            write!(line, ", RUDYOverflow {}", sci(x, 6))?;
        }
        if let Some(x) = v.pin_utilization {
            write!(line, ", PinOverflow {}", sci(x, 6))?;
        }
        if let Some(x) = v.ml_congestion {
            write!(line, ", MLOverflow {}", sci(x, 6))?;
        }
        if let Some(x) = v.gamma {
            write!(line, ", gamma {}", sci(x, 6))?;
        }
        write!(
            line,
            ", time {}ms",
            fixed(self.eval_time.as_secs_f64() * 1000.0, 3)
        )?;
        if let Some(entries) = &v.shpwl {
            let tiers: Vec<String> = entries
                .iter()
                .map(|e| {
                    format!(
                        "{}({}, {})",
                        e.percentile.label,
                        fixed(e.congestion, 3),
                        sci(e.penalized_wirelength, 4)
                    )
                })
                .collect();
            write!(line, ", SHPWL: {}", tiers.join(", "))?;
        }

        f.write_str(&line)
    }
}

#[cfg(test)]
mod tests {
    use crate::metrics::registry::OperatorRegistry;
    use crate::metrics::snapshot::{MetricsSnapshot, SnapshotBuilder};
    use eda_common::db::region::{MovableArea, RegionValue};
    use eda_common::grid::GridMap;

    const LABELS: [&str; 17] = [
        ", Obj ",
        ", WL ",
        ", Density ",
        ", DensityWeight ",
        ", HPWL ",
        ", RMSTWL ",
        ", Overflow ",
        ", Global Overflow ",
        ", MaxDensity ",
        ", RUDYOverflow ",
        ", PinOverflow ",
        ", MLOverflow ",
        ", gamma ",
        ", time ",
        ", SHPWL: ",
        ", (",
        "iteration ",
    ];

    fn strip_time(line: &str) -> String {
        let start = line.find(", time ").unwrap();
        let end = start + line[start..].find("ms").unwrap() + 2;
        format!("{}{}", &line[..start], &line[end..])
    }

    #[test]
    fn full_line_order_and_precision() {
        let registry = OperatorRegistry::<()>::new()
            .with_objective(|_| Ok(1234.5))
            .with_wirelength(|_| Ok(1000.0))
            .with_density(|_| Ok(RegionValue::Scalar(0.25)))
            .with_hpwl(|_| Ok(5.0e6))
            .with_rmst_wls(|_| Ok(vec![1.0e3, 2.0e3]))
            .with_overflow(|_| Ok((RegionValue::Scalar(200.0), RegionValue::Scalar(0.8))))
            .with_goverflow(|_| Ok((RegionValue::Scalar(100.0), RegionValue::Scalar(0.9))))
            .with_rudy_utilization(|_| Ok(GridMap::filled(1, 2, 2, 2.0)))
            .with_pin_utilization(|_| Ok(GridMap::filled(1, 2, 2, 0.5)))
            .with_ml_congestion(|_| Ok(GridMap::filled(1, 10, 10, 1.2)))
            .with_shpwl();
        let snap = SnapshotBuilder::new(7)
            .detailed_step(1, 2, 3)
            .density_weight(8.0e-5)
            .gamma(4.0)
            .evaluate(&registry, &(), &MovableArea::new(1000.0))
            .unwrap();

        let line = snap.format();
        assert!(line.contains(", time "));
        assert!(line.split(", time ").nth(1).unwrap().contains("ms"));

        let tier = "(120.000, 1.8050E+09)";
        let expected = format!(
            "iteration    7, (   1,  2,  3), Obj 1.234500E+03, WL 1.000E+03, \
             Density 2.500E-01, DensityWeight 8.000000E-05, HPWL 5.000E+06, \
             RMSTWL 3.000E+03, Overflow 2.000000E-01, Global Overflow 1.000000E-01, \
             MaxDensity 8.000E-01, RUDYOverflow 5.000000E-01, PinOverflow 0.000000E+00, \
             MLOverflow 1.666667E-01, gamma 4.000000E+00, \
             SHPWL: 0.5p{t}, 1p{t}, 2p{t}, 5p{t}",
            t = tier
        );
        assert_eq!(strip_time(&line), expected);
    }

    #[test]
    fn per_region_values_render_as_lists() {
        let registry = OperatorRegistry::<()>::new().with_overflow(|_| {
            Ok((
                RegionValue::PerRegion(vec![10.0, 30.0]),
                RegionValue::PerRegion(vec![1.5, 2.0]),
            ))
        });
        let area = MovableArea::with_fence_regions(300.0, vec![100.0, 200.0]);
        let line = MetricsSnapshot::evaluate(12, &registry, &(), &area)
            .unwrap()
            .format();

        assert!(line.starts_with("iteration   12, Overflow [1.000E-01, 1.500E-01], "));
        assert!(line.contains(", MaxDensity [1.500E+00, 2.000E+00], time "));
    }

    #[test]
    fn absent_metrics_leave_no_trace() {
        let registry = OperatorRegistry::<()>::new()
            .with_hpwl(|_| Ok(2.0))
            .with_ml_congestion(|_| Ok(GridMap::filled(1, 2, 2, 1.0)));
        let line = MetricsSnapshot::evaluate(0, &registry, &(), &MovableArea::new(1.0))
            .unwrap()
            .format();

        let present = [", HPWL ", ", MLOverflow ", ", time ", "iteration "];
        for label in LABELS {
            assert_eq!(line.contains(label), present.contains(&label), "{}", label);
        }
        let hpwl = line.find(", HPWL ").unwrap();
        let ml = line.find(", MLOverflow ").unwrap();
        assert!(hpwl < ml);
        assert!(!line.contains(", ,"));
        assert!(line.ends_with("ms"));
    }

    #[test]
    fn empty_registry_still_reports_time() {
        let snap =
            MetricsSnapshot::evaluate(3, &OperatorRegistry::<()>::new(), &(), &MovableArea::new(1.0))
                .unwrap();
        let line = snap.format();
        assert!(line.starts_with("iteration    3, time "));
        assert_eq!(line, snap.to_string());
    }
}
