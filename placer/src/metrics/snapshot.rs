use super::derive;
use super::registry::{MetricKey, OperatorRegistry};
use crate::congestion::penalty::{PenaltyEntry, compute_penalties};
use eda_common::db::region::{MovableArea, RegionValue};
use eda_common::error::EvalError;
use eda_common::util::mode::NoGradGuard;
use eda_common::util::profiler::ScopedTimer;
use std::time::Duration;

/// Metric values filled in during one `evaluate` call. Never leaves this
/// module mutable.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MetricValues {
    pub(crate) objective: Option<f64>,
    pub(crate) wirelength: Option<f64>,
    pub(crate) density: Option<RegionValue>,
    pub(crate) density_weight: Option<RegionValue>,
    pub(crate) hpwl: Option<f64>,
    pub(crate) rmst_wl: Option<f64>,
    pub(crate) overflow: Option<RegionValue>,
    pub(crate) max_density: Option<RegionValue>,
    pub(crate) goverflow: Option<f64>,
    pub(crate) gmax_density: Option<f64>,
    pub(crate) rudy_utilization: Option<f64>,
    pub(crate) pin_utilization: Option<f64>,
    pub(crate) ml_congestion: Option<f64>,
    pub(crate) gamma: Option<f64>,
    pub(crate) shpwl: Option<[PenaltyEntry; 4]>,
}

/// Metrics of one optimization step. Built only through
/// [`SnapshotBuilder::evaluate`] and read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSnapshot {
    pub(crate) iteration: u64,
    pub(crate) detailed_step: Option<(usize, usize, usize)>,
    pub(crate) values: MetricValues,
    pub(crate) eval_time: Duration,
}

/// Step identity and driver-supplied scalars, set before evaluation.
#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    iteration: u64,
    detailed_step: Option<(usize, usize, usize)>,
    density_weight: Option<RegionValue>,
    gamma: Option<f64>,
}

impl SnapshotBuilder {
    pub fn new(iteration: u64) -> Self {
        Self {
            iteration,
            ..Default::default()
        }
    }

    /// Outer, middle and inner loop indices of a multi-level schedule.
    pub fn detailed_step(mut self, outer: usize, middle: usize, inner: usize) -> Self {
        self.detailed_step = Some((outer, middle, inner));
        self
    }

    pub fn density_weight(mut self, weight: impl Into<RegionValue>) -> Self {
        self.density_weight = Some(weight.into());
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Runs every registered operator once, in [`MetricKey::ALL`] order, with
    /// gradient tracking off. Any failure aborts the whole snapshot.
    pub fn evaluate<V: ?Sized>(
        self,
        registry: &OperatorRegistry<'_, V>,
        vars: &V,
        area: &MovableArea,
    ) -> Result<MetricsSnapshot, EvalError> {
        let timer = ScopedTimer::new("metrics evaluation");
        registry.validate()?;

        let values = {
            let _no_grad = NoGradGuard::enter();
            let mut m = MetricValues {
                density_weight: self.density_weight,
                gamma: self.gamma,
                ..Default::default()
            };

            if let Some(op) = &registry.objective {
                m.objective = Some(op(vars)?);
            }
            if let Some(op) = &registry.wirelength {
                m.wirelength = Some(op(vars)?);
            }
            if let Some(op) = &registry.density {
                m.density = Some(op(vars)?);
            }
            if let Some(op) = &registry.hpwl {
                m.hpwl = Some(op(vars)?);
            }
            if let Some(op) = &registry.rmst_wls {
                m.rmst_wl = Some(op(vars)?.iter().sum());
            }
            if let Some(op) = &registry.overflow {
                let (excess, max_density) = op(vars)?;
                m.overflow = Some(derive::normalize_overflow(&excess, area)?);
                m.max_density = Some(max_density);
            }
            if let Some(op) = &registry.goverflow {
                let (excess, max_density) = op(vars)?;
                m.goverflow = Some(derive::normalize_global_overflow(&excess, area)?);
                m.gmax_density = Some(
                    max_density
                        .peak()
                        .ok_or(EvalError::EmptyRegions("gmax_density"))?,
                );
            }
            if let Some(op) = &registry.rudy_utilization {
                m.rudy_utilization = Some(derive::zero_if_degenerate(
                    derive::demand_overflow_ratio(op(vars)?, "rudy_utilization"),
                )?);
            }
            if let Some(op) = &registry.pin_utilization {
                m.pin_utilization = Some(derive::zero_if_degenerate(
                    derive::demand_overflow_ratio(op(vars)?, "pin_utilization"),
                )?);
            }
            if let Some(op) = &registry.ml_congestion {
                let congestion_map = op(vars)?;
                // validate() guarantees hpwl was evaluated above.
                if let (true, Some(hpwl)) = (registry.shpwl, m.hpwl) {
                    m.shpwl = Some(compute_penalties(&congestion_map, hpwl));
                }
                m.ml_congestion = Some(derive::zero_if_degenerate(
                    derive::demand_overflow_ratio(congestion_map, "ml_congestion"),
                )?);
            }
            m
        };

        Ok(MetricsSnapshot {
            iteration: self.iteration,
            detailed_step: self.detailed_step,
            values,
            eval_time: timer.elapsed(),
        })
    }
}

impl MetricsSnapshot {
    /// Shorthand for `SnapshotBuilder::new(iteration).evaluate(..)`.
    pub fn evaluate<V: ?Sized>(
        iteration: u64,
        registry: &OperatorRegistry<'_, V>,
        vars: &V,
        area: &MovableArea,
    ) -> Result<Self, EvalError> {
        SnapshotBuilder::new(iteration).evaluate(registry, vars, area)
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }
    pub fn detailed_step(&self) -> Option<(usize, usize, usize)> {
        self.detailed_step
    }
    pub fn eval_time(&self) -> Duration {
        self.eval_time
    }

    pub fn objective(&self) -> Option<f64> {
        self.values.objective
    }
    pub fn wirelength(&self) -> Option<f64> {
        self.values.wirelength
    }
    pub fn density(&self) -> Option<&RegionValue> {
        self.values.density.as_ref()
    }
    pub fn density_weight(&self) -> Option<&RegionValue> {
        self.values.density_weight.as_ref()
    }
    pub fn hpwl(&self) -> Option<f64> {
        self.values.hpwl
    }
    pub fn rmst_wl(&self) -> Option<f64> {
        self.values.rmst_wl
    }
    pub fn overflow(&self) -> Option<&RegionValue> {
        self.values.overflow.as_ref()
    }
    pub fn max_density(&self) -> Option<&RegionValue> {
        self.values.max_density.as_ref()
    }
    pub fn goverflow(&self) -> Option<f64> {
        self.values.goverflow
    }
    pub fn gmax_density(&self) -> Option<f64> {
        self.values.gmax_density
    }
    pub fn rudy_utilization(&self) -> Option<f64> {
        self.values.rudy_utilization
    }
    pub fn pin_utilization(&self) -> Option<f64> {
        self.values.pin_utilization
    }
    pub fn ml_congestion(&self) -> Option<f64> {
        self.values.ml_congestion
    }
    pub fn gamma(&self) -> Option<f64> {
        self.values.gamma
    }
    pub fn shpwl(&self) -> Option<&[PenaltyEntry; 4]> {
        self.values.shpwl.as_ref()
    }

    pub fn contains(&self, key: MetricKey) -> bool {
        let v = &self.values;
        match key {
            MetricKey::Objective => v.objective.is_some(),
            MetricKey::Wirelength => v.wirelength.is_some(),
            MetricKey::Density => v.density.is_some(),
            MetricKey::Hpwl => v.hpwl.is_some(),
            MetricKey::RmstWls => v.rmst_wl.is_some(),
            MetricKey::Overflow => v.overflow.is_some(),
            MetricKey::GOverflow => v.goverflow.is_some(),
            MetricKey::RudyUtilization => v.rudy_utilization.is_some(),
            MetricKey::PinUtilization => v.pin_utilization.is_some(),
            MetricKey::MlCongestion => v.ml_congestion.is_some(),
            MetricKey::Shpwl => v.shpwl.is_some(),
        }
    }

    /// The one-line report; same text as `Display`.
    pub fn format(&self) -> String {
        self.to_string()
    }
}
