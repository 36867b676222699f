use eda_common::db::region::RegionValue;
use eda_common::error::EvalError;
use eda_common::grid::GridMap;
use std::fmt;
use std::str::FromStr;

/// Boxed operator evaluated on the current placement variables.
pub type Op<'a, V, T> = Box<dyn Fn(&V) -> Result<T, EvalError> + 'a>;

/// `(excess area, peak density)` as returned by a density-overflow operator.
pub type OverflowOutput = (RegionValue, RegionValue);

/// Closed vocabulary of metrics, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    Objective,
    Wirelength,
    Density,
    Hpwl,
    RmstWls,
    Overflow,
    GOverflow,
    RudyUtilization,
    PinUtilization,
    MlCongestion,
    Shpwl,
}

impl MetricKey {
    pub const ALL: [MetricKey; 11] = [
        MetricKey::Objective,
        MetricKey::Wirelength,
        MetricKey::Density,
        MetricKey::Hpwl,
        MetricKey::RmstWls,
        MetricKey::Overflow,
        MetricKey::GOverflow,
        MetricKey::RudyUtilization,
        MetricKey::PinUtilization,
        MetricKey::MlCongestion,
        MetricKey::Shpwl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKey::Objective => "objective",
            MetricKey::Wirelength => "wirelength",
            MetricKey::Density => "density",
            MetricKey::Hpwl => "hpwl",
            MetricKey::RmstWls => "rmst_wls",
            MetricKey::Overflow => "overflow",
            MetricKey::GOverflow => "goverflow",
            MetricKey::RudyUtilization => "rudy_utilization",
            MetricKey::PinUtilization => "pin_utilization",
            MetricKey::MlCongestion => "ml_congestion",
            MetricKey::Shpwl => "shpwl",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKey {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| EvalError::UnknownMetric(s.to_string()))
    }
}

/// Operators available this step, one optional slot per [`MetricKey`].
/// An empty slot means the metric is not computed; it is never an error.
pub struct OperatorRegistry<'a, V: ?Sized> {
    pub(crate) objective: Option<Op<'a, V, f64>>,
    pub(crate) wirelength: Option<Op<'a, V, f64>>,
    pub(crate) density: Option<Op<'a, V, RegionValue>>,
    pub(crate) hpwl: Option<Op<'a, V, f64>>,
    pub(crate) rmst_wls: Option<Op<'a, V, Vec<f64>>>,
    pub(crate) overflow: Option<Op<'a, V, OverflowOutput>>,
    pub(crate) goverflow: Option<Op<'a, V, OverflowOutput>>,
    pub(crate) rudy_utilization: Option<Op<'a, V, GridMap>>,
    pub(crate) pin_utilization: Option<Op<'a, V, GridMap>>,
    pub(crate) ml_congestion: Option<Op<'a, V, GridMap>>,
    pub(crate) shpwl: bool,
}

impl<V: ?Sized> Default for OperatorRegistry<'_, V> {
    fn default() -> Self {
        Self {
            objective: None,
            wirelength: None,
            density: None,
            hpwl: None,
            rmst_wls: None,
            overflow: None,
            goverflow: None,
            rudy_utilization: None,
            pin_utilization: None,
            ml_congestion: None,
            shpwl: false,
        }
    }
}

impl<'a, V: ?Sized> OperatorRegistry<'a, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objective(mut self, op: impl Fn(&V) -> Result<f64, EvalError> + 'a) -> Self {
        self.objective = Some(Box::new(op));
        self
    }

    pub fn with_wirelength(mut self, op: impl Fn(&V) -> Result<f64, EvalError> + 'a) -> Self {
        self.wirelength = Some(Box::new(op));
        self
    }

    pub fn with_density(
        mut self,
        op: impl Fn(&V) -> Result<RegionValue, EvalError> + 'a,
    ) -> Self {
        self.density = Some(Box::new(op));
        self
    }

    pub fn with_hpwl(mut self, op: impl Fn(&V) -> Result<f64, EvalError> + 'a) -> Self {
        self.hpwl = Some(Box::new(op));
        self
    }

    /// Per-net rectilinear Steiner tree wirelengths; summed when stored.
    pub fn with_rmst_wls(mut self, op: impl Fn(&V) -> Result<Vec<f64>, EvalError> + 'a) -> Self {
        self.rmst_wls = Some(Box::new(op));
        self
    }

    pub fn with_overflow(
        mut self,
        op: impl Fn(&V) -> Result<OverflowOutput, EvalError> + 'a,
    ) -> Self {
        self.overflow = Some(Box::new(op));
        self
    }

    pub fn with_goverflow(
        mut self,
        op: impl Fn(&V) -> Result<OverflowOutput, EvalError> + 'a,
    ) -> Self {
        self.goverflow = Some(Box::new(op));
        self
    }

    pub fn with_rudy_utilization(
        mut self,
        op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
    ) -> Self {
        self.rudy_utilization = Some(Box::new(op));
        self
    }

    pub fn with_pin_utilization(
        mut self,
        op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
    ) -> Self {
        self.pin_utilization = Some(Box::new(op));
        self
    }

    pub fn with_ml_congestion(
        mut self,
        op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
    ) -> Self {
        self.ml_congestion = Some(Box::new(op));
        self
    }

    /// Requests the percentile congestion penalty; needs `hpwl` and
    /// `ml_congestion`.
    pub fn with_shpwl(mut self) -> Self {
        self.shpwl = true;
        self
    }

    pub fn without_shpwl(mut self) -> Self {
        self.shpwl = false;
        self
    }

    pub fn contains(&self, key: MetricKey) -> bool {
        match key {
            MetricKey::Objective => self.objective.is_some(),
            MetricKey::Wirelength => self.wirelength.is_some(),
            MetricKey::Density => self.density.is_some(),
            MetricKey::Hpwl => self.hpwl.is_some(),
            MetricKey::RmstWls => self.rmst_wls.is_some(),
            MetricKey::Overflow => self.overflow.is_some(),
            MetricKey::GOverflow => self.goverflow.is_some(),
            MetricKey::RudyUtilization => self.rudy_utilization.is_some(),
            MetricKey::PinUtilization => self.pin_utilization.is_some(),
            MetricKey::MlCongestion => self.ml_congestion.is_some(),
            MetricKey::Shpwl => self.shpwl,
        }
    }

    pub fn keys(&self) -> Vec<MetricKey> {
        MetricKey::ALL
            .into_iter()
            .filter(|&k| self.contains(k))
            .collect()
    }

    /// Checks cross-metric requirements before any operator runs.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.shpwl {
            if self.hpwl.is_none() {
                return Err(EvalError::MissingDependency {
                    metric: MetricKey::Shpwl.name(),
                    requires: MetricKey::Hpwl.name(),
                });
            }
            if self.ml_congestion.is_none() {
                return Err(EvalError::MissingDependency {
                    metric: MetricKey::Shpwl.name(),
                    requires: MetricKey::MlCongestion.name(),
                });
            }
        }
        Ok(())
    }
}
