use serde::{Deserialize, Serialize};

/// A metric that is either one global scalar or one scalar per fence region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionValue {
    Scalar(f64),
    PerRegion(Vec<f64>),
}

impl RegionValue {
    pub fn num_regions(&self) -> usize {
        match self {
            RegionValue::Scalar(_) => 1,
            RegionValue::PerRegion(v) => v.len(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            RegionValue::Scalar(v) => Some(*v),
            RegionValue::PerRegion(_) => None,
        }
    }

    pub fn total(&self) -> f64 {
        match self {
            RegionValue::Scalar(v) => *v,
            RegionValue::PerRegion(v) => v.iter().sum(),
        }
    }

    /// Largest value; `None` for an empty per-region list.
    pub fn peak(&self) -> Option<f64> {
        match self {
            RegionValue::Scalar(v) => Some(*v),
            RegionValue::PerRegion(v) => v.iter().copied().reduce(f64::max),
        }
    }
}

impl From<f64> for RegionValue {
    fn from(v: f64) -> Self {
        RegionValue::Scalar(v)
    }
}

impl From<Vec<f64>> for RegionValue {
    fn from(v: Vec<f64>) -> Self {
        RegionValue::PerRegion(v)
    }
}

/// Movable-object area used to normalise density overflow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovableArea {
    pub total: f64,
    #[serde(default)]
    pub fence_regions: Option<Vec<f64>>,
}

impl MovableArea {
    pub fn new(total: f64) -> Self {
        Self {
            total,
            fence_regions: None,
        }
    }

    pub fn with_fence_regions(total: f64, fence_regions: Vec<f64>) -> Self {
        Self {
            total,
            fence_regions: Some(fence_regions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_scalar_and_list() {
        #[derive(Deserialize)]
        struct Wrap {
            v: RegionValue,
        }
        let s: Wrap = toml::from_str("v = 0.5").unwrap();
        assert_eq!(s.v, RegionValue::Scalar(0.5));
        let l: Wrap = toml::from_str("v = [0.1, 0.2]").unwrap();
        assert_eq!(l.v, RegionValue::PerRegion(vec![0.1, 0.2]));
    }

    #[test]
    fn total_and_peak() {
        let v = RegionValue::from(vec![1.0, 3.0, 2.0]);
        assert_eq!(v.num_regions(), 3);
        assert_eq!(v.total(), 6.0);
        assert_eq!(v.peak(), Some(3.0));
        assert_eq!(v.as_scalar(), None);
    }

    #[test]
    fn empty_region_list_has_no_peak() {
        let v = RegionValue::PerRegion(Vec::new());
        assert_eq!(v.num_regions(), 0);
        assert_eq!(v.peak(), None);
        assert_eq!(RegionValue::Scalar(-2.0).peak(), Some(-2.0));
    }
}
