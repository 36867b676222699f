use super::region::RegionValue;
use crate::grid::{GridMap, io};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Density overflow as reported by the placer: total excess area and peak bin
/// density, globally or per fence region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverflowRecord {
    pub excess_area: RegionValue,
    pub max_density: RegionValue,
}

/// Operator outputs of one optimization step, dumped by the placer so that
/// metrics can be replayed offline. Demand maps are stored as separate text
/// files next to the step file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlacementStep {
    pub iteration: u64,
    #[serde(default)]
    pub detailed_step: Option<[usize; 3]>,
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(default)]
    pub wirelength: Option<f64>,
    #[serde(default)]
    pub density: Option<RegionValue>,
    #[serde(default)]
    pub density_weight: Option<RegionValue>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub hpwl: Option<f64>,
    #[serde(default)]
    pub rmst_wls: Option<Vec<f64>>,
    #[serde(default)]
    pub fixed_node_map: Option<PathBuf>,
    #[serde(default)]
    pub rudy_map: Option<PathBuf>,
    #[serde(default)]
    pub pin_map: Option<PathBuf>,
    #[serde(default)]
    pub overflow: Option<OverflowRecord>,
    #[serde(default)]
    pub goverflow: Option<OverflowRecord>,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl PlacementStep {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .context(format!("Failed to read step file: {:?}", path))?;
        let mut step: PlacementStep =
            toml::from_str(&text).context(format!("Invalid step TOML: {:?}", path))?;
        step.base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Ok(step)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string(self)?;
        std::fs::write(path, text).context(format!("Failed to write step file: {:?}", path))?;
        Ok(())
    }

    /// Resolves a map path relative to the directory of the step file and
    /// reads it fresh.
    pub fn load_map(&self, rel: &Path) -> Result<GridMap> {
        io::read_map(self.base_dir.join(rel))
    }

    pub fn has_congestion_inputs(&self) -> bool {
        self.fixed_node_map.is_some() && self.rudy_map.is_some() && self.pin_map.is_some()
    }
}
