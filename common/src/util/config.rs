use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub congestion: CongestionConfig,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationConfig {
    /// Metric names to register. A name being listed is the only enable switch.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CongestionConfig {
    #[serde(default = "default_predictor_weights")]
    pub predictor_weights: String,
    #[serde(default)]
    pub heatmap_output: Option<String>,
    #[serde(default = "default_heatmap_size")]
    pub heatmap_size: u32,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            predictor_weights: default_predictor_weights(),
            heatmap_output: None,
            heatmap_size: default_heatmap_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DesignConfig {
    #[serde(default = "default_total_movable_area")]
    pub total_movable_area: f64,
    #[serde(default)]
    pub fence_region_areas: Option<Vec<f64>>,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            total_movable_area: default_total_movable_area(),
            fence_region_areas: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_steps_dir")]
    pub steps_dir: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            steps_dir: default_steps_dir(),
        }
    }
}

fn default_metrics() -> Vec<String> {
    [
        "objective",
        "wirelength",
        "density",
        "hpwl",
        "overflow",
        "ml_congestion",
        "shpwl",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_predictor_weights() -> String {
    "inputs/predictor.toml".to_string()
}

fn default_heatmap_size() -> u32 {
    800
}

fn default_total_movable_area() -> f64 {
    1.0
}

fn default_steps_dir() -> String {
    "inputs/steps".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.input.steps_dir, "inputs/steps");
        assert!(config.evaluation.metrics.iter().any(|m| m == "shpwl"));
        assert_eq!(config.design.fence_region_areas, None);
    }

    #[test]
    fn partial_sections_override() {
        let config: Config = toml::from_str(
            r#"
            [evaluation]
            metrics = ["hpwl"]

            [design]
            total_movable_area = 250.0
            fence_region_areas = [100.0, 150.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.evaluation.metrics, vec!["hpwl".to_string()]);
        assert_eq!(config.design.total_movable_area, 250.0);
        assert_eq!(config.design.fence_region_areas, Some(vec![100.0, 150.0]));
        assert_eq!(config.congestion.heatmap_size, 800);
    }
}
