use anyhow::Context;
use clap::{Parser, Subcommand};
use eda_common::EvalError;
use eda_common::db::region::MovableArea;
use eda_common::db::step::{OverflowRecord, PlacementStep};
use eda_common::grid::GridMap;
use eda_common::util::config::Config;
use eda_common::util::{generator, logger, visualization};
use eda_placer::congestion::{CongestionEstimator, ConvPredictor};
use eda_placer::metrics::registry::OverflowOutput;
use eda_placer::metrics::{MetricKey, MetricsSnapshot, OperatorRegistry, SnapshotBuilder};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay dumped placement steps and print one metrics line per step.
    Eval,
    /// Write synthetic placement steps and default predictor weights.
    Generate {
        #[arg(long, default_value_t = 10)]
        steps: usize,
        #[arg(long, default_value_t = 64)]
        bins: usize,
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command.unwrap_or(Commands::Eval) {
        Commands::Generate {
            steps,
            bins,
            output,
        } => {
            let output = output.unwrap_or_else(|| config.input.steps_dir.clone());
            let written = generator::generate_random_steps(
                &output,
                steps,
                bins,
                config.design.total_movable_area,
            )?;
            log::info!("Generated {} steps in {}", written.len(), output);

            let weights = &config.congestion.predictor_weights;
            if Path::new(weights).exists() {
                log::info!("Keeping existing predictor weights: {}", weights);
            } else {
                prepare_output_dir(weights)?;
                default_predictor().save(weights)?;
                log::info!("Wrote default predictor weights: {}", weights);
            }
        }
        Commands::Eval => {
            if let Err(e) = run_evaluation(&config) {
                log::error!("Evaluation failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Smoothed demand channels; macros contribute through their blockage.
fn default_predictor() -> ConvPredictor {
    let blur = |w: f64| {
        let mut k = [w / 16.0; 9];
        for i in [1, 3, 5, 7] {
            k[i] = 2.0 * w / 16.0;
        }
        k[4] = 4.0 * w / 16.0;
        k
    };
    ConvPredictor::new(vec![blur(0.2), blur(0.7), blur(0.4)], 0.0)
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn list_steps(dir: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut steps: Vec<PathBuf> = std::fs::read_dir(dir)
        .context(format!("Failed to read steps directory: {}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    steps.sort();
    Ok(steps)
}

fn step_map(step: &PlacementStep, path: Option<&Path>, name: &str) -> Result<GridMap, EvalError> {
    let path = path.ok_or_else(|| anyhow::anyhow!("step {} has no {}", step.iteration, name))?;
    Ok(step.load_map(path)?)
}

fn overflow_record(
    record: Option<&OverflowRecord>,
    step: &PlacementStep,
    name: &str,
) -> Result<OverflowOutput, EvalError> {
    let record =
        record.ok_or_else(|| anyhow::anyhow!("step {} has no {} record", step.iteration, name))?;
    Ok((record.excess_area.clone(), record.max_density.clone()))
}

/// The predictor is only loaded for `ml_congestion`; `shpwl` alone gets
/// dropped by [`build_registry`] and never reads it.
fn needs_predictor(enabled: &[MetricKey]) -> bool {
    enabled.contains(&MetricKey::MlCongestion)
}

/// Registers the operators that are both enabled and backed by data in this
/// step. `shpwl` is dropped with a warning when its inputs are missing.
fn build_registry<'a>(
    enabled: &[MetricKey],
    step: &PlacementStep,
    estimator: Option<&'a CongestionEstimator<'a, PlacementStep>>,
) -> OperatorRegistry<'a, PlacementStep> {
    let mut registry: OperatorRegistry<'a, PlacementStep> = OperatorRegistry::new();

    for &key in enabled {
        registry = match key {
            MetricKey::Objective if step.objective.is_some() => registry.with_objective(|s| {
                s.objective
                    .ok_or_else(|| anyhow::anyhow!("objective missing").into())
            }),
            MetricKey::Wirelength if step.wirelength.is_some() => {
                registry.with_wirelength(|s| {
                    s.wirelength
                        .ok_or_else(|| anyhow::anyhow!("wirelength missing").into())
                })
            }
            MetricKey::Density if step.density.is_some() => registry.with_density(|s| {
                s.density
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("density missing").into())
            }),
            MetricKey::Hpwl if step.hpwl.is_some() => registry.with_hpwl(|s| {
                s.hpwl.ok_or_else(|| anyhow::anyhow!("hpwl missing").into())
            }),
            MetricKey::RmstWls if step.rmst_wls.is_some() => registry.with_rmst_wls(|s| {
                s.rmst_wls
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("rmst_wls missing").into())
            }),
            MetricKey::Overflow if step.overflow.is_some() => {
                registry.with_overflow(|s| overflow_record(s.overflow.as_ref(), s, "overflow"))
            }
            MetricKey::GOverflow if step.goverflow.is_some() => {
                registry.with_goverflow(|s| overflow_record(s.goverflow.as_ref(), s, "goverflow"))
            }
            MetricKey::RudyUtilization if step.rudy_map.is_some() => registry
                .with_rudy_utilization(|s| step_map(s, s.rudy_map.as_deref(), "rudy_map")),
            MetricKey::PinUtilization if step.pin_map.is_some() => registry
                .with_pin_utilization(|s| step_map(s, s.pin_map.as_deref(), "pin_map")),
            MetricKey::MlCongestion if step.has_congestion_inputs() => match estimator {
                Some(est) => registry.with_ml_congestion(move |s| est.estimate(s)),
                None => registry,
            },
            MetricKey::Shpwl => registry.with_shpwl(),
            _ => registry,
        };
    }

    if registry.validate().is_err() {
        log::warn!(
            "Iteration {}: shpwl needs hpwl and ml_congestion, skipping it",
            step.iteration
        );
        registry.without_shpwl()
    } else {
        registry
    }
}

fn run_evaluation(config: &Config) -> anyhow::Result<()> {
    let enabled = config
        .evaluation
        .metrics
        .iter()
        .map(|name| name.parse::<MetricKey>())
        .collect::<Result<Vec<_>, _>>()?;

    let area = match &config.design.fence_region_areas {
        Some(fence) => {
            MovableArea::with_fence_regions(config.design.total_movable_area, fence.clone())
        }
        None => MovableArea::new(config.design.total_movable_area),
    };

    let estimator = if needs_predictor(&enabled) {
        let predictor = ConvPredictor::from_file(&config.congestion.predictor_weights)
            .context(format!(
                "Failed to load predictor weights '{}'",
                config.congestion.predictor_weights
            ))?;
        Some(CongestionEstimator::new(
            |s: &PlacementStep| step_map(s, s.fixed_node_map.as_deref(), "fixed_node_map"),
            |s: &PlacementStep| step_map(s, s.rudy_map.as_deref(), "rudy_map"),
            |s: &PlacementStep| step_map(s, s.pin_map.as_deref(), "pin_map"),
            Box::new(predictor),
        )?)
    } else {
        None
    };

    let steps = list_steps(&config.input.steps_dir)?;
    if steps.is_empty() {
        log::warn!("No step files found in {}", config.input.steps_dir);
        return Ok(());
    }
    log::info!("Evaluating {} steps from {}", steps.len(), config.input.steps_dir);

    let mut history: Vec<MetricsSnapshot> = Vec::with_capacity(steps.len());
    let mut last_step = None;

    for path in &steps {
        let step = PlacementStep::load(path)?;
        let registry = build_registry(&enabled, &step, estimator.as_ref());

        let mut builder = SnapshotBuilder::new(step.iteration);
        if let Some([outer, middle, inner]) = step.detailed_step {
            builder = builder.detailed_step(outer, middle, inner);
        }
        if let Some(weight) = &step.density_weight {
            builder = builder.density_weight(weight.clone());
        }
        if let Some(gamma) = step.gamma {
            builder = builder.gamma(gamma);
        }

        match builder.evaluate(&registry, &step, &area) {
            Ok(snapshot) => {
                log::info!("{}", snapshot);
                history.push(snapshot);
            }
            Err(e) if e.is_configuration() => {
                return Err(anyhow::anyhow!("Iteration {}: {}", step.iteration, e));
            }
            Err(e) => {
                log::warn!("Iteration {}: skipping step, {}", step.iteration, e);
            }
        }
        last_step = Some(step);
    }

    if let Some(best) = history
        .iter()
        .filter(|s| s.ml_congestion().is_some())
        .min_by(|a, b| {
            let a = a.ml_congestion().unwrap_or(0.0);
            let b = b.ml_congestion().unwrap_or(0.0);
            a.total_cmp(&b)
        })
    {
        log::info!(
            "Lowest MLOverflow {:.6} at iteration {}",
            best.ml_congestion().unwrap_or(0.0),
            best.iteration()
        );
    }

    if let (Some(output), Some(est), Some(step)) =
        (&config.congestion.heatmap_output, &estimator, &last_step)
    {
        if step.has_congestion_inputs() {
            prepare_output_dir(output)?;
            let map = est.estimate(step)?;
            log::info!(
                "Rendering congestion heatmap of iteration {} to {}",
                step.iteration,
                output
            );
            let size = config.congestion.heatmap_size;
            visualization::draw_heatmap(&map, 0, output, size, size)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_only_loaded_for_ml_congestion() {
        assert!(!needs_predictor(&[MetricKey::Hpwl, MetricKey::Shpwl]));
        assert!(needs_predictor(&[MetricKey::MlCongestion]));
        assert!(needs_predictor(&[
            MetricKey::Hpwl,
            MetricKey::MlCongestion,
            MetricKey::Shpwl
        ]));
    }
}
