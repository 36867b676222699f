use crate::db::region::RegionValue;
use crate::db::step::{OverflowRecord, PlacementStep};
use crate::grid::{GridMap, io};
use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Writes `num_steps` synthetic placement steps into `dir`, mimicking a
/// global placement run: overflow shrinks while HPWL grows and routing demand
/// concentrates in a few hotspots.
pub fn generate_random_steps(
    dir: &str,
    num_steps: usize,
    bins: usize,
    total_movable_area: f64,
) -> Result<Vec<PathBuf>> {
    let dir = Path::new(dir);
    std::fs::create_dir_all(dir).context(format!("Failed to create {:?}", dir))?;
    let mut rng = rand::thread_rng();
    let bins = bins.max(1);

    log::info!(
        "Generating {} synthetic steps on a {}x{} bin grid",
        num_steps,
        bins,
        bins
    );

    // Macros stay put for the whole run.
    let macro_map = GridMap::from_fn(bins, bins, |y, x| {
        if y < bins / 4 && x < bins / 3 { 1.0 } else { 0.0 }
    });
    let macro_name = "fixed_node.map";
    io::write_map(&macro_map, dir.join(macro_name))?;

    let hotspots: Vec<(f64, f64)> = (0..3)
        .map(|_| (rng.gen_range(0.0..bins as f64), rng.gen_range(0.0..bins as f64)))
        .collect();

    let mut paths = Vec::with_capacity(num_steps);
    for k in 0..num_steps {
        let progress = (k + 1) as f64 / num_steps.max(1) as f64;
        let spread = bins as f64 * (0.5 - 0.35 * progress).max(0.05);

        let rudy = GridMap::from_fn(bins, bins, |y, x| {
            let heat: f64 = hotspots
                .iter()
                .map(|&(hy, hx)| {
                    let d2 = (y as f64 - hy).powi(2) + (x as f64 - hx).powi(2);
                    (-d2 / (2.0 * spread * spread)).exp()
                })
                .sum();
            0.3 + 0.9 * heat * progress
        });
        let pins = GridMap::from_fn(bins, bins, |y, x| 0.8 * rudy.get(0, y, x));

        let rudy_name = format!("rudy_{:04}.map", k);
        let pin_name = format!("pin_{:04}.map", k);
        io::write_map(&rudy, dir.join(&rudy_name))?;
        io::write_map(&pins, dir.join(&pin_name))?;

        let hpwl = 1.0e6 * (1.0 + 0.5 * progress) * rng.gen_range(0.98..1.02);
        let overflow = (0.9 * (1.0 - progress)).max(0.07);

        let mut step = PlacementStep::default();
        step.iteration = (k * 100) as u64;
        step.objective = Some(hpwl * 1.1);
        step.wirelength = Some(hpwl * 1.05);
        step.density = Some(RegionValue::Scalar(overflow * total_movable_area));
        step.density_weight = Some(RegionValue::Scalar(8e-5 * 1.05f64.powi(k as i32)));
        step.gamma = Some(4.0 * (1.0 - 0.5 * progress));
        step.hpwl = Some(hpwl);
        step.overflow = Some(OverflowRecord {
            excess_area: RegionValue::Scalar(overflow * total_movable_area),
            max_density: RegionValue::Scalar(1.0 + 3.0 * overflow),
        });
        step.fixed_node_map = Some(PathBuf::from(macro_name));
        step.rudy_map = Some(PathBuf::from(rudy_name));
        step.pin_map = Some(PathBuf::from(pin_name));

        let path = dir.join(format!("step_{:04}.toml", k));
        step.save(&path)?;
        paths.push(path);
    }

    Ok(paths)
}
