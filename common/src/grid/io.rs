use super::map::GridMap;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a single-channel map: an `H W` header line followed by `H` rows of
/// `W` whitespace-separated values. Blank lines and `#` comments are skipped.
pub fn read_map(path: impl AsRef<Path>) -> Result<GridMap> {
    let path = path.as_ref();
    let file = File::open(path).context(format!("Failed to open map file: {:?}", path))?;
    parse_map(BufReader::new(file)).context(format!("Invalid map file: {:?}", path))
}

pub fn parse_map(reader: impl BufRead) -> Result<GridMap> {
    let mut dims: Option<(usize, usize, usize)> = None;
    let mut values = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match dims {
            None => {
                if parts.len() != 2 {
                    bail!("line {}: expected `H W` header", line_no + 1);
                }
                let h: usize = parts[0].parse().context("bad height")?;
                let w: usize = parts[1].parse().context("bad width")?;
                if h == 0 || w == 0 {
                    bail!("line {}: empty grid {}x{}", line_no + 1, h, w);
                }
                let len = h
                    .checked_mul(w)
                    .with_context(|| format!("line {}: grid {}x{} too large", line_no + 1, h, w))?;
                values.reserve(len);
                dims = Some((h, w, len));
            }
            Some((_, w, _)) => {
                if parts.len() != w {
                    bail!(
                        "line {}: expected {} values, found {}",
                        line_no + 1,
                        w,
                        parts.len()
                    );
                }
                for p in parts {
                    let v: f64 = p
                        .parse()
                        .context(format!("line {}: bad value '{}'", line_no + 1, p))?;
                    values.push(v);
                }
            }
        }
    }

    let Some((h, w, len)) = dims else {
        bail!("missing `H W` header");
    };
    if values.len() != len {
        bail!("expected {} rows, found {}", h, values.len() / w);
    }
    Ok(GridMap::from_vec(1, h, w, values)?)
}

/// Writes channel 0 of `map` in the format accepted by [`read_map`].
pub fn write_map(map: &GridMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).context(format!("Failed to create map file: {:?}", path))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{} {}", map.height(), map.width())?;
    for row in map.channel(0).chunks(map.width()) {
        let line: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()?;
    Ok(())
}
