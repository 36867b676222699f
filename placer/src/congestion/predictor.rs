use eda_common::error::EvalError;
use eda_common::grid::GridMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A learned spatial model mapping a stacked `[in_channels, H, W]` input to a
/// `[out_channels, H, W]` output. Callers never look inside.
pub trait SpatialPredictor: Send + Sync {
    fn in_channels(&self) -> usize;
    fn out_channels(&self) -> usize;
    fn predict(&self, input: &GridMap) -> Result<GridMap, EvalError>;
}

const KERNEL_SIZE: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WeightFile {
    in_channels: usize,
    out_channels: usize,
    bias: f64,
    kernels: Vec<Vec<f64>>,
}

/// Single-layer 3x3 convolution, one kernel per input channel, summed into one
/// output channel plus a bias. Borders replicate the edge bins.
#[derive(Clone, Debug)]
pub struct ConvPredictor {
    kernels: Vec<[f64; KERNEL_SIZE * KERNEL_SIZE]>,
    bias: f64,
}

impl ConvPredictor {
    pub fn new(kernels: Vec<[f64; 9]>, bias: f64) -> Self {
        Self { kernels, bias }
    }

    /// Per-channel scaling with no spatial mixing.
    pub fn pointwise(channel_weights: &[f64], bias: f64) -> Self {
        let kernels = channel_weights
            .iter()
            .map(|&w| {
                let mut k = [0.0; 9];
                k[4] = w;
                k
            })
            .collect();
        Self { kernels, bias }
    }

    /// Loads weights once from a TOML file with `in_channels`, `out_channels`,
    /// `bias` and one row-major 3x3 `kernels` entry per input channel.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let predictor = Self::from_toml(&text)?;
        log::info!(
            "Loaded predictor weights from {:?} ({} input channels)",
            path,
            predictor.kernels.len()
        );
        Ok(predictor)
    }

    pub fn from_toml(text: &str) -> Result<Self, EvalError> {
        let file: WeightFile =
            toml::from_str(text).map_err(|e| EvalError::InvalidWeights(e.to_string()))?;

        if file.out_channels != 1 {
            return Err(EvalError::InvalidWeights(format!(
                "out_channels must be 1, got {}",
                file.out_channels
            )));
        }
        if file.in_channels == 0 {
            return Err(EvalError::InvalidWeights(
                "in_channels must be at least 1".to_string(),
            ));
        }
        if file.kernels.len() != file.in_channels {
            return Err(EvalError::InvalidWeights(format!(
                "{} kernels for {} input channels",
                file.kernels.len(),
                file.in_channels
            )));
        }

        let mut kernels = Vec::with_capacity(file.kernels.len());
        for (c, k) in file.kernels.iter().enumerate() {
            let k: [f64; 9] = k.as_slice().try_into().map_err(|_| {
                EvalError::InvalidWeights(format!(
                    "kernel {} has {} taps, expected 9",
                    c,
                    k.len()
                ))
            })?;
            kernels.push(k);
        }

        Ok(Self {
            kernels,
            bias: file.bias,
        })
    }

    pub fn to_toml(&self) -> Result<String, EvalError> {
        let file = WeightFile {
            in_channels: self.kernels.len(),
            out_channels: 1,
            bias: self.bias,
            kernels: self.kernels.iter().map(|k| k.to_vec()).collect(),
        };
        toml::to_string(&file).map_err(|e| EvalError::InvalidWeights(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EvalError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

impl SpatialPredictor for ConvPredictor {
    fn in_channels(&self) -> usize {
        self.kernels.len()
    }

    fn out_channels(&self) -> usize {
        1
    }

    fn predict(&self, input: &GridMap) -> Result<GridMap, EvalError> {
        if input.channels() != self.kernels.len() {
            return Err(EvalError::ChannelMismatch {
                context: "predictor input",
                expected: self.kernels.len(),
                found: input.channels(),
            });
        }

        let (h, w) = input.dims();
        let mut output = GridMap::new(1, h, w);

        output
            .channel_mut(0)
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let mut acc = self.bias;
                    for (c, kernel) in self.kernels.iter().enumerate() {
                        let plane = input.channel(c);
                        for ky in 0..KERNEL_SIZE {
                            let sy = (y + ky).saturating_sub(1).min(h - 1);
                            for kx in 0..KERNEL_SIZE {
                                let sx = (x + kx).saturating_sub(1).min(w - 1);
                                acc += kernel[ky * KERNEL_SIZE + kx] * plane[sy * w + sx];
                            }
                        }
                    }
                    *out = acc;
                }
            });

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WEIGHTS: &str = r#"
        in_channels = 3
        out_channels = 1
        bias = 0.5
        kernels = [
            [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0],
        ]
    "#;

    #[test]
    fn loads_weight_file() {
        let p = ConvPredictor::from_toml(WEIGHTS).unwrap();
        assert_eq!(p.in_channels(), 3);
        assert_eq!(p.out_channels(), 1);

        let input = GridMap::filled(3, 2, 2, 1.0);
        let out = p.predict(&input).unwrap();
        assert_eq!(out.channels(), 1);
        for &v in out.values() {
            assert_relative_eq!(v, 0.5 + 1.0 + 2.0 + 3.0);
        }
    }

    #[test]
    fn rejects_bad_kernel_size() {
        let text = "in_channels = 1\nout_channels = 1\nbias = 0.0\nkernels = [[1.0, 2.0]]\n";
        let err = ConvPredictor::from_toml(text).unwrap_err();
        assert!(matches!(err, EvalError::InvalidWeights(_)));
    }

    #[test]
    fn rejects_kernel_count_mismatch() {
        let text = "in_channels = 3\nout_channels = 1\nbias = 0.0\nkernels = []\n";
        assert!(ConvPredictor::from_toml(text).is_err());
    }

    #[test]
    fn rejects_wrong_output_channels() {
        let text = "in_channels = 0\nout_channels = 2\nbias = 0.0\nkernels = []\n";
        assert!(ConvPredictor::from_toml(text).is_err());
    }

    #[test]
    fn rejects_zero_input_channels() {
        let text = "in_channels = 0\nout_channels = 1\nbias = 0.0\nkernels = []\n";
        let err = ConvPredictor::from_toml(text).unwrap_err();
        assert!(matches!(err, EvalError::InvalidWeights(ref m) if m.contains("in_channels")));
    }

    #[test]
    fn toml_round_trip_keeps_weights() {
        let p = ConvPredictor::from_toml(WEIGHTS).unwrap();
        let q = ConvPredictor::from_toml(&p.to_toml().unwrap()).unwrap();
        assert_eq!(p.kernels, q.kernels);
        assert_eq!(p.bias, q.bias);
    }

    #[test]
    fn box_blur_replicates_edges() {
        let p = ConvPredictor::new(vec![[1.0 / 9.0; 9]], 0.0);
        let input = GridMap::from_vec(1, 1, 3, vec![0.0, 3.0, 6.0]).unwrap();
        let out = p.predict(&input).unwrap();
        // Row 0 is replicated vertically, so each tap column weighs 3/9.
        assert_relative_eq!(out.get(0, 0, 0), (0.0 + 0.0 + 3.0) / 3.0);
        assert_relative_eq!(out.get(0, 0, 1), (0.0 + 3.0 + 6.0) / 3.0);
        assert_relative_eq!(out.get(0, 0, 2), (3.0 + 6.0 + 6.0) / 3.0);
    }

    #[test]
    fn rejects_wrong_input_channels() {
        let p = ConvPredictor::pointwise(&[1.0, 1.0, 1.0], 0.0);
        let err = p.predict(&GridMap::new(2, 2, 2)).unwrap_err();
        assert!(matches!(err, EvalError::ChannelMismatch { expected: 3, found: 2, .. }));
    }
}
