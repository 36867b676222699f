use crate::error::EvalError;

/// Dense `[channels, height, width]` array over the placement bin grid.
///
/// Storage is channel-major then row-major, so `channel(c)` is a contiguous
/// `height * width` slice.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMap {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f64>,
}

impl GridMap {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self::filled(channels, height, width, 0.0)
    }

    pub fn filled(channels: usize, height: usize, width: usize, value: f64) -> Self {
        assert!(
            channels > 0 && height > 0 && width > 0,
            "GridMap dimensions must be positive"
        );
        Self {
            channels,
            height,
            width,
            data: vec![value; channels * height * width],
        }
    }

    pub fn from_vec(
        channels: usize,
        height: usize,
        width: usize,
        data: Vec<f64>,
    ) -> Result<Self, EvalError> {
        if channels == 0 || height == 0 || width == 0 || data.len() != channels * height * width {
            return Err(EvalError::ShapeMismatch {
                len: data.len(),
                channels,
                height,
                width,
            });
        }
        Ok(Self {
            channels,
            height,
            width,
            data,
        })
    }

    /// Single-channel map built from a row-major cell function.
    pub fn from_fn(height: usize, width: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut map = Self::new(1, height, width);
        for y in 0..height {
            for x in 0..width {
                map.data[y * width + x] = f(y, x);
            }
        }
        map
    }

    /// Stacks single-channel maps along a new leading channel axis, in the
    /// order given. Every input must share the first map's `(height, width)`.
    pub fn stack(maps: &[GridMap]) -> Result<Self, EvalError> {
        let first = maps.first().ok_or(EvalError::ChannelMismatch {
            context: "stack",
            expected: 1,
            found: 0,
        })?;
        let dims = first.dims();
        let plane = first.plane_len();

        let mut data = Vec::with_capacity(maps.len() * plane);
        for map in maps {
            if map.channels != 1 {
                return Err(EvalError::ChannelMismatch {
                    context: "stack",
                    expected: 1,
                    found: map.channels,
                });
            }
            if map.dims() != dims {
                return Err(EvalError::DimensionMismatch {
                    context: "stack",
                    expected: dims,
                    found: map.dims(),
                });
            }
            data.extend_from_slice(&map.data);
        }

        Ok(Self {
            channels: maps.len(),
            height: dims.0,
            width: dims.1,
            data,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.height * self.width
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    fn index(&self, c: usize, y: usize, x: usize) -> usize {
        c * self.plane_len() + y * self.width + x
    }

    pub fn get(&self, c: usize, y: usize, x: usize) -> f64 {
        self.data[self.index(c, y, x)]
    }

    pub fn set(&mut self, c: usize, y: usize, x: usize, value: f64) {
        let idx = self.index(c, y, x);
        self.data[idx] = value;
    }

    pub fn channel(&self, c: usize) -> &[f64] {
        let plane = self.plane_len();
        &self.data[c * plane..(c + 1) * plane]
    }

    pub fn channel_mut(&mut self, c: usize) -> &mut [f64] {
        let plane = self.plane_len();
        &mut self.data[c * plane..(c + 1) * plane]
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    /// Sequential sum in storage order, so repeated calls agree bit for bit.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Replaces every cell with `max(v - capacity, 0)`. Destroys the demand
    /// values, hence the move.
    pub fn into_excess(mut self, capacity: f64) -> Self {
        for v in self.data.iter_mut() {
            *v = (*v - capacity).max(0.0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = GridMap::from_vec(1, 2, 2, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { len: 3, .. }));
    }

    #[test]
    fn stack_keeps_input_order() {
        let a = GridMap::filled(1, 2, 3, 1.0);
        let b = GridMap::filled(1, 2, 3, 2.0);
        let c = GridMap::filled(1, 2, 3, 3.0);
        let stacked = GridMap::stack(&[a, b, c]).unwrap();

        assert_eq!(stacked.channels(), 3);
        assert_eq!(stacked.dims(), (2, 3));
        assert!(stacked.channel(0).iter().all(|&v| v == 1.0));
        assert!(stacked.channel(1).iter().all(|&v| v == 2.0));
        assert!(stacked.channel(2).iter().all(|&v| v == 3.0));
    }

    #[test]
    fn stack_rejects_mismatched_dims() {
        let a = GridMap::new(1, 4, 4);
        let b = GridMap::new(1, 4, 5);
        let err = GridMap::stack(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::DimensionMismatch {
                expected: (4, 4),
                found: (4, 5),
                ..
            }
        ));
    }

    #[test]
    fn stack_rejects_multichannel_input() {
        let a = GridMap::new(2, 4, 4);
        assert!(GridMap::stack(&[a]).is_err());
    }

    #[test]
    fn excess_clamps_below_capacity() {
        let map = GridMap::from_vec(1, 1, 4, vec![0.5, 1.0, 1.5, 3.0]).unwrap();
        let excess = map.into_excess(1.0);
        assert_eq!(excess.values(), &[0.0, 0.0, 0.5, 2.0]);
    }

    #[test]
    fn indexing_is_channel_major() {
        let mut map = GridMap::new(2, 2, 3);
        map.set(1, 1, 2, 7.0);
        assert_eq!(map.values()[11], 7.0);
        assert_eq!(map.get(1, 1, 2), 7.0);
        assert_eq!(map.max(), 7.0);
    }
}
