use super::predictor::SpatialPredictor;
use crate::metrics::registry::Op;
use eda_common::error::EvalError;
use eda_common::grid::GridMap;
use eda_common::util::mode::NoGradGuard;

pub const INPUT_CHANNELS: usize = 3;
pub const OUTPUT_CHANNELS: usize = 1;

/// Fuses macro occupancy, wire demand and pin demand into one congestion map
/// through a [`SpatialPredictor`].
///
/// Channel order `[fixed nodes, wire demand, pin demand]` is what the
/// predictor was trained on.
pub struct CongestionEstimator<'a, V: ?Sized> {
    fixed_node_map_op: Op<'a, V, GridMap>,
    wire_demand_op: Op<'a, V, GridMap>,
    pin_demand_op: Op<'a, V, GridMap>,
    predictor: Box<dyn SpatialPredictor + 'a>,
}

impl<'a, V: ?Sized> CongestionEstimator<'a, V> {
    pub fn new(
        fixed_node_map_op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
        wire_demand_op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
        pin_demand_op: impl Fn(&V) -> Result<GridMap, EvalError> + 'a,
        predictor: Box<dyn SpatialPredictor + 'a>,
    ) -> Result<Self, EvalError> {
        if predictor.in_channels() != INPUT_CHANNELS {
            return Err(EvalError::ChannelMismatch {
                context: "predictor input",
                expected: INPUT_CHANNELS,
                found: predictor.in_channels(),
            });
        }
        if predictor.out_channels() != OUTPUT_CHANNELS {
            return Err(EvalError::ChannelMismatch {
                context: "predictor output",
                expected: OUTPUT_CHANNELS,
                found: predictor.out_channels(),
            });
        }

        Ok(Self {
            fixed_node_map_op: Box::new(fixed_node_map_op),
            wire_demand_op: Box::new(wire_demand_op),
            pin_demand_op: Box::new(pin_demand_op),
            predictor,
        })
    }

    pub fn estimate(&self, vars: &V) -> Result<GridMap, EvalError> {
        let _no_grad = NoGradGuard::enter();

        let macro_map = (self.fixed_node_map_op)(vars)?;
        let wire_map = (self.wire_demand_op)(vars)?;
        let pin_map = (self.pin_demand_op)(vars)?;
        let dims = macro_map.dims();

        let input = GridMap::stack(&[macro_map, wire_map, pin_map])?;
        let congestion_map = self.predictor.predict(&input)?;

        if congestion_map.channels() != OUTPUT_CHANNELS {
            return Err(EvalError::ChannelMismatch {
                context: "predictor output",
                expected: OUTPUT_CHANNELS,
                found: congestion_map.channels(),
            });
        }
        if congestion_map.dims() != dims {
            return Err(EvalError::DimensionMismatch {
                context: "predictor output",
                expected: dims,
                found: congestion_map.dims(),
            });
        }

        log::debug!("congestion_sum {}", congestion_map.sum());
        Ok(congestion_map)
    }
}
