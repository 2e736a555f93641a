use crate::stack::types::Direction;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("Layer {layer} has no neighbor {direction}")]
    MissingNeighbor { layer: String, direction: Direction },

    #[error("Neighbor {direction} of layer {layer} was dropped")]
    NeighborGone { layer: String, direction: Direction },

    #[error("Layer {layer} rejected event: {reason}")]
    Rejected { layer: String, reason: String },
}

pub type StackResult<T> = Result<T, StackError>;
