//! Plain records handed across crate boundaries.
//!
//! None of these carry behavior beyond construction; they are the logical
//! shape of what the runtime core hands to (or receives from) its
//! collaborators: descriptor lists for microdata export, stream state for
//! checkpoints, and flat accumulator/measure arrays for persistence.

use serde::{Deserialize, Serialize};

use crate::enums::AttributeType;
use crate::ids::{AccumulatorId, MeasureId, TableId};

/// Name, type and placement of one attribute within an encoded entity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name as declared by the model.
    pub name: String,
    /// Storage type.
    pub type_tag: AttributeType,
    /// Encoded size in bytes.
    pub size: usize,
    /// Byte offset within the encoded row.
    pub offset: usize,
}

/// Complete state of one member's random stream set.
///
/// A small fixed-size vector of integers: restoring it verbatim
/// reproduces the exact subsequent draw sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Multiplier of the draw recurrence.
    pub multiplier: u32,
    /// Current seed of every stream, in stream order.
    pub seeds: Vec<u32>,
}

/// Compiled address of one measure: `"table.measure"` resolves to this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableAddress {
    /// Table index.
    pub table: TableId,
    /// Measure index within the table.
    pub measure: MeasureId,
}

/// Flat accumulator array of one table, keyed for persistence by
/// (table, accumulator, cell index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorBlock {
    /// Owning table.
    pub table: TableId,
    /// Accumulator index within the table.
    pub accumulator: AccumulatorId,
    /// One value per cell, row-major.
    pub values: Vec<f64>,
}

/// Flat measure array of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureBlock {
    /// Owning table.
    pub table: TableId,
    /// Measure index within the table.
    pub measure: MeasureId,
    /// Qualified `"table.measure"` name.
    pub name: String,
    /// Table shape, one extent per dimension.
    pub shape: Vec<usize>,
    /// One value per cell, row-major.
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_state_roundtrip_serde() {
        let state = StreamState {
            multiplier: 16807,
            seeds: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&state).unwrap_or_default();
        let restored: Result<StreamState, _> = serde_json::from_str(&json);
        assert_eq!(restored.ok(), Some(state));
    }

    #[test]
    fn measure_block_serializes_nan_as_null() {
        let block = MeasureBlock {
            table: TableId::new(0),
            measure: MeasureId::new(1),
            name: "t.m".to_owned(),
            shape: vec![1],
            values: vec![f64::NAN],
        };
        let json = serde_json::to_string(&block).unwrap_or_default();
        assert!(json.contains("\"values\":[null]"));
    }
}
