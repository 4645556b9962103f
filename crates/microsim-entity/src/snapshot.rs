//! Attribute descriptor lists and row encoding for microdata export.
//!
//! Export code never knows an entity's concrete type. It receives a
//! [`SnapshotLayout`] (name, type tag, byte size and byte offset per
//! attribute) together with fixed-size rows encoded from
//! [`AttributeValue`]s, and formats any attribute generically from those.
//! Values are packed back to back in little-endian order.

use std::fmt;

use microsim_types::{AttributeDescriptor, AttributeType};
use serde::{Deserialize, Serialize};

use crate::error::EntityError;

/// One attribute value tagged with its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer value.
    Int(i32),
    /// 64-bit integer value.
    Long(i64),
    /// 32-bit float value.
    Float(f32),
    /// 64-bit float value.
    Double(f64),
}

impl AttributeValue {
    /// Storage type of the value.
    pub const fn type_tag(&self) -> AttributeType {
        match self {
            Self::Bool(_) => AttributeType::Bool,
            Self::Int(_) => AttributeType::Int,
            Self::Long(_) => AttributeType::Long,
            Self::Float(_) => AttributeType::Float,
            Self::Double(_) => AttributeType::Double,
        }
    }

    /// Value widened to `f64`, booleans as 0 or 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Bool(v) => f64::from(u8::from(v)),
            Self::Int(v) => f64::from(v),
            Self::Long(v) => v as f64,
            Self::Float(v) => f64::from(v),
            Self::Double(v) => v,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Self::Bool(v) => out.push(u8::from(v)),
            Self::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn decode(type_tag: AttributeType, bytes: &[u8]) -> Option<Self> {
        Some(match type_tag {
            AttributeType::Bool => Self::Bool(*bytes.first()? != 0),
            AttributeType::Int => Self::Int(i32::from_le_bytes(bytes.try_into().ok()?)),
            AttributeType::Long => Self::Long(i64::from_le_bytes(bytes.try_into().ok()?)),
            AttributeType::Float => Self::Float(f32::from_le_bytes(bytes.try_into().ok()?)),
            AttributeType::Double => Self::Double(f64::from_le_bytes(bytes.try_into().ok()?)),
        })
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", u8::from(*v)),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

/// Entity types that can hand their exported attributes to microdata output.
pub trait Microdata {
    /// Values of the exported attributes, in layout order.
    fn microdata(&self) -> Vec<AttributeValue>;
}

/// Descriptor list and row size for one entity type's exported attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLayout {
    descriptors: Vec<AttributeDescriptor>,
    row_size: usize,
}

impl SnapshotLayout {
    /// Build a packed layout from attribute names and types.
    pub fn new(fields: &[(&str, AttributeType)]) -> Self {
        let mut offset = 0_usize;
        let descriptors = fields
            .iter()
            .map(|(name, type_tag)| {
                let size = type_tag.byte_size();
                let descriptor = AttributeDescriptor {
                    name: (*name).to_owned(),
                    type_tag: *type_tag,
                    size,
                    offset,
                };
                offset = offset.saturating_add(size);
                descriptor
            })
            .collect();
        Self {
            descriptors,
            row_size: offset,
        }
    }

    /// Descriptor of every exported attribute.
    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }

    /// Size in bytes of one encoded row.
    pub const fn row_size(&self) -> usize {
        self.row_size
    }

    /// Encode one row.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::SnapshotArity`] if the value count differs
    /// from the layout, or [`EntityError::SnapshotTypeMismatch`] if a value
    /// has the wrong type.
    pub fn encode(&self, values: &[AttributeValue]) -> Result<Vec<u8>, EntityError> {
        if values.len() != self.descriptors.len() {
            return Err(EntityError::SnapshotArity {
                expected: self.descriptors.len(),
                actual: values.len(),
            });
        }
        let mut row = Vec::with_capacity(self.row_size);
        for (descriptor, value) in self.descriptors.iter().zip(values) {
            if value.type_tag() != descriptor.type_tag {
                return Err(EntityError::SnapshotTypeMismatch {
                    name: descriptor.name.clone(),
                    expected: descriptor.type_tag,
                    actual: value.type_tag(),
                });
            }
            value.encode_into(&mut row);
        }
        Ok(row)
    }

    /// Encode the exported attributes of `entity`.
    ///
    /// # Errors
    ///
    /// See [`Self::encode`].
    pub fn encode_entity<E: Microdata>(&self, entity: &E) -> Result<Vec<u8>, EntityError> {
        self.encode(&entity.microdata())
    }

    /// Decode one row.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::SnapshotLength`] if the row is not exactly
    /// [`Self::row_size`] bytes.
    pub fn decode(&self, row: &[u8]) -> Result<Vec<AttributeValue>, EntityError> {
        let length_error = || EntityError::SnapshotLength {
            expected: self.row_size,
            actual: row.len(),
        };
        if row.len() != self.row_size {
            return Err(length_error());
        }
        self.descriptors
            .iter()
            .map(|d| {
                let end = d.offset.checked_add(d.size).ok_or_else(length_error)?;
                row.get(d.offset..end)
                    .and_then(|bytes| AttributeValue::decode(d.type_tag, bytes))
                    .ok_or_else(length_error)
            })
            .collect()
    }

    /// Column names joined by `separator`.
    pub fn header(&self, separator: &str) -> String {
        self.descriptors
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Decode one row and join its formatted values with `separator`.
    ///
    /// # Errors
    ///
    /// See [`Self::decode`].
    pub fn format_row(&self, row: &[u8], separator: &str) -> Result<String, EntityError> {
        Ok(self
            .decode(row)?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn layout() -> SnapshotLayout {
        SnapshotLayout::new(&[
            ("alive", AttributeType::Bool),
            ("age", AttributeType::Int),
            ("income", AttributeType::Double),
        ])
    }

    #[test]
    fn offsets_are_packed() {
        let layout = layout();
        let offsets: Vec<usize> = layout.descriptors().iter().map(|d| d.offset).collect();
        assert_eq!(offsets, vec![0, 1, 5]);
        assert_eq!(layout.row_size(), 13);
        assert_eq!(layout.header(","), "alive,age,income");
    }

    #[test]
    fn rows_decode_to_encoded_values() {
        let layout = layout();
        let values = [
            AttributeValue::Bool(true),
            AttributeValue::Int(-3),
            AttributeValue::Double(1.5),
        ];
        let row = layout.encode(&values).unwrap();
        assert_eq!(row.len(), 13);
        assert_eq!(layout.decode(&row).unwrap(), values.to_vec());
        assert_eq!(layout.format_row(&row, "\t").unwrap(), "1\t-3\t1.5");
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let layout = layout();
        assert!(matches!(
            layout.encode(&[AttributeValue::Bool(true)]),
            Err(EntityError::SnapshotArity { expected: 3, actual: 1 })
        ));
        let wrong = [
            AttributeValue::Bool(true),
            AttributeValue::Long(4),
            AttributeValue::Double(0.0),
        ];
        assert!(matches!(
            layout.encode(&wrong),
            Err(EntityError::SnapshotTypeMismatch { .. })
        ));
        assert!(layout.decode(&[0; 12]).is_err());
    }

    #[test]
    fn entities_encode_through_microdata_trait() {
        struct Person {
            age: i32,
        }
        impl Microdata for Person {
            fn microdata(&self) -> Vec<AttributeValue> {
                vec![AttributeValue::Int(self.age)]
            }
        }
        let layout = SnapshotLayout::new(&[("age", AttributeType::Int)]);
        let row = layout.encode_entity(&Person { age: 61 }).unwrap();
        assert_eq!(row, 61_i32.to_le_bytes().to_vec());
    }

    #[test]
    fn values_serialize_with_type_tag() {
        let json = serde_json::to_value(AttributeValue::Int(-3)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "int", "value": -3 }));
        let back: AttributeValue = serde_json::from_str(r#"{"type":"double","value":2.5}"#).unwrap();
        assert_eq!(back, AttributeValue::Double(2.5));
        assert!(serde_json::from_str::<AttributeValue>(r#"{"type":"text","value":"x"}"#).is_err());
    }

    #[test]
    fn layout_from_json_formats_existing_rows() {
        let layout = layout();
        let row = layout
            .encode(&[
                AttributeValue::Bool(false),
                AttributeValue::Int(44),
                AttributeValue::Double(-0.25),
            ])
            .unwrap();

        let json = serde_json::to_string(&layout).unwrap();
        let shipped: SnapshotLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(shipped, layout);
        assert_eq!(shipped.header(","), "alive,age,income");
        assert_eq!(shipped.format_row(&row, ",").unwrap(), "0,44,-0.25");
    }

    #[test]
    fn values_widen_to_f64() {
        assert!((AttributeValue::Bool(true).as_f64() - 1.0).abs() < f64::EPSILON);
        assert!((AttributeValue::Long(-7).as_f64() + 7.0).abs() < f64::EPSILON);
    }
}
