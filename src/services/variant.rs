//! Array-valued data as seen by numeric range addressing.
//!
//! Only the shapes range operations need are modelled: scalars, a growable
//! list of variants (which also represents matrices as lists of arrays),
//! fixed-size numeric buffers and raw byte strings.

use bytes::BytesMut;

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Boolean(bool),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    Double(f64),
    String(String),
    Array(ArrayValue),
}

/// Physical representation of an array value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    /// Growable list; written by splice.
    List(Vec<Variant>),
    /// Fixed-size numeric buffers; written by slice assignment.
    Int32(Box<[i32]>),
    UInt32(Box<[u32]>),
    Float(Box<[f32]>),
    Double(Box<[f64]>),
    /// Raw byte buffer (ByteString); written byte by byte.
    Bytes(BytesMut),
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::List(v) => v.len(),
            ArrayValue::Int32(v) => v.len(),
            ArrayValue::UInt32(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::Double(v) => v.len(),
            ArrayValue::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of `[start, end)` in the same representation.
    ///
    /// # Panics
    /// Panics if the range is out of bounds; callers check first.
    pub fn slice(&self, start: usize, end: usize) -> ArrayValue {
        match self {
            ArrayValue::List(v) => ArrayValue::List(v[start..end].to_vec()),
            ArrayValue::Int32(v) => ArrayValue::Int32(v[start..end].into()),
            ArrayValue::UInt32(v) => ArrayValue::UInt32(v[start..end].into()),
            ArrayValue::Float(v) => ArrayValue::Float(v[start..end].into()),
            ArrayValue::Double(v) => ArrayValue::Double(v[start..end].into()),
            ArrayValue::Bytes(v) => ArrayValue::Bytes(BytesMut::from(&v[start..end])),
        }
    }

    /// An empty array in the same representation.
    pub fn empty_like(&self) -> ArrayValue {
        self.slice(0, 0)
    }

    pub fn same_representation(&self, other: &ArrayValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<Vec<Variant>> for ArrayValue {
    fn from(v: Vec<Variant>) -> Self {
        ArrayValue::List(v)
    }
}

impl From<Vec<i32>> for ArrayValue {
    fn from(v: Vec<i32>) -> Self {
        ArrayValue::Int32(v.into_boxed_slice())
    }
}

impl From<Vec<u32>> for ArrayValue {
    fn from(v: Vec<u32>) -> Self {
        ArrayValue::UInt32(v.into_boxed_slice())
    }
}

impl From<Vec<f32>> for ArrayValue {
    fn from(v: Vec<f32>) -> Self {
        ArrayValue::Float(v.into_boxed_slice())
    }
}

impl From<Vec<f64>> for ArrayValue {
    fn from(v: Vec<f64>) -> Self {
        ArrayValue::Double(v.into_boxed_slice())
    }
}

impl From<&[u8]> for ArrayValue {
    fn from(v: &[u8]) -> Self {
        ArrayValue::Bytes(BytesMut::from(v))
    }
}
