use crate::{DataType, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sparse vector as parallel index/value arrays of equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self { indices, values })
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn max_index(&self) -> Option<u32> {
        self.indices.iter().copied().max()
    }
}

/// A single tagged field value.
///
/// `Null` is an explicit value: a field holding `Null` is present but has no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    VectorFp32(Vec<f32>),
    VectorFp64(Vec<f64>),
    VectorInt8(Vec<i8>),
    VectorInt16(Vec<i16>),
    VectorInt32(Vec<i32>),
    VectorInt64(Vec<i64>),
    SparseFp32(SparseVector),
    ArrayInt32(Vec<i32>),
    ArrayInt64(Vec<i64>),
    ArrayFloat(Vec<f32>),
    ArrayDouble(Vec<f64>),
    ArrayString(Vec<String>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The data type a value reports when read back without a schema.
    /// Packed int32/int64 vectors report as binary vectors.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Undefined,
            Value::Bool(_) => DataType::Bool,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::UInt32(_) => DataType::UInt32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::VectorFp32(_) => DataType::VectorFp32,
            Value::VectorFp64(_) => DataType::VectorFp64,
            Value::VectorInt8(_) => DataType::VectorInt8,
            Value::VectorInt16(_) => DataType::VectorInt16,
            Value::VectorInt32(_) => DataType::VectorBinary32,
            Value::VectorInt64(_) => DataType::VectorBinary64,
            Value::SparseFp32(_) => DataType::SparseVectorFp32,
            Value::ArrayInt32(_) => DataType::ArrayInt32,
            Value::ArrayInt64(_) => DataType::ArrayInt64,
            Value::ArrayFloat(_) => DataType::ArrayFloat,
            Value::ArrayDouble(_) => DataType::ArrayDouble,
            Value::ArrayString(_) => DataType::ArrayString,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::VectorFp32(_) => "vector<fp32>",
            Value::VectorFp64(_) => "vector<fp64>",
            Value::VectorInt8(_) => "vector<int8>",
            Value::VectorInt16(_) => "vector<int16>",
            Value::VectorInt32(_) => "vector<int32>",
            Value::VectorInt64(_) => "vector<int64>",
            Value::SparseFp32(_) => "sparse<fp32>",
            Value::ArrayInt32(_) => "array<int32>",
            Value::ArrayInt64(_) => "array<int64>",
            Value::ArrayFloat(_) => "array<float>",
            Value::ArrayDouble(_) => "array<double>",
            Value::ArrayString(_) => "array<string>",
        }
    }

    /// Number of elements for vector, sparse and array values; `None` for scalars.
    pub fn element_count(&self) -> Option<usize> {
        match self {
            Value::VectorFp32(v) | Value::ArrayFloat(v) => Some(v.len()),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => Some(v.len()),
            Value::VectorInt8(v) => Some(v.len()),
            Value::VectorInt16(v) => Some(v.len()),
            Value::VectorInt32(v) | Value::ArrayInt32(v) => Some(v.len()),
            Value::VectorInt64(v) | Value::ArrayInt64(v) => Some(v.len()),
            Value::SparseFp32(v) => Some(v.len()),
            Value::ArrayString(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Approximate heap bytes held by the value, used for memory statistics.
    pub fn heap_size(&self) -> usize {
        use std::mem::size_of;
        match self {
            Value::String(s) => s.capacity(),
            Value::VectorFp32(v) | Value::ArrayFloat(v) => v.capacity() * size_of::<f32>(),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => v.capacity() * size_of::<f64>(),
            Value::VectorInt8(v) => v.capacity(),
            Value::VectorInt16(v) => v.capacity() * size_of::<i16>(),
            Value::VectorInt32(v) | Value::ArrayInt32(v) => v.capacity() * size_of::<i32>(),
            Value::VectorInt64(v) | Value::ArrayInt64(v) => v.capacity() * size_of::<i64>(),
            Value::SparseFp32(v) => {
                v.indices.capacity() * size_of::<u32>() + v.values.capacity() * size_of::<f32>()
            }
            Value::ArrayString(v) => {
                v.capacity() * size_of::<String>() + v.iter().map(|s| s.capacity()).sum::<usize>()
            }
            _ => 0,
        }
    }

    /// Widen a value to f64 for numeric comparison.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector_fp32(&self) -> Option<&[f32]> {
        match self {
            Value::VectorFp32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_fp64(&self) -> Option<&[f64]> {
        match self {
            Value::VectorFp64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_int8(&self) -> Option<&[i8]> {
        match self {
            Value::VectorInt8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_int16(&self) -> Option<&[i16]> {
        match self {
            Value::VectorInt16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_int32(&self) -> Option<&[i32]> {
        match self {
            Value::VectorInt32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_int64(&self) -> Option<&[i64]> {
        match self {
            Value::VectorInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseVector> {
        match self {
            Value::SparseFp32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_int32(&self) -> Option<&[i32]> {
        match self {
            Value::ArrayInt32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_int64(&self) -> Option<&[i64]> {
        match self {
            Value::ArrayInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_float(&self) -> Option<&[f32]> {
        match self {
            Value::ArrayFloat(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_double(&self) -> Option<&[f64]> {
        match self {
            Value::ArrayDouble(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_string(&self) -> Option<&[String]> {
        match self {
            Value::ArrayString(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => json!(v),
            Value::Int32(v) => json!(v),
            Value::Int64(v) => json!(v),
            Value::UInt32(v) => json!(v),
            Value::UInt64(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Double(v) => json!(v),
            Value::String(v) => json!(v),
            Value::VectorFp32(v) | Value::ArrayFloat(v) => json!(v),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => json!(v),
            Value::VectorInt8(v) => json!(v),
            Value::VectorInt16(v) => json!(v),
            Value::VectorInt32(v) | Value::ArrayInt32(v) => json!(v),
            Value::VectorInt64(v) | Value::ArrayInt64(v) => json!(v),
            Value::SparseFp32(v) => json!({ "indices": v.indices, "values": v.values }),
            Value::ArrayString(v) => json!(v),
        }
    }
}

/// Scalars print bare (strings unquoted), everything else prints as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<f32> => VectorFp32,
    Vec<f64> => VectorFp64,
    Vec<i8> => VectorInt8,
    Vec<i16> => VectorInt16,
    SparseVector => SparseFp32,
    Vec<String> => ArrayString,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Typed extraction from a [`Value`]. Extraction fails closed: a tag mismatch
/// yields `None`, never a conversion.
pub trait FromValue<'a>: Sized {
    fn from_value(value: &'a Value) -> Option<Self>;
}

macro_rules! impl_from_value_copy {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> FromValue<'a> for $ty {
                fn from_value(value: &'a Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_value_copy! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
}

impl<'a> FromValue<'a> for &'a str {
    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_str()
    }
}

impl<'a> FromValue<'a> for &'a SparseVector {
    fn from_value(value: &'a Value) -> Option<Self> {
        value.as_sparse()
    }
}
