// Closed, versioned enumerations exchanged with callers as raw u32 tags.
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DataType {
    Undefined = 0,
    Binary = 1,
    String = 2,
    Bool = 3,
    Int32 = 4,
    Int64 = 5,
    UInt32 = 6,
    UInt64 = 7,
    Float = 8,
    Double = 9,
    VectorBinary32 = 20,
    VectorBinary64 = 21,
    VectorFp16 = 22,
    VectorFp32 = 23,
    VectorFp64 = 24,
    VectorInt4 = 25,
    VectorInt8 = 26,
    VectorInt16 = 27,
    SparseVectorFp16 = 30,
    SparseVectorFp32 = 31,
    ArrayBinary = 40,
    ArrayString = 41,
    ArrayBool = 42,
    ArrayInt32 = 43,
    ArrayInt64 = 44,
    ArrayUInt32 = 45,
    ArrayUInt64 = 46,
    ArrayFloat = 47,
    ArrayDouble = 48,
}

impl DataType {
    /// Decode a wire tag. Unknown tags decode to `Undefined`.
    pub fn from_u32(tag: u32) -> Self {
        match tag {
            1 => DataType::Binary,
            2 => DataType::String,
            3 => DataType::Bool,
            4 => DataType::Int32,
            5 => DataType::Int64,
            6 => DataType::UInt32,
            7 => DataType::UInt64,
            8 => DataType::Float,
            9 => DataType::Double,
            20 => DataType::VectorBinary32,
            21 => DataType::VectorBinary64,
            22 => DataType::VectorFp16,
            23 => DataType::VectorFp32,
            24 => DataType::VectorFp64,
            25 => DataType::VectorInt4,
            26 => DataType::VectorInt8,
            27 => DataType::VectorInt16,
            30 => DataType::SparseVectorFp16,
            31 => DataType::SparseVectorFp32,
            40 => DataType::ArrayBinary,
            41 => DataType::ArrayString,
            42 => DataType::ArrayBool,
            43 => DataType::ArrayInt32,
            44 => DataType::ArrayInt64,
            45 => DataType::ArrayUInt32,
            46 => DataType::ArrayUInt64,
            47 => DataType::ArrayFloat,
            48 => DataType::ArrayDouble,
            _ => DataType::Undefined,
        }
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_dense_vector(self) -> bool {
        matches!(self.as_u32(), 20..=27)
    }

    pub fn is_sparse_vector(self) -> bool {
        matches!(self, DataType::SparseVectorFp16 | DataType::SparseVectorFp32)
    }

    pub fn is_vector(self) -> bool {
        self.is_dense_vector() || self.is_sparse_vector()
    }

    pub fn is_array(self) -> bool {
        matches!(self.as_u32(), 40..=48)
    }

    pub fn is_scalar(self) -> bool {
        matches!(self.as_u32(), 1..=9)
    }

    pub fn is_binary_vector(self) -> bool {
        matches!(self, DataType::VectorBinary32 | DataType::VectorBinary64)
    }

    /// Float-valued vectors, the only kinds that accept quantization.
    pub fn is_float_vector(self) -> bool {
        matches!(
            self,
            DataType::VectorFp16
                | DataType::VectorFp32
                | DataType::VectorFp64
                | DataType::SparseVectorFp16
                | DataType::SparseVectorFp32
        )
    }

    /// Whether documents can carry values of this type at all.
    pub fn is_storable(self) -> bool {
        !matches!(
            self,
            DataType::Undefined
                | DataType::Binary
                | DataType::ArrayBinary
                | DataType::ArrayBool
                | DataType::ArrayUInt32
                | DataType::ArrayUInt64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Undefined => "UNDEFINED",
            DataType::Binary => "BINARY",
            DataType::String => "STRING",
            DataType::Bool => "BOOL",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::UInt32 => "UINT32",
            DataType::UInt64 => "UINT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::VectorBinary32 => "VECTOR_BINARY32",
            DataType::VectorBinary64 => "VECTOR_BINARY64",
            DataType::VectorFp16 => "VECTOR_FP16",
            DataType::VectorFp32 => "VECTOR_FP32",
            DataType::VectorFp64 => "VECTOR_FP64",
            DataType::VectorInt4 => "VECTOR_INT4",
            DataType::VectorInt8 => "VECTOR_INT8",
            DataType::VectorInt16 => "VECTOR_INT16",
            DataType::SparseVectorFp16 => "SPARSE_VECTOR_FP16",
            DataType::SparseVectorFp32 => "SPARSE_VECTOR_FP32",
            DataType::ArrayBinary => "ARRAY_BINARY",
            DataType::ArrayString => "ARRAY_STRING",
            DataType::ArrayBool => "ARRAY_BOOL",
            DataType::ArrayInt32 => "ARRAY_INT32",
            DataType::ArrayInt64 => "ARRAY_INT64",
            DataType::ArrayUInt32 => "ARRAY_UINT32",
            DataType::ArrayUInt64 => "ARRAY_UINT64",
            DataType::ArrayFloat => "ARRAY_FLOAT",
            DataType::ArrayDouble => "ARRAY_DOUBLE",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum IndexType {
    Undefined = 0,
    Hnsw = 1,
    Ivf = 3,
    Flat = 4,
    Invert = 10,
}

impl IndexType {
    pub fn from_u32(tag: u32) -> Self {
        match tag {
            1 => IndexType::Hnsw,
            3 => IndexType::Ivf,
            4 => IndexType::Flat,
            10 => IndexType::Invert,
            _ => IndexType::Undefined,
        }
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexType::Undefined => "UNDEFINED",
            IndexType::Hnsw => "HNSW",
            IndexType::Ivf => "IVF",
            IndexType::Flat => "FLAT",
            IndexType::Invert => "INVERT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MetricType {
    Undefined = 0,
    L2 = 1,
    Ip = 2,
    Cosine = 3,
    MipsL2 = 4,
}

impl MetricType {
    pub fn from_u32(tag: u32) -> Self {
        match tag {
            1 => MetricType::L2,
            2 => MetricType::Ip,
            3 => MetricType::Cosine,
            4 => MetricType::MipsL2,
            _ => MetricType::Undefined,
        }
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricType::Undefined => "UNDEFINED",
            MetricType::L2 => "L2",
            MetricType::Ip => "IP",
            MetricType::Cosine => "COSINE",
            MetricType::MipsL2 => "MIPS_L2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum QuantizeType {
    Undefined = 0,
    Fp16 = 1,
    Int8 = 2,
    Int4 = 3,
}

impl QuantizeType {
    pub fn from_u32(tag: u32) -> Self {
        match tag {
            1 => QuantizeType::Fp16,
            2 => QuantizeType::Int8,
            3 => QuantizeType::Int4,
            _ => QuantizeType::Undefined,
        }
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            QuantizeType::Undefined => "UNDEFINED",
            QuantizeType::Fp16 => "FP16",
            QuantizeType::Int8 => "INT8",
            QuantizeType::Int4 => "INT4",
        }
    }
}

/// Write mode of a DML batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Operator {
    Insert = 0,
    Upsert = 1,
    Update = 2,
    Delete = 3,
}

impl Operator {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Operator::Insert => "insert",
            Operator::Upsert => "upsert",
            Operator::Update => "update",
            Operator::Delete => "delete",
        }
    }
}

impl TryFrom<u32> for Operator {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Operator::Insert),
            1 => Ok(Operator::Upsert),
            2 => Ok(Operator::Update),
            3 => Ok(Operator::Delete),
            other => Err(Error::InvalidArgument(format!("unknown write operator: {}", other))),
        }
    }
}
