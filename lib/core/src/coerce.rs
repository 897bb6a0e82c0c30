// Checking document values against field declarations.
use crate::filter::Literal;
use crate::{DataType, Error, FieldSchema, Result, Value};

fn mismatch(field: &FieldSchema, value: &Value) -> Error {
    Error::InvalidArgument(format!(
        "field '{}' expects {}, got {}",
        field.name,
        field.data_type,
        value.type_name()
    ))
}

fn check_dimension(field: &FieldSchema, len: usize) -> Result<()> {
    if len != field.dimension as usize {
        return Err(Error::InvalidArgument(format!(
            "field '{}' expects dimension {}, got {}",
            field.name, field.dimension, len
        )));
    }
    Ok(())
}

fn check_packed_bits(field: &FieldSchema, words: usize, width: usize) -> Result<()> {
    if words * width != field.dimension as usize {
        return Err(Error::InvalidArgument(format!(
            "field '{}' expects {} bits, got {}",
            field.name,
            field.dimension,
            words * width
        )));
    }
    Ok(())
}

/// Check `value` against `field` and return the value to store. Narrower
/// numeric values widen to the declared type.
pub fn coerce_value(field: &FieldSchema, value: Value) -> Result<Value> {
    use DataType as T;

    if value.is_null() {
        if field.nullable {
            return Ok(Value::Null);
        }
        return Err(Error::InvalidArgument(format!(
            "field '{}' is not nullable",
            field.name
        )));
    }

    match (field.data_type, value) {
        (T::Bool, v @ Value::Bool(_))
        | (T::Int32, v @ Value::Int32(_))
        | (T::Int64, v @ Value::Int64(_))
        | (T::UInt32, v @ Value::UInt32(_))
        | (T::UInt64, v @ Value::UInt64(_))
        | (T::Float, v @ Value::Float(_))
        | (T::Double, v @ Value::Double(_))
        | (T::String, v @ Value::String(_))
        | (T::ArrayInt32, v @ Value::ArrayInt32(_))
        | (T::ArrayInt64, v @ Value::ArrayInt64(_))
        | (T::ArrayFloat, v @ Value::ArrayFloat(_))
        | (T::ArrayDouble, v @ Value::ArrayDouble(_))
        | (T::ArrayString, v @ Value::ArrayString(_)) => Ok(v),

        (T::Int64, Value::Int32(v)) => Ok(Value::Int64(v as i64)),
        (T::UInt64, Value::UInt32(v)) => Ok(Value::UInt64(v as u64)),
        (T::Double, Value::Float(v)) => Ok(Value::Double(v as f64)),
        (T::ArrayInt32, Value::VectorInt32(v)) => Ok(Value::ArrayInt32(v)),
        (T::ArrayInt64, Value::VectorInt64(v)) => Ok(Value::ArrayInt64(v)),

        (T::VectorFp32 | T::VectorFp16, Value::VectorFp32(v)) => {
            check_dimension(field, v.len())?;
            Ok(Value::VectorFp32(v))
        }
        (T::VectorFp64, Value::VectorFp64(v)) => {
            check_dimension(field, v.len())?;
            Ok(Value::VectorFp64(v))
        }
        (T::VectorInt8, Value::VectorInt8(v)) => {
            check_dimension(field, v.len())?;
            Ok(Value::VectorInt8(v))
        }
        (T::VectorInt4, Value::VectorInt8(v)) => {
            check_dimension(field, v.len())?;
            if v.iter().any(|x| !(-8..=7).contains(x)) {
                return Err(Error::InvalidArgument(format!(
                    "field '{}' holds int4 values, elements must be within -8..=7",
                    field.name
                )));
            }
            Ok(Value::VectorInt8(v))
        }
        (T::VectorInt16, Value::VectorInt16(v)) => {
            check_dimension(field, v.len())?;
            Ok(Value::VectorInt16(v))
        }
        (T::VectorBinary32, Value::VectorInt32(v)) => {
            check_packed_bits(field, v.len(), 32)?;
            Ok(Value::VectorInt32(v))
        }
        (T::VectorBinary64, Value::VectorInt64(v)) => {
            check_packed_bits(field, v.len(), 64)?;
            Ok(Value::VectorInt64(v))
        }
        (T::SparseVectorFp32 | T::SparseVectorFp16, Value::SparseFp32(v)) => {
            if field.dimension > 0 {
                if let Some(max) = v.max_index() {
                    if max >= field.dimension {
                        return Err(Error::InvalidArgument(format!(
                            "field '{}' sparse index {} out of range for dimension {}",
                            field.name, max, field.dimension
                        )));
                    }
                }
            }
            Ok(Value::SparseFp32(v))
        }

        (_, v) => Err(mismatch(field, &v)),
    }
}

/// Convert a stored scalar to another scalar type, as needed when a column's
/// type is altered. Returns `None` when the value does not fit.
pub fn convert_scalar(value: &Value, to: DataType) -> Option<Value> {
    use DataType as T;

    if value.is_null() {
        return Some(Value::Null);
    }
    if let Value::String(s) = value {
        return match to {
            T::String => Some(value.clone()),
            T::Bool => s.parse().ok().map(Value::Bool),
            T::Int32 => s.trim().parse().ok().map(Value::Int32),
            T::Int64 => s.trim().parse().ok().map(Value::Int64),
            T::UInt32 => s.trim().parse().ok().map(Value::UInt32),
            T::UInt64 => s.trim().parse().ok().map(Value::UInt64),
            T::Float => s.trim().parse().ok().map(Value::Float),
            T::Double => s.trim().parse().ok().map(Value::Double),
            _ => None,
        };
    }
    if let Value::Bool(b) = value {
        return match to {
            T::Bool => Some(value.clone()),
            T::String => Some(Value::String(b.to_string())),
            _ => convert_scalar(&Value::Int64(*b as i64), to),
        };
    }

    let as_int: Option<i128> = match value {
        Value::Int32(v) => Some(*v as i128),
        Value::Int64(v) => Some(*v as i128),
        Value::UInt32(v) => Some(*v as i128),
        Value::UInt64(v) => Some(*v as i128),
        _ => None,
    };
    let as_float = value.as_f64()?;

    match to {
        T::String => Some(Value::String(value.to_string())),
        T::Bool => Some(Value::Bool(as_float != 0.0)),
        T::Float => Some(Value::Float(as_float as f32)),
        T::Double => Some(Value::Double(as_float)),
        T::Int32 => int_of(as_int, as_float).and_then(|v| i32::try_from(v).ok()).map(Value::Int32),
        T::Int64 => int_of(as_int, as_float).and_then(|v| i64::try_from(v).ok()).map(Value::Int64),
        T::UInt32 => int_of(as_int, as_float).and_then(|v| u32::try_from(v).ok()).map(Value::UInt32),
        T::UInt64 => int_of(as_int, as_float).and_then(|v| u64::try_from(v).ok()).map(Value::UInt64),
        _ => None,
    }
}

// Floats convert to integers only when they are whole numbers.
fn int_of(exact: Option<i128>, float: f64) -> Option<i128> {
    match exact {
        Some(v) => Some(v),
        None if float.fract() == 0.0 && float.is_finite() => Some(float as i128),
        None => None,
    }
}

/// Turn a literal fill expression into a value of `data_type`.
pub fn literal_value(literal: &Literal, data_type: DataType) -> Option<Value> {
    let value = match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int64(*i),
        Literal::Float(f) => Value::Double(*f),
        Literal::String(s) => {
            if data_type != DataType::String {
                return None;
            }
            Value::String(s.clone())
        }
    };
    if !data_type.is_scalar() {
        return None;
    }
    if matches!(literal, Literal::Float(_))
        && !matches!(data_type, DataType::Float | DataType::Double)
    {
        return None;
    }
    convert_scalar(&value, data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SparseVector, StatusCode};

    #[test]
    fn test_widening() {
        let field = FieldSchema::new("n", DataType::Int64);
        assert_eq!(coerce_value(&field, Value::Int32(5)).unwrap(), Value::Int64(5));
        let field = FieldSchema::new("d", DataType::Double);
        assert_eq!(coerce_value(&field, Value::Float(0.5)).unwrap(), Value::Double(0.5));
    }

    #[test]
    fn test_mismatch_and_null() {
        let field = FieldSchema::new("n", DataType::Int32);
        let err = coerce_value(&field, Value::String("x".into())).unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidArgument);
        assert!(coerce_value(&field, Value::Null).is_err());
        assert_eq!(coerce_value(&field.clone().nullable(true), Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_vector_dimension() {
        let field = FieldSchema::with_dimension("emb", DataType::VectorFp32, 3);
        assert!(coerce_value(&field, Value::VectorFp32(vec![1.0, 2.0, 3.0])).is_ok());
        assert!(coerce_value(&field, Value::VectorFp32(vec![1.0, 2.0])).is_err());

        let field = FieldSchema::with_dimension("bits", DataType::VectorBinary32, 64);
        assert!(coerce_value(&field, Value::VectorInt32(vec![1, 2])).is_ok());
        assert!(coerce_value(&field, Value::VectorInt32(vec![1])).is_err());

        let field = FieldSchema::with_dimension("q", DataType::VectorInt4, 2);
        assert!(coerce_value(&field, Value::VectorInt8(vec![-8, 7])).is_ok());
        assert!(coerce_value(&field, Value::VectorInt8(vec![8, 0])).is_err());
    }

    #[test]
    fn test_sparse_range() {
        let field = FieldSchema::with_dimension("sp", DataType::SparseVectorFp32, 10);
        let ok = SparseVector::new(vec![1, 9], vec![1.0, 2.0]).unwrap();
        let bad = SparseVector::new(vec![10], vec![1.0]).unwrap();
        assert!(coerce_value(&field, Value::SparseFp32(ok)).is_ok());
        assert!(coerce_value(&field, Value::SparseFp32(bad)).is_err());
    }

    #[test]
    fn test_convert_scalar() {
        assert_eq!(convert_scalar(&Value::Int32(7), DataType::String), Some(Value::String("7".into())));
        assert_eq!(convert_scalar(&Value::String("12".into()), DataType::Int64), Some(Value::Int64(12)));
        assert_eq!(convert_scalar(&Value::String("abc".into()), DataType::Int64), None);
        assert_eq!(convert_scalar(&Value::Int64(-1), DataType::UInt32), None);
        assert_eq!(convert_scalar(&Value::Double(2.0), DataType::Int32), Some(Value::Int32(2)));
        assert_eq!(convert_scalar(&Value::Double(2.5), DataType::Int32), None);
    }

    #[test]
    fn test_literal_value() {
        assert_eq!(literal_value(&Literal::Int(3), DataType::Int32), Some(Value::Int32(3)));
        assert_eq!(literal_value(&Literal::Float(0.5), DataType::Int32), None);
        assert_eq!(literal_value(&Literal::String("a".into()), DataType::String), Some(Value::String("a".into())));
        assert_eq!(literal_value(&Literal::Int(1), DataType::ArrayInt32), None);
    }
}
