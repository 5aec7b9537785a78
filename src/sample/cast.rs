use std::borrow::Cow;

use crate::error::CastError;
use crate::metadata::{Dtype, Htype};
use crate::sample::array::{Array, Element};

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

fn read_number(dtype: Dtype, bytes: &[u8]) -> Number {
    match dtype {
        Dtype::Bool => Number::Int(bool::read_le(bytes) as i128),
        Dtype::U8 => Number::Int(u8::read_le(bytes) as i128),
        Dtype::U16 => Number::Int(u16::read_le(bytes) as i128),
        Dtype::U32 => Number::Int(u32::read_le(bytes) as i128),
        Dtype::U64 => Number::Int(u64::read_le(bytes) as i128),
        Dtype::I8 => Number::Int(i8::read_le(bytes) as i128),
        Dtype::I16 => Number::Int(i16::read_le(bytes) as i128),
        Dtype::I32 => Number::Int(i32::read_le(bytes) as i128),
        Dtype::I64 => Number::Int(i64::read_le(bytes) as i128),
        Dtype::F32 => Number::Float(f32::read_le(bytes) as f64),
        Dtype::F64 => Number::Float(f64::read_le(bytes)),
    }
}

fn int_bounds(dtype: Dtype) -> (i128, i128) {
    match dtype {
        Dtype::Bool => (0, 1),
        Dtype::U8 => (0, u8::MAX as i128),
        Dtype::U16 => (0, u16::MAX as i128),
        Dtype::U32 => (0, u32::MAX as i128),
        Dtype::U64 => (0, u64::MAX as i128),
        Dtype::I8 => (i8::MIN as i128, i8::MAX as i128),
        Dtype::I16 => (i16::MIN as i128, i16::MAX as i128),
        Dtype::I32 => (i32::MIN as i128, i32::MAX as i128),
        Dtype::I64 => (i64::MIN as i128, i64::MAX as i128),
        Dtype::F32 | Dtype::F64 => (i128::MIN, i128::MAX),
    }
}

fn to_integer(value: Number, to: Dtype) -> Result<i128, String> {
    let int = match value {
        Number::Int(v) => v,
        Number::Float(v) => {
            if !v.is_finite() {
                return Err(format!("value {v} is not finite"));
            }
            if v.fract() != 0.0 {
                return Err(format!("value {v} is not integral"));
            }
            v as i128
        }
    };
    let (min, max) = int_bounds(to);
    if int < min || int > max {
        return Err(format!("value {value} out of range"));
    }
    Ok(int)
}

fn write_number(value: Number, to: Dtype, out: &mut Vec<u8>) -> Result<(), String> {
    match to {
        Dtype::F64 => match value {
            Number::Int(v) => (v as f64).write_le(out),
            Number::Float(v) => v.write_le(out),
        },
        Dtype::F32 => match value {
            Number::Int(v) => (v as f32).write_le(out),
            Number::Float(v) => {
                if v.is_finite() && v.abs() > f32::MAX as f64 {
                    return Err(format!("value {v} overflows {to}"));
                }
                (v as f32).write_le(out)
            }
        },
        _ => {
            let int = to_integer(value, to)?;
            match to {
                Dtype::Bool => (int != 0).write_le(out),
                Dtype::U8 => (int as u8).write_le(out),
                Dtype::U16 => (int as u16).write_le(out),
                Dtype::U32 => (int as u32).write_le(out),
                Dtype::U64 => (int as u64).write_le(out),
                Dtype::I8 => (int as i8).write_le(out),
                Dtype::I16 => (int as i16).write_le(out),
                Dtype::I32 => (int as i32).write_le(out),
                Dtype::I64 => (int as i64).write_le(out),
                Dtype::F32 | Dtype::F64 => {}
            }
        }
    }
    Ok(())
}

/// Casts `array` to `dtype`, checking every element.
///
/// No value is ever truncated or wrapped: integer overflow, a non-integral or
/// non-finite float going to an integer type, anything but 0/1 going to bool,
/// and a finite float overflowing `f32` all fail. The input is borrowed back
/// unchanged when it already has the requested dtype.
pub fn intelligent_cast(array: &Array, dtype: Dtype, htype: Htype) -> Result<Cow<'_, Array>, CastError> {
    let from = array.dtype();
    if from == dtype {
        return Ok(Cow::Borrowed(array));
    }

    let mut out = Vec::with_capacity(array.num_elements() * dtype.itemsize());
    for bytes in array.as_bytes().chunks_exact(from.itemsize()) {
        write_number(read_number(from, bytes), dtype, &mut out).map_err(|reason| CastError {
            from,
            to: dtype,
            htype,
            reason,
        })?;
    }

    Array::from_bytes(dtype, array.shape().to_vec(), out)
        .map(Cow::Owned)
        .map_err(|e| CastError {
            from,
            to: dtype,
            htype,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_dtype_is_borrowed() {
        let array = Array::from_vec(vec![1u8, 2], vec![2]).unwrap();
        let cast = intelligent_cast(&array, Dtype::U8, Htype::Image).unwrap();
        assert!(matches!(cast, Cow::Borrowed(_)));
    }

    #[test]
    fn widening_and_integral_floats() {
        let array = Array::from_vec(vec![0.0f64, 255.0, 17.0], vec![3]).unwrap();
        let cast = intelligent_cast(&array, Dtype::U8, Htype::Image).unwrap();
        assert_eq!(cast.to_vec::<u8>().unwrap(), vec![0, 255, 17]);

        let ints = Array::from_vec(vec![-3i16, 9], vec![2]).unwrap();
        let cast = intelligent_cast(&ints, Dtype::F32, Htype::Generic).unwrap();
        assert_eq!(cast.to_vec::<f32>().unwrap(), vec![-3.0, 9.0]);
    }

    #[test]
    fn overflow_is_reported() {
        let array = Array::from_vec(vec![1.0f64, 300.0], vec![2]).unwrap();
        let err = intelligent_cast(&array, Dtype::U8, Htype::Image).unwrap_err();
        assert_eq!(err.from, Dtype::F64);
        assert_eq!(err.to, Dtype::U8);
        assert_eq!(err.reason, "value 300 out of range");

        let negative = Array::from_vec(vec![-1i32], vec![1]).unwrap();
        assert!(intelligent_cast(&negative, Dtype::U32, Htype::ClassLabel).is_err());
    }

    #[test]
    fn fractional_and_nan_floats_do_not_become_ints() {
        let array = Array::from_vec(vec![1.5f32], vec![1]).unwrap();
        assert!(intelligent_cast(&array, Dtype::I32, Htype::Generic).is_err());

        let nan = Array::from_vec(vec![f64::NAN], vec![1]).unwrap();
        assert!(intelligent_cast(&nan, Dtype::I64, Htype::Generic).is_err());
        let narrowed = intelligent_cast(&nan, Dtype::F32, Htype::Generic).unwrap();
        assert!(narrowed.to_vec::<f32>().unwrap()[0].is_nan());
    }

    #[test]
    fn bool_target_accepts_only_zero_and_one() {
        let array = Array::from_vec(vec![0u8, 1, 1], vec![3]).unwrap();
        let cast = intelligent_cast(&array, Dtype::Bool, Htype::Generic).unwrap();
        assert_eq!(cast.to_vec::<bool>().unwrap(), vec![false, true, true]);

        let two = Array::from_vec(vec![2u8], vec![1]).unwrap();
        assert!(intelligent_cast(&two, Dtype::Bool, Htype::Generic).is_err());
    }

    #[test]
    fn f32_overflow_is_reported() {
        let array = Array::from_vec(vec![1e300f64], vec![1]).unwrap();
        assert!(intelligent_cast(&array, Dtype::F32, Htype::Generic).is_err());
        let inf = Array::from_vec(vec![f64::INFINITY], vec![1]).unwrap();
        assert!(intelligent_cast(&inf, Dtype::F32, Htype::Generic).is_ok());
    }
}
