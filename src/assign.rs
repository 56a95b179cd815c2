// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Writing nested sequence values into a freshly allocated array.

use crate::error::{ArrayError, ErrorKind};
use crate::value::Value;
use crate::Array;

/// Assign the nested sequence `v` element by element into `a`.
///
/// The nesting of `v` must match the shape of `a` exactly at every axis.
pub(crate) fn assign_array(a: &mut Array, v: &Value) -> Result<(), ArrayError> {
    let sequence_like = matches!(
        v,
        Value::Seq(_) | Value::Tuple(_) | Value::Str(_) | Value::Bytes(_) | Value::Array(_)
    );
    if !sequence_like {
        return Err(ArrayError::new(
            ErrorKind::TypeMismatch,
            "assignment from non-sequence",
        ));
    }
    if a.ndim() == 0 {
        return Err(ArrayError::new(
            ErrorKind::InvalidArgument,
            "assignment to 0-d array",
        ));
    }
    set_from_sequence(a, v, 0, 0)
}

/// Recursive axis walk: indexing `v` by position must reduce exactly one
/// dimension of `a` at a time, with `offset` accumulating the byte
/// position of the element being filled.
fn set_from_sequence(
    a: &mut Array,
    v: &Value,
    dim: usize,
    mut offset: isize,
) -> Result<(), ArrayError> {
    if dim >= a.ndim() {
        return Err(ArrayError::new(
            ErrorKind::ShapeMismatch,
            "sequence/array dimensions mismatch",
        ));
    }
    let extent = a.shape()[dim];
    let stride = a.strides()[dim];
    let last = dim + 1 == a.ndim();
    let descr = a.descr().clone();
    let mismatch = || {
        ArrayError::new(
            ErrorKind::ShapeMismatch,
            "sequence/array shape mismatch",
        )
    };
    match v {
        Value::Array(src) => {
            // positional indexing of an array view reduces one dimension,
            // so nested array operands reuse the same walk
            if src.ndim() == 0 || src.shape()[0] != extent {
                return Err(mismatch());
            }
            for i in 0..extent {
                let child = src.index_axis0(i)?;
                if !last {
                    set_from_sequence(a, &Value::Array(child), dim + 1, offset)?;
                } else {
                    if child.ndim() != 0 {
                        return Err(mismatch());
                    }
                    let val = unsafe { child.descr().getitem(child.as_ptr()) };
                    unsafe { descr.setitem(&val, a.as_mut_ptr().offset(offset))? };
                }
                offset += stride;
            }
        }
        Value::Seq(items) | Value::Tuple(items) => {
            if items.len() != extent {
                return Err(mismatch());
            }
            for item in items {
                if !last {
                    set_from_sequence(a, item, dim + 1, offset)?;
                } else {
                    match item {
                        Value::Array(arr) if arr.ndim() == 0 => {
                            let val = unsafe { arr.descr().getitem(arr.as_ptr()) };
                            unsafe { descr.setitem(&val, a.as_mut_ptr().offset(offset))? };
                        }
                        _ => unsafe { descr.setitem(item, a.as_mut_ptr().offset(offset))? },
                    }
                }
                offset += stride;
            }
        }
        Value::Str(s) => {
            if !last || s.chars().count() != extent {
                return Err(mismatch());
            }
            for c in s.chars() {
                let val = Value::Str(c.to_string());
                unsafe { descr.setitem(&val, a.as_mut_ptr().offset(offset))? };
                offset += stride;
            }
        }
        Value::Bytes(b) => {
            if b.len() != extent || !last {
                return Err(mismatch());
            }
            for &byte in b {
                let val = Value::Bytes(vec![byte]);
                unsafe { descr.setitem(&val, a.as_mut_ptr().offset(offset))? };
                offset += stride;
            }
        }
        _ => {
            return Err(ArrayError::new(
                ErrorKind::TypeMismatch,
                "assignment from non-sequence",
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descr, Typecode};
    use crate::seq;

    #[test]
    fn non_sequence_is_rejected() {
        let mut a = Array::zeros(Descr::new(Typecode::Int32), &[2], false).unwrap();
        let err = assign_array(&mut a, &Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn zero_d_target_is_rejected() {
        let mut a = Array::zeros(Descr::new(Typecode::Int32), &[], false).unwrap();
        let err = assign_array(&mut a, &seq![1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn length_mismatch_is_shape_error() {
        let mut a = Array::zeros(Descr::new(Typecode::Int32), &[3], false).unwrap();
        let err = assign_array(&mut a, &seq![1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn nested_array_operand() {
        let inner = crate::asarray(seq![5, 6], None).unwrap();
        let mut a = Array::zeros(Descr::new(Typecode::Int64), &[2, 2], false).unwrap();
        let v = Value::Seq(vec![seq![1, 2], Value::Array(inner)]);
        assign_array(&mut a, &v).unwrap();
        assert_eq!(a.get(&[1, 0]), Some(Value::Int(5)));
        assert_eq!(a.get(&[1, 1]), Some(Value::Int(6)));
    }
}
