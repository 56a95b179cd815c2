// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shape and type discovery over nested input values.
//!
//! Given an arbitrary [`Value`], these routines determine how many nesting
//! levels to treat as array dimensions, the extent of each axis, and, for
//! the variable-width element types, the element byte size the data needs.

use crate::descriptor::{Descr, Typecode};
use crate::error::{ArrayError, ErrorKind};
use crate::value::Value;
use crate::STRUCT_CAPSULE_VERSION;

/// Number of nesting levels to treat as array dimensions.
///
/// Depth recursion descends into element 0 only; the full structure is
/// walked later by [`discover_dims`]. Existing arrays report their own
/// rank, scalars are depth 0, text leaves are depth 0 or 1 depending on
/// `stop_at_string`, and tuple leaves stop at 0 when `stop_at_tuple` is
/// set. A foreign exporter's reported rank is used directly.
pub(crate) fn discover_depth(
    value: &Value,
    max: usize,
    stop_at_string: bool,
    stop_at_tuple: bool,
) -> Result<usize, ArrayError> {
    if max < 1 {
        return Err(ArrayError::new(
            ErrorKind::InvalidArgument,
            "invalid input sequence",
        ));
    }
    match value {
        Value::Array(a) => Ok(a.ndim()),
        Value::Bool(_) | Value::Int(_) | Value::UInt(_) | Value::Float(_) | Value::Complex(_) =>
            Ok(0),
        Value::Str(_) | Value::Bytes(_) => Ok(if stop_at_string { 0 } else { 1 }),
        Value::Tuple(_) if stop_at_tuple => Ok(0),
        Value::Foreign(f) => {
            if let Some(export) = f.buffer() {
                return Ok(export.shape.as_ref().map_or(1, |s| s.len()));
            }
            if let Some(capsule) = f.struct_export() {
                if capsule.two == STRUCT_CAPSULE_VERSION {
                    return Ok(capsule.nd);
                }
            }
            if let Some(dict) = f.dict_export() {
                if let Some(Value::Seq(s) | Value::Tuple(s)) = dict.get("shape") {
                    return Ok(s.len());
                }
            }
            Ok(0)
        }
        Value::Seq(items) | Value::Tuple(items) => {
            if items.is_empty() {
                return Ok(1);
            }
            let d = discover_depth(&items[0], max - 1, stop_at_string, stop_at_tuple)?;
            Ok(d + 1)
        }
    }
}

/// Walk the full nested structure and record the extent of each of the
/// `nd` axes into `d`.
///
/// When children disagree on the next-level extent, the smallest
/// consistent trailing extent wins so ragged inputs degrade instead of
/// failing; with `check_it` set, the first immediate-level disagreement
/// is a `ShapeMismatch` instead.
pub(crate) fn discover_dims(
    value: &Value,
    nd: usize,
    d: &mut [usize],
    check_it: bool,
) -> Result<(), ArrayError> {
    if let Value::Array(a) = value {
        // a 0-d array operand contributes an extent of 0, not 1; kept
        // exactly as the construction code has always behaved
        if a.ndim() == 0 {
            d[0] = 0;
        } else {
            for i in 0..nd.min(a.ndim()) {
                d[i] = a.shape()[i];
            }
        }
        return Ok(());
    }
    let n = value.seq_len().ok_or_else(|| {
        ArrayError::new(ErrorKind::TypeMismatch, "cannot determine sequence length")
    })?;
    d[0] = n;
    if nd <= 1 {
        return Ok(());
    }
    let mut lower: Option<usize> = None;
    for i in 0..n {
        let e = value
            .get(i)
            .ok_or_else(|| ArrayError::new(ErrorKind::TypeMismatch, "cannot index into sequence"))?;
        discover_dims(e, nd - 1, &mut d[1..], check_it)?;
        match lower {
            None => lower = Some(d[1]),
            Some(prev) => {
                if check_it && prev != 0 && prev != d[1] {
                    return Err(ArrayError::new(
                        ErrorKind::ShapeMismatch,
                        "inconsistent shape in sequence",
                    ));
                }
                if d[1] < prev {
                    lower = Some(d[1]);
                }
            }
        }
    }
    d[1] = lower.unwrap_or(0);
    Ok(())
}

/// Largest leaf length found anywhere in the structure, in code units;
/// the caller scales Unicode leaves to bytes.
pub(crate) fn discover_itemsize(
    value: &Value,
    nd: usize,
    itemsize: &mut usize,
) -> Result<(), ArrayError> {
    if let Value::Array(a) = value {
        *itemsize = (*itemsize).max(a.itemsize());
        return Ok(());
    }
    let n = value.seq_len().unwrap_or(0);
    if nd == 0 || matches!(value, Value::Str(_) | Value::Bytes(_)) {
        *itemsize = (*itemsize).max(n);
        return Ok(());
    }
    for i in 0..n {
        let e = value
            .get(i)
            .ok_or_else(|| ArrayError::new(ErrorKind::TypeMismatch, "cannot index into sequence"))?;
        discover_itemsize(e, nd - 1, itemsize)?;
    }
    Ok(())
}

/// The builtin descriptor able to represent every leaf of the input;
/// numeric leaves promote upward, an empty or opaque input defaults to
/// double precision.
pub(crate) fn infer_descr(value: &Value) -> Descr {
    Descr::new(infer_typecode(value).unwrap_or(Typecode::Float64))
}

fn infer_typecode(value: &Value) -> Option<Typecode> {
    match value {
        Value::Bool(_) => Some(Typecode::Bool),
        Value::Int(_) => Some(Typecode::Int64),
        Value::UInt(u) => Some(if *u <= i64::MAX as u64 {
            Typecode::Int64
        } else {
            Typecode::UInt64
        }),
        Value::Float(_) => Some(Typecode::Float64),
        Value::Complex(_) => Some(Typecode::Complex128),
        Value::Str(_) => Some(Typecode::Unicode),
        Value::Bytes(_) => Some(Typecode::Bytes),
        Value::Array(a) => Some(a.descr().typecode()),
        Value::Seq(items) | Value::Tuple(items) =>
            items.iter().filter_map(infer_typecode).reduce(promote),
        Value::Foreign(_) => None,
    }
}

fn promote(a: Typecode, b: Typecode) -> Typecode {
    fn rank(t: Typecode) -> u8 {
        use Typecode::*;
        match t {
            Bool => 0,
            Int8 => 1,
            Int16 => 2,
            Int32 => 3,
            Int64 => 4,
            UInt8 => 5,
            UInt16 => 6,
            UInt32 => 7,
            UInt64 => 8,
            Float32 => 9,
            Float64 => 10,
            Complex64 => 11,
            Complex128 => 12,
            Char | Bytes => 13,
            Unicode => 14,
        }
    }
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}
