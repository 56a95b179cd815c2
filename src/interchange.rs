//! Building arrays from foreign interchange objects.
//!
//! Each adapter consumes one of the capabilities on the [`Foreign`] trait
//! and wraps the exporter's memory without copying; the resulting array
//! keeps the exporter alive as its base and never frees the bytes itself.

use std::slice;
use std::sync::Arc;

use crate::descriptor::{ByteOrder, Descr, Typecode};
use crate::error::{ArrayError, ErrorKind};
use crate::impl_constructors::ArrayData;
use crate::value::{BufferExport, Foreign, InterfaceDict, StructCapsule, Value};
use crate::{Array, ArrayFlags, STRUCT_CAPSULE_VERSION};

/// Wrap a foreign object's exposed memory view.
///
/// The descriptor comes from the reported format string, falling back to
/// opaque bytes of the reported item size; absent shape means a flat
/// 1-d view, absent strides mean C order.
pub(crate) fn from_buffer_export(
    base: &Arc<dyn Foreign>,
    export: BufferExport,
) -> Result<Array, ArrayError> {
    let descr = match &export.format {
        Some(f) => Descr::from_typestr(f)?,
        None => Descr::new(Typecode::Bytes).with_elsize(export.itemsize.max(1)),
    };
    let elsize = descr.elsize();
    let dims = match export.shape {
        Some(s) => s,
        None => {
            if elsize == 0 || export.len % elsize != 0 {
                return Err(ArrayError::new(
                    ErrorKind::InvalidArgument,
                    "buffer size must be a multiple of element size",
                ));
            }
            vec![export.len / elsize]
        }
    };
    let mut flags = ArrayFlags::WRITEABLE;
    if export.readonly {
        flags.remove(ArrayFlags::WRITEABLE);
    }
    let mut a = Array::new_from_descr(
        None,
        descr,
        &dims,
        export.strides.as_deref(),
        Some(ArrayData::Foreign {
            ptr: export.ptr as *mut u8,
            base: Arc::clone(base),
        }),
        flags,
        None,
    )?;
    // alignment reflects the actual view, not a caller declaration
    a.update_flags();
    Ok(a)
}

/// Build an array from the fixed-layout export capsule.
pub(crate) fn from_struct_export(
    base: &Arc<dyn Foreign>,
    capsule: StructCapsule,
) -> Result<Array, ArrayError> {
    let mut capsule = capsule;
    let invalid = || ArrayError::new(ErrorKind::InvalidArgument, "invalid array struct");
    if capsule.two != STRUCT_CAPSULE_VERSION {
        return Err(invalid());
    }
    let notswapped = ArrayFlags::from_bits(capsule.flags).contains(ArrayFlags::NOTSWAPPED);
    if !notswapped {
        // consume the byte-order bit; the descriptor carries it from here
        capsule.flags &= !ArrayFlags::NOTSWAPPED.bits();
    }
    let units = match capsule.typekind {
        b'U' => capsule.itemsize / 4,
        _ => capsule.itemsize,
    };
    let typestr = format!("|{}{}", capsule.typekind as char, units);
    let mut descr = Descr::from_typestr(&typestr).map_err(|_| invalid())?;
    if !notswapped {
        descr = descr.with_byteorder(ByteOrder::Swapped);
    }
    let raw_dims = if capsule.nd == 0 {
        &[][..]
    } else if capsule.shape.is_null() {
        return Err(invalid());
    } else {
        unsafe { slice::from_raw_parts(capsule.shape, capsule.nd) }
    };
    let mut dims = Vec::with_capacity(capsule.nd);
    for &d in raw_dims {
        if d < 0 {
            return Err(ArrayError::new(
                ErrorKind::InvalidArgument,
                "negative dimensions are not allowed",
            ));
        }
        dims.push(d as usize);
    }
    let strides = if capsule.nd == 0 || capsule.strides.is_null() {
        None
    } else {
        Some(unsafe { slice::from_raw_parts(capsule.strides, capsule.nd) }.to_vec())
    };
    let flags =
        ArrayFlags::from_bits(capsule.flags) & (ArrayFlags::ALIGNED | ArrayFlags::WRITEABLE);
    let mut a = Array::new_from_descr(
        None,
        descr,
        &dims,
        strides.as_deref(),
        Some(ArrayData::Foreign {
            ptr: capsule.data,
            base: Arc::clone(base),
        }),
        flags,
        None,
    )?;
    a.update_flags();
    Ok(a)
}

/// Build an array from the interchange dictionary.
///
/// `shape` and `typestr` are required and malformed values are fatal; a
/// malformed `strides` entry after construction is dropped and the array
/// keeps its contiguous layout.
pub(crate) fn from_interface(
    base: &Arc<dyn Foreign>,
    dict: InterfaceDict,
) -> Result<Array, ArrayError> {
    let dims: Vec<usize> = match dict.get("shape") {
        Some(Value::Seq(s) | Value::Tuple(s)) => s
            .iter()
            .map(|v| {
                v.as_u64().map(|u| u as usize).ok_or_else(|| {
                    ArrayError::new(
                        ErrorKind::InvalidArgument,
                        "shape must be a sequence of integers",
                    )
                })
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(ArrayError::new(
                ErrorKind::InvalidArgument,
                "shape must be a sequence of integers",
            ))
        }
    };
    let descr = match dict.get("typestr") {
        Some(Value::Str(s)) => Descr::from_typestr(s)?,
        _ => {
            return Err(ArrayError::new(
                ErrorKind::TypeMismatch,
                "typestr must be a string",
            ))
        }
    };
    let mut flags = ArrayFlags::BEHAVED;
    let data_ptr = match dict.get("data") {
        Some(Value::Tuple(pair)) => {
            if pair.len() != 2 {
                return Err(ArrayError::new(
                    ErrorKind::TypeMismatch,
                    "data must be a (pointer, read-only flag) pair",
                ));
            }
            let addr = match &pair[0] {
                Value::Int(_) | Value::UInt(_) => pair[0].as_u64().ok_or_else(|| {
                    ArrayError::new(ErrorKind::TypeMismatch, "data pointer does not fit")
                })? as usize,
                Value::Str(s) => parse_pointer(s)?,
                _ => {
                    return Err(ArrayError::new(
                        ErrorKind::TypeMismatch,
                        "first element of data pair must be integer or string",
                    ))
                }
            };
            if pair[1].as_bool().unwrap_or(false) {
                flags.remove(ArrayFlags::WRITEABLE);
            }
            addr as *mut u8
        }
        Some(_) => {
            return Err(ArrayError::new(
                ErrorKind::TypeMismatch,
                "data must be a (pointer, read-only flag) pair",
            ))
        }
        None => {
            // no data entry: read the exporting object itself
            let export = base.buffer().ok_or_else(|| {
                ArrayError::new(ErrorKind::TypeMismatch, "object does not expose its memory")
            })?;
            if export.readonly {
                flags.remove(ArrayFlags::WRITEABLE);
            }
            let mut ptr = export.ptr as *mut u8;
            if let Some(off) = dict.get("offset") {
                let off = off.as_i64().ok_or_else(|| {
                    ArrayError::new(ErrorKind::TypeMismatch, "offset must be an integer")
                })?;
                ptr = (ptr as isize + off as isize) as *mut u8;
            }
            ptr
        }
    };
    let mut a = Array::new_from_descr(
        None,
        descr,
        &dims,
        None,
        Some(ArrayData::Foreign {
            ptr: data_ptr,
            base: Arc::clone(base),
        }),
        flags,
        None,
    )?;
    // strides after the fact; malformed entries are dropped, not fatal
    if let Some(Value::Seq(s) | Value::Tuple(s)) = dict.get("strides") {
        if s.len() == a.ndim() {
            if let Some(st) = s
                .iter()
                .map(|x| x.as_i64().map(|i| i as isize))
                .collect::<Option<Vec<_>>>()
            {
                a.strides = st;
            }
        }
    }
    a.update_flags();
    Ok(a)
}

/// Invoke the object's as-array callable, retrying without the context
/// value when the call signature rejects it. `None` means the capability
/// is absent altogether.
pub(crate) fn from_array_attr(
    f: &Arc<dyn Foreign>,
    descr: Option<&Descr>,
    context: Option<&Value>,
) -> Option<Result<Array, ArrayError>> {
    let result = match f.as_array(descr, context) {
        Some(r) => r,
        None => {
            if context.is_some() {
                f.as_array(descr, None)?
            } else {
                return None;
            }
        }
    };
    Some(match result {
        Ok(Value::Array(a)) => Ok(a),
        Ok(_) => Err(ArrayError::new(
            ErrorKind::Internal,
            "as-array method did not produce an array",
        )),
        Err(e) => Err(e),
    })
}

/// Parse a pointer spelled as a decimal or `0x`-prefixed hex string.
fn parse_pointer(s: &str) -> Result<usize, ArrayError> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| ArrayError::new(ErrorKind::TypeMismatch, "data string cannot be converted"))
}
