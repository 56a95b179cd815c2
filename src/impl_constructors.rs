// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Constructor methods for arrays.

use std::ptr;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::assign;
use crate::buffer::RawBuffer;
use crate::copy;
use crate::descriptor::{can_cast_safely, Typecode};
use crate::dimension;
use crate::discovery;
use crate::error::{ArrayError, ErrorKind};
use crate::interchange;
use crate::{Array, ArrayFlags, DataRepr, Descr, Foreign, Value, MAX_DIMS};

/// A specialized array subtype: a finalize hook invoked after construction,
/// allowing subtype-specific initialization. A failing hook aborts the
/// construction.
pub struct Subtype {
    pub name: &'static str,
    pub finalize: Option<fn(&mut Array, Option<&Value>) -> Result<(), ArrayError>>,
}

/// Externally supplied memory for the canonical constructor.
pub enum ArrayData {
    /// Caller-managed memory; the array never claims ownership.
    External(*mut u8),
    /// Memory owned by a foreign exporter the array keeps alive as base.
    Foreign {
        ptr: *mut u8,
        base: Arc<dyn Foreign>,
    },
}

impl Array {
    /// The canonical constructor.
    ///
    /// Computes strides from `dims` and the `FORTRAN` bit of `flags` when
    /// `strides` is absent, allocates fresh storage when `data` is absent
    /// (at least one element's worth, so raw access to an empty array stays
    /// valid), and otherwise wraps the supplied memory without claiming
    /// ownership. Subarray descriptors are expanded here, exactly once, by
    /// splicing their shape onto the end of `dims`.
    ///
    /// When `data` is supplied, the `ALIGNED` and `WRITEABLE` bits of
    /// `flags` are taken as caller-declared properties of that memory;
    /// contiguity is always recomputed from the final layout.
    ///
    /// ***Errors*** with `InvalidArgument` for a bad dimension count or a
    /// zero-size element type that is not a text type, `ArrayTooBig` when
    /// the byte size overflows, and `OutOfMemory` when allocation fails.
    pub fn new_from_descr(
        subtype: Option<&Subtype>,
        descr: Descr,
        dims: &[usize],
        strides: Option<&[isize]>,
        data: Option<ArrayData>,
        flags: ArrayFlags,
        context: Option<&Value>,
    ) -> Result<Array, ArrayError> {
        // expand subarray descriptors by splicing their shape on the end
        if let Some(sub) = descr.subarray() {
            let mut expanded = dims.to_vec();
            expanded.extend_from_slice(&sub.shape);
            let new_strides = strides.map(|outer| {
                let mut st = outer.to_vec();
                let mut tail = vec![0isize; sub.shape.len()];
                let mut sd = sub.base.elsize() as isize;
                for i in (0..sub.shape.len()).rev() {
                    tail[i] = sd;
                    sd *= if sub.shape[i] != 0 { sub.shape[i] as isize } else { 1 };
                }
                st.extend(tail);
                st
            });
            let base = sub.base.clone();
            return Array::new_from_descr(
                subtype,
                base,
                &expanded,
                new_strides.as_deref(),
                data,
                flags,
                context,
            );
        }

        if dims.len() > MAX_DIMS {
            return Err(ArrayError::new(
                ErrorKind::InvalidArgument,
                "number of dimensions must be within MAX_DIMS",
            ));
        }
        let descr = if descr.elsize() == 0 {
            match descr.typecode() {
                Typecode::Bytes => descr.with_elsize(1),
                Typecode::Unicode => descr.with_elsize(4),
                _ => {
                    return Err(ArrayError::new(
                        ErrorKind::InvalidArgument,
                        "data-type must provide an itemsize",
                    ))
                }
            }
        } else {
            descr
        };
        let elsize = descr.elsize();
        let size = dimension::checked_size(dims, elsize)?;

        let mut objflags = ArrayFlags::EMPTY;
        let (strides_vec, sd) = match strides {
            None => {
                let fortran = flags.contains(ArrayFlags::FORTRAN)
                    && !flags.contains(ArrayFlags::CONTIGUOUS);
                dimension::fill_contiguous_strides(dims, elsize, fortran, &mut objflags)
            }
            Some(s) => {
                if s.len() != dims.len() {
                    return Err(ArrayError::new(
                        ErrorKind::InvalidArgument,
                        "strides must match the number of dimensions",
                    ));
                }
                (s.to_vec(), size * elsize)
            }
        };

        let mut ret = match data {
            None => {
                let nbytes = sd.max(elsize);
                let buf = Arc::new(RawBuffer::allocate(
                    nbytes,
                    descr.alignment(),
                    descr.needs_init(),
                )?);
                let ptr = buf.as_nonnull();
                let fl = objflags | ArrayFlags::OWNDATA | ArrayFlags::BEHAVED;
                let mut a = unsafe {
                    Array::from_raw_parts(
                        DataRepr::Owned(buf),
                        ptr,
                        dims.to_vec(),
                        strides_vec,
                        descr,
                        fl,
                    )
                };
                if strides.is_some() {
                    // caller-supplied strides: layout flags reflect them
                    a.update_flags();
                }
                a
            }
            Some(supplied) => {
                let (raw, repr) = match supplied {
                    ArrayData::External(p) => (p, DataRepr::External),
                    ArrayData::Foreign { ptr, base } => (ptr, DataRepr::Foreign(base)),
                };
                let ptr = NonNull::new(raw).ok_or_else(|| {
                    ArrayError::new(ErrorKind::InvalidArgument, "data pointer must not be null")
                })?;
                let fl = flags & (ArrayFlags::ALIGNED | ArrayFlags::WRITEABLE);
                let mut a = unsafe {
                    Array::from_raw_parts(repr, ptr, dims.to_vec(), strides_vec, descr, fl)
                };
                // contiguity always reflects the actual layout; alignment
                // and writeability stay as the caller declared them
                let declared = a.flags;
                a.update_flags();
                a.flags.set(
                    ArrayFlags::ALIGNED,
                    declared.contains(ArrayFlags::ALIGNED),
                );
                a
            }
        };

        if let Some(st) = subtype {
            if !flags.contains(ArrayFlags::ENSUREARRAY) {
                if let Some(finalize) = st.finalize {
                    finalize(&mut ret, context)?;
                }
            }
        }
        Ok(ret)
    }

    /// Create an uninitialized array of the given shape and order.
    pub fn empty(descr: Descr, dims: &[usize], fortran: bool) -> Result<Array, ArrayError> {
        let flags = if fortran {
            ArrayFlags::FORTRAN
        } else {
            ArrayFlags::EMPTY
        };
        Array::new_from_descr(None, descr, dims, None, None, flags, None)
    }

    /// Create a zero-filled array of the given shape and order.
    pub fn zeros(descr: Descr, dims: &[usize], fortran: bool) -> Result<Array, ArrayError> {
        let mut a = Array::empty(descr, dims, fortran)?;
        let nbytes = match &a.data {
            DataRepr::Owned(buf) => buf.len(),
            _ => 0,
        };
        unsafe {
            ptr::write_bytes(a.as_mut_ptr(), 0, nbytes);
        }
        Ok(a)
    }
}

/// Build a 0-d array holding one scalar.
pub(crate) fn from_scalar(value: &Value, descr: Descr) -> Result<Array, ArrayError> {
    let descr = if descr.is_extended() && descr.elsize() == 0 {
        let mut itemsize = 0;
        discovery::discover_itemsize(value, 0, &mut itemsize)?;
        if descr.typecode() == Typecode::Unicode {
            itemsize *= 4;
        }
        descr.with_elsize(itemsize)
    } else {
        descr
    };
    let mut r = Array::new_from_descr(None, descr, &[], None, None, ArrayFlags::EMPTY, None)?;
    let p = r.as_mut_ptr();
    unsafe {
        r.descr.setitem(value, p)?;
    }
    Ok(r)
}

/// Build an array from a nested sequence (or a scalar, at depth 0) by
/// discovering its depth, extents and item size, allocating, and assigning
/// element by element.
pub(crate) fn from_sequence(
    value: &Value,
    descr: Descr,
    fortran: bool,
    min_depth: usize,
    max_depth: usize,
) -> Result<Array, ArrayError> {
    let tc = descr.typecode();
    // a char-like target descends into strings and tolerates ragged shapes
    let check_it = tc != Typecode::Char;
    let stop_at_string = tc != Typecode::Char;
    let stop_at_tuple = descr.subarray().is_some();

    let mut nd = discovery::discover_depth(value, MAX_DIMS + 1, stop_at_string, stop_at_tuple)?;
    if nd == 0 {
        return from_scalar(value, descr);
    }
    if (max_depth != 0 && nd > max_depth) || (min_depth != 0 && nd < min_depth) {
        return Err(ArrayError::new(
            ErrorKind::InvalidArgument,
            "invalid number of dimensions",
        ));
    }
    let mut dims = vec![0usize; nd];
    discovery::discover_dims(value, nd, &mut dims, check_it)?;
    // a string is not both "N characters" and "1 string"
    if tc == Typecode::Char && nd > 0 && dims[nd - 1] == 1 {
        nd -= 1;
    }
    let descr = if descr.elsize() == 0 && descr.is_extended() {
        let mut itemsize = 0;
        discovery::discover_itemsize(value, nd, &mut itemsize)?;
        if tc == Typecode::Unicode {
            itemsize *= 4;
        }
        descr.with_elsize(itemsize)
    } else {
        descr
    };
    let flags = if fortran {
        ArrayFlags::FORTRAN
    } else {
        ArrayFlags::EMPTY
    };
    let mut r = Array::new_from_descr(None, descr, &dims[..nd], None, None, flags, None)?;
    assign::assign_array(&mut r, value)?;
    Ok(r)
}

/// Convert an existing array per the requested descriptor and flags,
/// copying only when a request cannot be satisfied in place.
pub(crate) fn from_array(
    src: Array,
    newtype: Option<Descr>,
    flags: ArrayFlags,
) -> Result<Array, ArrayError> {
    let mut descr = newtype.unwrap_or_else(|| src.descr.clone());
    if descr.is_extended() && descr.elsize() == 0 {
        descr = descr.with_elsize(src.descr.elsize());
    }
    if descr != src.descr
        && !can_cast_safely(&src.descr, &descr)
        && !flags.contains(ArrayFlags::FORCECAST)
    {
        return Err(ArrayError::new(
            ErrorKind::TypeMismatch,
            "array cannot be safely cast to required type",
        ));
    }
    let needs_copy = flags.contains(ArrayFlags::ENSURECOPY)
        || (flags.contains(ArrayFlags::CONTIGUOUS) && !src.is_c_contiguous())
        || (flags.contains(ArrayFlags::FORTRAN) && !src.is_f_contiguous())
        || (flags.contains(ArrayFlags::ALIGNED) && !src.is_aligned())
        || (flags.contains(ArrayFlags::WRITEABLE) && !src.is_writeable())
        || (flags.contains(ArrayFlags::ELEMENTSTRIDES)
            && !dimension::element_strides_ok(&src.strides, src.descr.elsize()))
        || descr != src.descr;
    if !needs_copy {
        return Ok(src);
    }
    if flags.contains(ArrayFlags::UPDATEIFCOPY) && !src.is_writeable() {
        return Err(ArrayError::new(
            ErrorKind::Permission,
            "cannot copy back to a read-only array",
        ));
    }
    let fortran = flags.contains(ArrayFlags::FORTRAN) && !flags.contains(ArrayFlags::CONTIGUOUS);
    let mut ret = Array::empty(descr, src.shape(), fortran)?;
    copy::copy_into(&mut ret, &src)?;
    if flags.contains(ArrayFlags::UPDATEIFCOPY) {
        let mut base = src;
        // the base must not change underneath the pending copy-back
        base.flags.remove(ArrayFlags::WRITEABLE);
        let buf = match std::mem::replace(&mut ret.data, DataRepr::External) {
            DataRepr::Owned(buf) => buf,
            other => {
                ret.data = other;
                return Err(ArrayError::new(
                    ErrorKind::Internal,
                    "copy result does not own its buffer",
                ));
            }
        };
        ret.data = DataRepr::CopyBack {
            buf,
            base: Box::new(base),
        };
        ret.flags.insert(ArrayFlags::UPDATEIFCOPY);
    }
    Ok(ret)
}

/// The generic entry point: build an array from any supported value.
///
/// Dispatch tries, in order: existing arrays, foreign interchange
/// capabilities (buffer, struct capsule, interchange dictionary, as-array
/// callable), then nested sequences and scalars.
pub(crate) fn from_object_impl(
    value: Value,
    descr: Option<Descr>,
    min_depth: usize,
    max_depth: usize,
    flags: ArrayFlags,
    context: Option<&Value>,
) -> Result<Array, ArrayError> {
    match value {
        Value::Array(a) => {
            let nd = a.ndim();
            if (max_depth != 0 && nd > max_depth) || (min_depth != 0 && nd < min_depth) {
                return Err(ArrayError::new(
                    ErrorKind::InvalidArgument,
                    "invalid number of dimensions",
                ));
            }
            from_array(a, descr, flags)
        }
        Value::Foreign(f) => {
            let base = if let Some(export) = f.buffer() {
                interchange::from_buffer_export(&f, export)?
            } else if let Some(capsule) = f.struct_export() {
                interchange::from_struct_export(&f, capsule)?
            } else if let Some(dict) = f.dict_export() {
                interchange::from_interface(&f, dict)?
            } else if let Some(arr) = interchange::from_array_attr(&f, descr.as_ref(), context) {
                arr?
            } else {
                return Err(ArrayError::new(
                    ErrorKind::TypeMismatch,
                    "object does not expose an array interchange capability",
                ));
            };
            from_array(base, descr, flags)
        }
        other => {
            let descr = match descr {
                Some(d) => d,
                None => discovery::infer_descr(&other),
            };
            let fortran =
                flags.contains(ArrayFlags::FORTRAN) && !flags.contains(ArrayFlags::CONTIGUOUS);
            // a fresh sequence result is already a behaved copy, so the
            // request flags are satisfied by construction
            from_sequence(&other, descr, fortran, min_depth, max_depth)
        }
    }
}
