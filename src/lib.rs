// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `ndcore` crate constructs N-dimensional strided arrays from
//! heterogeneous sources.
//!
//! An [`Array`] is an owning or borrowing view over a contiguous block of
//! bytes, described by a shape, per-axis byte strides, a shared element
//! [`Descr`] and a set of [`ArrayFlags`]. Arrays are built from:
//!
//! - nested sequences and scalars ([`from_object`], [`asarray`]),
//! - raw memory and foreign interchange objects (buffer, struct and
//!   dictionary exports on the [`Foreign`] trait),
//! - binary and text files and strings ([`from_file`], [`from_bytes`]),
//! - iterators with amortized growth ([`from_iter`]),
//! - numeric ranges ([`arange`]).
//!
//! Existing arrays exchange contents through [`copy_into`] and the
//! overlap-safe [`move_into`].
//!
//! ## Memory layout
//!
//! Strides are byte offsets and may be negative. When a constructor derives
//! strides itself it produces C order (last axis varies fastest) or Fortran
//! order (first axis varies fastest) from the `FORTRAN` flag bit. Every
//! constructor either returns a fully initialized array or an error and
//! nothing else; partially built arrays never escape.

use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::sync::Arc;

#[macro_use]
mod value;
mod assign;
mod buffer;
mod copy;
mod descriptor;
pub mod dimension;
mod discovery;
mod error;
mod flags;
mod free_functions;
mod impl_constructors;
mod impl_methods;
mod interchange;
mod iterators;
mod range;
mod stream;
mod strided;
mod transfer;

pub use crate::descriptor::{can_cast_safely, ByteOrder, Descr, Subarray, Typecode};
pub use crate::error::{from_kind, ArrayError, ErrorKind};
pub use crate::flags::ArrayFlags;
pub use crate::free_functions::{asarray, ascontiguous, from_object, from_object_with_depth};
pub use crate::copy::{copy_into, move_into};
pub use crate::impl_constructors::{ArrayData, Subtype};
pub use crate::range::arange;
pub use crate::stream::{from_bytes, from_file, from_iter};
pub use crate::value::{
    BufferExport, Foreign, InterfaceDict, StructCapsule, Value, STRUCT_CAPSULE_VERSION,
};

use crate::buffer::RawBuffer;

/// The maximum number of dimensions an array can have.
pub const MAX_DIMS: usize = 32;

/// What keeps an array's bytes alive, and whether the array frees them.
pub(crate) enum DataRepr {
    /// The array owns its allocation (possibly shared with views of it).
    Owned(Arc<RawBuffer>),
    /// The bytes belong to a foreign exporter kept alive as the base.
    Foreign(Arc<dyn Foreign>),
    /// A temporary copy; its contents are written back into `base` when the
    /// array is destroyed.
    CopyBack {
        buf: Arc<RawBuffer>,
        base: Box<Array>,
    },
    /// Caller-managed memory the array must never free.
    External,
}

/// An N-dimensional strided array over raw bytes.
///
/// The element type is carried at runtime by a [`Descr`]; all element access
/// goes through the descriptor's operation table.
pub struct Array {
    pub(crate) data: DataRepr,
    pub(crate) ptr: NonNull<u8>,
    pub(crate) dim: Vec<usize>,
    pub(crate) strides: Vec<isize>,
    pub(crate) descr: Descr,
    pub(crate) flags: ArrayFlags,
}

impl Drop for Array {
    fn drop(&mut self) {
        if self.flags.contains(ArrayFlags::UPDATEIFCOPY) {
            // Take the repr apart so the base and this array's bytes can be
            // used at the same time; `buf` keeps self.ptr valid throughout.
            let data = mem::replace(&mut self.data, DataRepr::External);
            if let DataRepr::CopyBack { buf, mut base } = data {
                base.flags.insert(ArrayFlags::WRITEABLE);
                let _ = copy::copy_into(&mut base, &*self);
                drop(base);
                drop(buf);
            }
        }
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.dim)
            .field("strides", &self.strides)
            .field("descr", &self.descr)
            .field("flags", &self.flags)
            .finish()
    }
}
