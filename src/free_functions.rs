// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Free construction functions: the entry points for building arrays
//! from loosely typed values.

use crate::error::ArrayError;
use crate::impl_constructors;
use crate::{Array, ArrayFlags, Descr, Value};

/// Build an array from any supported value.
///
/// Existing arrays are converted per the requested descriptor and
/// `flags`, foreign objects go through the interchange adapters in their
/// fixed priority order, nested sequences and scalars are discovered,
/// allocated and assigned. With no descriptor, the element type is
/// inferred from the leaves.
///
/// ```
/// use ndcore::{from_object, seq, ArrayFlags};
///
/// let a = from_object(seq![[1, 2], [3, 4]], None, ArrayFlags::EMPTY).unwrap();
/// assert_eq!(a.shape(), &[2, 2]);
/// ```
pub fn from_object(
    value: Value,
    descr: Option<Descr>,
    flags: ArrayFlags,
) -> Result<Array, ArrayError> {
    impl_constructors::from_object_impl(value, descr, 0, 0, flags, None)
}

/// Like [`from_object`], bounding the result's dimension count and
/// carrying a context value for as-array callables. A depth bound of
/// zero means unbounded.
pub fn from_object_with_depth(
    value: Value,
    descr: Option<Descr>,
    min_depth: usize,
    max_depth: usize,
    flags: ArrayFlags,
    context: Option<&Value>,
) -> Result<Array, ArrayError> {
    impl_constructors::from_object_impl(value, descr, min_depth, max_depth, flags, context)
}

/// Convert to an array, reusing the input without a copy when it already
/// is an array of a suitable type.
pub fn asarray(value: Value, descr: Option<Descr>) -> Result<Array, ArrayError> {
    from_object(value, descr, ArrayFlags::EMPTY)
}

/// Convert to a C-contiguous, aligned, writeable base array, copying
/// only when the input does not already qualify.
pub fn ascontiguous(value: Value, descr: Option<Descr>) -> Result<Array, ArrayError> {
    from_object(value, descr, ArrayFlags::CARRAY | ArrayFlags::ENSUREARRAY)
}
