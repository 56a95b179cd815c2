// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bulk copy and overlap-safe move between existing arrays.

use crate::dimension;
use crate::error::{ArrayError, ErrorKind};
use crate::iterators::{RunIter, SyncRunIter};
use crate::transfer::select_transfer;
use crate::Array;

/// The one-run traversal of the whole array, if its layout admits one.
fn trivial_run(a: &Array) -> Option<(*mut u8, isize)> {
    let mut it = RunIter::new(a);
    if it.run_len() == a.size() {
        it.next_run().map(|(p, s, _)| (p, s))
    } else {
        None
    }
}

/// Copy the contents of `src` into `dst`.
///
/// Matching shapes copy directly; differing shapes with equal element
/// counts copy in flattened C order on both sides. Elements are converted
/// through the transfer routine selected for the two descriptors.
///
/// ***Errors*** with `Permission` when `dst` is read-only and
/// `ShapeMismatch` when the element counts are incompatible. A zero-size
/// transfer is a no-op, except that a 0-d source may be "copied" into a
/// zero-size destination.
pub fn copy_into(dst: &mut Array, src: &Array) -> Result<(), ArrayError> {
    if !dst.is_writeable() {
        return Err(ArrayError::new(ErrorKind::Permission, "cannot write to array"));
    }
    if src.size() == 0 {
        if dst.size() == 0 {
            return Ok(());
        }
        return Err(ArrayError::new(
            ErrorKind::ShapeMismatch,
            "cannot copy from zero-sized array",
        ));
    }
    if dst.size() == 0 {
        // a scalar may be assigned to anything, even an empty array
        if src.ndim() == 0 {
            return Ok(());
        }
        return Err(ArrayError::new(
            ErrorKind::ShapeMismatch,
            "cannot copy to zero-sized array",
        ));
    }
    if dst.shape() == src.shape() {
        copy_same_shape(dst, src)
    } else if dst.size() == src.size() {
        copy_as_flat(dst, src)
    } else {
        Err(ArrayError::new(
            ErrorKind::ShapeMismatch,
            "arrays must have the same number of elements for copy",
        ))
    }
}

fn copy_same_shape(dst: &mut Array, src: &Array) -> Result<(), ArrayError> {
    let aligned = dst.is_aligned() && src.is_aligned();
    if let (Some((mut dst_data, mut dst_stride)), Some((mut src_data, mut src_stride))) =
        (trivial_run(dst), trivial_run(src))
    {
        let count = dst.size();
        // overlapping forward ranges run in reverse element order so a
        // reversal-style self-assignment lands correctly
        if dst_data > src_data
            && src_stride > 0
            && dst_stride > 0
            && (dst_data as usize) < src_data as usize + src_stride as usize * count
            && (src_data as usize) < dst_data as usize + dst_stride as usize * count
        {
            unsafe {
                dst_data = dst_data.offset(dst_stride * (count - 1) as isize);
                src_data = src_data.offset(src_stride * (count - 1) as isize);
            }
            dst_stride = -dst_stride;
            src_stride = -src_stride;
        }
        let t = select_transfer(aligned, src_stride, dst_stride, src.descr(), dst.descr())?;
        unsafe { t.exec(dst_data, dst_stride, src_data, src_stride, count) }
    } else {
        let mut it = SyncRunIter::new(dst, src);
        let (dst_stride, src_stride, len) = it.inner();
        let t = select_transfer(aligned, src_stride, dst_stride, src.descr(), dst.descr())?;
        while let Some((pd, ps)) = it.next_pair() {
            unsafe { t.exec(pd, dst_stride, ps, src_stride, len)? };
        }
        Ok(())
    }
}

/// Matching C-order traversals of both sides, transferring the biggest
/// sub-chunk that fits the current run of each at every step.
fn copy_as_flat(dst: &mut Array, src: &Array) -> Result<(), ArrayError> {
    let mut dst_it = RunIter::new(dst);
    let mut src_it = RunIter::new(src);
    let dst_stride = dst_it.run_stride();
    let src_stride = src_it.run_stride();
    let t = select_transfer(
        dst.is_aligned() && src.is_aligned(),
        src_stride,
        dst_stride,
        src.descr(),
        dst.descr(),
    )?;
    let (mut dst_data, _, mut dst_count) = match dst_it.next_run() {
        Some(r) => r,
        None => return Ok(()),
    };
    let (mut src_data, _, mut src_count) = match src_it.next_run() {
        Some(r) => r,
        None => return Ok(()),
    };
    loop {
        let count = dst_count.min(src_count);
        unsafe { t.exec(dst_data, dst_stride, src_data, src_stride, count)? };

        if dst_count == count {
            match dst_it.next_run() {
                Some((p, _, c)) => {
                    dst_data = p;
                    dst_count = c;
                }
                None => break,
            }
        } else {
            dst_count -= count;
            dst_data = unsafe { dst_data.offset(dst_stride * count as isize) };
        }

        if src_count == count {
            match src_it.next_run() {
                Some((p, _, c)) => {
                    src_data = p;
                    src_count = c;
                }
                None => break,
            }
        } else {
            src_count -= count;
            src_data = unsafe { src_data.offset(src_stride * count as isize) };
        }
    }
    Ok(())
}

/// Move the contents of `src` into `dst`, allowing the two to overlap.
///
/// Overlapping moves with arbitrary strides are hard to get right in
/// place; rather than being clever, this checks for overlap and routes
/// through a temporary copy shaped and ordered like `dst` when one
/// exists. Two 1-d operands with positive strides are safe to hand to
/// [`copy_into`] directly, which reverses the traversal as needed.
pub fn move_into(dst: &mut Array, src: &Array) -> Result<(), ArrayError> {
    let one_d_forward = dst.ndim() == 1
        && src.ndim() == 1
        && dst.strides()[0] > 0
        && src.strides()[0] > 0;
    if one_d_forward || !dimension::extents_overlap(dst.extents(), src.extents()) {
        return copy_into(dst, src);
    }
    let fortran = dst.is_f_contiguous() && !dst.is_c_contiguous();
    let mut tmp = Array::empty(dst.descr().clone(), dst.shape(), fortran)?;
    copy_into(&mut tmp, src)?;
    copy_into(dst, &tmp)
}
