// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! C-order run iteration over strided layouts.
//!
//! Transfers never step element by element across the whole array; these
//! iterators hand out *maximal contiguous inner runs* — the largest block
//! of elements reachable with a single stride before the odometer has to
//! advance an outer axis.

use std::ptr::NonNull;

use rawpointer::PointerExt;

use crate::Array;

/// Yields `(pointer, stride, len)` runs of one array in C index order.
pub(crate) struct RunIter {
    base: NonNull<u8>,
    dims: Vec<usize>,
    strides: Vec<isize>,
    index: Vec<usize>,
    inner_stride: isize,
    inner_len: usize,
    remaining: usize,
}

/// Split a layout into outer odometer axes and one coalesced inner run.
///
/// Trailing axes merge into the run while stepping the next-outer axis is
/// exactly `run_len` inner steps, i.e. `strides[i] == inner_len * inner`.
fn coalesce(dims: &[usize], strides: &[isize], elsize: usize) -> (Vec<usize>, Vec<isize>, isize, usize) {
    let nd = dims.len();
    if nd == 0 {
        return (Vec::new(), Vec::new(), elsize as isize, 1);
    }
    let mut inner_stride = strides[nd - 1];
    let mut inner_len = dims[nd - 1];
    let mut cut = nd - 1;
    while cut > 0 {
        let i = cut - 1;
        if dims[i] == 1 || strides[i] == inner_len as isize * inner_stride {
            inner_len *= dims[i];
            cut = i;
        } else {
            break;
        }
    }
    (dims[..cut].to_vec(), strides[..cut].to_vec(), inner_stride, inner_len)
}

impl RunIter {
    pub(crate) fn new(a: &Array) -> RunIter {
        Self::from_parts(a.ptr_nonnull(), a.shape(), a.strides(), a.itemsize())
    }

    pub(crate) fn from_parts(
        base: NonNull<u8>,
        dims: &[usize],
        strides: &[isize],
        elsize: usize,
    ) -> RunIter {
        let size: usize = dims.iter().product();
        let (odims, ostrides, inner_stride, inner_len) = coalesce(dims, strides, elsize);
        let remaining = if size == 0 {
            0
        } else {
            odims.iter().product()
        };
        let index = vec![0; odims.len()];
        RunIter {
            base,
            dims: odims,
            strides: ostrides,
            index,
            inner_stride,
            inner_len,
            remaining,
        }
    }

    /// Length of every run this iterator produces.
    #[inline]
    pub(crate) fn run_len(&self) -> usize {
        self.inner_len
    }

    #[inline]
    pub(crate) fn run_stride(&self) -> isize {
        self.inner_stride
    }

    pub(crate) fn next_run(&mut self) -> Option<(*mut u8, isize, usize)> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let mut p = self.base;
        for (k, &i) in self.index.iter().enumerate() {
            p = unsafe { p.stride_offset(self.strides[k], i) };
        }
        // odometer: last outer axis varies fastest
        for k in (0..self.dims.len()).rev() {
            self.index[k] += 1;
            if self.index[k] < self.dims[k] {
                break;
            }
            self.index[k] = 0;
        }
        Some((p.as_ptr(), self.inner_stride, self.inner_len))
    }
}

/// Lockstep C-order run iteration over two arrays of identical shape.
pub(crate) struct SyncRunIter {
    a_base: NonNull<u8>,
    b_base: NonNull<u8>,
    dims: Vec<usize>,
    a_strides: Vec<isize>,
    b_strides: Vec<isize>,
    index: Vec<usize>,
    a_inner: isize,
    b_inner: isize,
    inner_len: usize,
    remaining: usize,
}

impl SyncRunIter {
    pub(crate) fn new(a: &Array, b: &Array) -> SyncRunIter {
        debug_assert_eq!(a.shape(), b.shape());
        let dims = a.shape();
        let nd = dims.len();
        let size: usize = dims.iter().product();
        // coalesce only axes that collapse for both layouts at once
        let (a_inner, b_inner) = if nd == 0 {
            (a.itemsize() as isize, b.itemsize() as isize)
        } else {
            (a.strides()[nd - 1], b.strides()[nd - 1])
        };
        let mut inner_len = if nd == 0 { 1 } else { dims[nd - 1] };
        let mut cut = nd.saturating_sub(1);
        while cut > 0 {
            let i = cut - 1;
            let merged_a = a.strides()[i] == inner_len as isize * a_inner;
            let merged_b = b.strides()[i] == inner_len as isize * b_inner;
            if dims[i] == 1 || (merged_a && merged_b) {
                inner_len *= dims[i];
                cut = i;
            } else {
                break;
            }
        }
        let odims = dims[..cut].to_vec();
        let remaining = if size == 0 { 0 } else { odims.iter().product() };
        SyncRunIter {
            a_base: a.ptr_nonnull(),
            b_base: b.ptr_nonnull(),
            a_strides: a.strides()[..cut].to_vec(),
            b_strides: b.strides()[..cut].to_vec(),
            index: vec![0; odims.len()],
            dims: odims,
            a_inner,
            b_inner,
            inner_len,
            remaining,
        }
    }

    /// `(a_stride, b_stride, len)` of every synchronized run.
    #[inline]
    pub(crate) fn inner(&self) -> (isize, isize, usize) {
        (self.a_inner, self.b_inner, self.inner_len)
    }

    pub(crate) fn next_pair(&mut self) -> Option<(*mut u8, *mut u8)> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let mut pa = self.a_base;
        let mut pb = self.b_base;
        for (k, &i) in self.index.iter().enumerate() {
            pa = unsafe { pa.stride_offset(self.a_strides[k], i) };
            pb = unsafe { pb.stride_offset(self.b_strides[k], i) };
        }
        for k in (0..self.dims.len()).rev() {
            self.index[k] += 1;
            if self.index[k] < self.dims[k] {
                break;
            }
            self.index[k] = 0;
        }
        Some((pa.as_ptr(), pb.as_ptr()))
    }
}
