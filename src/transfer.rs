// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strided transfer function selection.
//!
//! Given a source and a destination descriptor, [`select_transfer`] picks
//! the cheapest routine that moves one strided run between them: a raw
//! strided copy for identical layouts, copy plus in-place byte swap when
//! only the byte order differs, or an element-wise cast through the
//! descriptors' scalar operations for everything else.

use crate::descriptor::Descr;
use crate::error::ArrayError;
use crate::strided;

enum TransferKind {
    Direct,
    Swap { unit: usize, nunits: usize },
    Cast { src: Descr, dst: Descr },
}

/// A selected routine for copying one strided run of elements.
pub struct Transfer {
    kind: TransferKind,
    elsize: usize,
}

/// Select a transfer routine for the given descriptor pair.
///
/// The alignment and stride hints describe the traversal the caller intends
/// to run; the current strategies do not specialize on them.
pub fn select_transfer(
    _aligned: bool,
    _src_stride: isize,
    _dst_stride: isize,
    src: &Descr,
    dst: &Descr,
) -> Result<Transfer, ArrayError> {
    let kind = if src.typecode() == dst.typecode() && src.elsize() == dst.elsize() {
        if src.byteorder() == dst.byteorder() {
            TransferKind::Direct
        } else {
            TransferKind::Swap {
                unit: dst.swap_unit(),
                nunits: if dst.swap_unit() == 0 {
                    0
                } else {
                    dst.elsize() / dst.swap_unit()
                },
            }
        }
    } else {
        TransferKind::Cast {
            src: src.clone(),
            dst: dst.clone(),
        }
    };
    Ok(Transfer {
        kind,
        elsize: dst.elsize(),
    })
}

impl Transfer {
    /// Whether the routine calls back into descriptor scalar operations
    /// (and therefore may run arbitrary per-type conversion code).
    pub fn needs_api(&self) -> bool {
        matches!(self.kind, TransferKind::Cast { .. })
    }

    /// Copy `count` elements from the source run to the destination run.
    ///
    /// ## Safety
    ///
    /// Both runs must be valid for `count` strided elements of their
    /// descriptors' sizes, and the traversal direction must be safe for
    /// any overlap between them.
    pub unsafe fn exec(
        &self,
        dst: *mut u8,
        dst_stride: isize,
        src: *const u8,
        src_stride: isize,
        count: usize,
    ) -> Result<(), ArrayError> {
        match &self.kind {
            TransferKind::Direct => {
                strided::strided_copy(dst, dst_stride, src, src_stride, count, self.elsize);
                Ok(())
            }
            TransferKind::Swap { unit, nunits } => {
                strided::strided_copy(dst, dst_stride, src, src_stride, count, self.elsize);
                strided::byteswap_strided(dst, dst_stride, count, *unit, *nunits);
                Ok(())
            }
            TransferKind::Cast { src: sd, dst: dd } => {
                let mut s = src;
                let mut d = dst;
                for _ in 0..count {
                    let v = sd.getitem(s);
                    dd.setitem(&v, d)?;
                    s = s.offset(src_stride);
                    d = d.offset(dst_stride);
                }
                Ok(())
            }
        }
    }
}
