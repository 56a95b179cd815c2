// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Element type descriptors.
//!
//! A [`Descr`] bundles the element size, byte order and the per-type
//! operation table (scalar store/load, text parsing, progression fill,
//! comparison) for one element type. Descriptors are shared values; mutate
//! them only through the copy-on-write helpers so a shared instance is never
//! changed in place.

use std::cmp::Ordering;
use std::mem;
use std::ptr;
use std::sync::Arc;

use num_complex::Complex;
use num_traits::NumCast;

use crate::error::{ArrayError, ErrorKind};
use crate::value::Value;

/// Element type codes of the builtin registry.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Typecode {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    /// Fixed-size byte strings (`S` in type strings).
    Bytes,
    /// Fixed-size text with 4-byte code units (`U` in type strings).
    Unicode,
    /// A single character; nested strings are descended into rather than
    /// treated as leaves when discovering dimensions for this type.
    Char,
}

impl Typecode {
    /// The element size a freshly looked-up descriptor gets; 0 for the
    /// variable-width types, which size themselves during discovery.
    pub fn default_elsize(self) -> usize {
        use Typecode::*;
        match self {
            Bool | Int8 | UInt8 | Char => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 => 4,
            Int64 | UInt64 | Float64 | Complex64 => 8,
            Complex128 => 16,
            Bytes | Unicode => 0,
        }
    }

    /// Required address alignment for the element type.
    pub fn alignment(self) -> usize {
        use Typecode::*;
        match self {
            Bool | Int8 | UInt8 | Bytes | Char => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 | Unicode => 4,
            Int64 | UInt64 | Float64 | Complex64 | Complex128 => 8,
        }
    }

    /// Variable-width types size themselves from the data.
    pub fn is_extended(self) -> bool {
        matches!(self, Typecode::Bytes | Typecode::Unicode)
    }

    fn is_int(self) -> bool {
        use Typecode::*;
        matches!(self, Int8 | Int16 | Int32 | Int64)
    }

    fn is_uint(self) -> bool {
        use Typecode::*;
        matches!(self, UInt8 | UInt16 | UInt32 | UInt64)
    }

    fn is_float(self) -> bool {
        matches!(self, Typecode::Float32 | Typecode::Float64)
    }

    fn is_complex(self) -> bool {
        matches!(self, Typecode::Complex64 | Typecode::Complex128)
    }

    pub(crate) fn is_numeric(self) -> bool {
        self.is_int() || self.is_uint() || self.is_float() || self.is_complex()
            || self == Typecode::Bool
    }
}

/// Byte order of the stored elements relative to the platform.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ByteOrder {
    Native,
    Swapped,
}

/// A descriptor whose elements are themselves fixed-size arrays; expanded
/// once at construction time by splicing `shape` onto the outer shape.
#[derive(Clone, PartialEq, Debug)]
pub struct Subarray {
    pub base: Descr,
    pub shape: Vec<usize>,
}

#[derive(Clone, PartialEq, Debug)]
struct DescrInner {
    typecode: Typecode,
    elsize: usize,
    byteorder: ByteOrder,
    subarray: Option<Subarray>,
}

/// Shared element type descriptor; cheap to clone, mutated copy-on-write.
#[derive(Clone, PartialEq, Debug)]
pub struct Descr(Arc<DescrInner>);

impl Descr {
    /// Look up the descriptor for a builtin type code, with its default
    /// element size and native byte order.
    pub fn new(typecode: Typecode) -> Descr {
        Descr(Arc::new(DescrInner {
            typecode,
            elsize: typecode.default_elsize(),
            byteorder: ByteOrder::Native,
            subarray: None,
        }))
    }

    /// Parse an interchange type string such as `<i4`, `>f8`, `|b1`,
    /// `=c16`, `|S10` or `<U5`.
    pub fn from_typestr(s: &str) -> Result<Descr, ArrayError> {
        let bad = || ArrayError::new(ErrorKind::InvalidArgument, "could not understand type string");
        let bytes = s.as_bytes();
        let (order, rest) = match bytes.first() {
            Some(&c @ (b'<' | b'>' | b'=' | b'|')) => (c, &s[1..]),
            Some(_) => (b'|', s),
            None => return Err(bad()),
        };
        let kind = *rest.as_bytes().first().ok_or_else(bad)?;
        let size: usize = rest[1..].parse().map_err(|_| bad())?;
        let typecode = match (kind, size) {
            (b'b', 1) => Typecode::Bool,
            (b'i', 1) => Typecode::Int8,
            (b'i', 2) => Typecode::Int16,
            (b'i', 4) => Typecode::Int32,
            (b'i', 8) => Typecode::Int64,
            (b'u', 1) => Typecode::UInt8,
            (b'u', 2) => Typecode::UInt16,
            (b'u', 4) => Typecode::UInt32,
            (b'u', 8) => Typecode::UInt64,
            (b'f', 4) => Typecode::Float32,
            (b'f', 8) => Typecode::Float64,
            (b'c', 8) => Typecode::Complex64,
            (b'c', 16) => Typecode::Complex128,
            (b'S' | b'a', _) => Typecode::Bytes,
            (b'U', _) => Typecode::Unicode,
            _ => return Err(bad()),
        };
        let elsize = match typecode {
            Typecode::Bytes => size,
            Typecode::Unicode => size * 4,
            _ => size,
        };
        let native_le = cfg!(target_endian = "little");
        let byteorder = match order {
            b'<' if !native_le => ByteOrder::Swapped,
            b'>' if native_le => ByteOrder::Swapped,
            _ => ByteOrder::Native,
        };
        let mut d = Descr::new(typecode);
        {
            let inner = d.make_mut();
            inner.elsize = elsize;
            inner.byteorder = byteorder;
        }
        Ok(d)
    }

    #[inline]
    pub fn typecode(&self) -> Typecode {
        self.0.typecode
    }

    #[inline]
    pub fn elsize(&self) -> usize {
        self.0.elsize
    }

    #[inline]
    pub fn byteorder(&self) -> ByteOrder {
        self.0.byteorder
    }

    #[inline]
    pub fn subarray(&self) -> Option<&Subarray> {
        self.0.subarray.as_ref()
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.0.typecode.alignment()
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        self.0.byteorder == ByteOrder::Native || self.swap_unit() <= 1
    }

    /// Whether the type needs zero initialization of fresh storage.
    pub fn needs_init(&self) -> bool {
        false
    }

    /// Whether elements hold counted references that reallocation would
    /// invalidate. Always false for the builtin registry; streaming growth
    /// paths are gated on it regardless.
    pub fn holds_references(&self) -> bool {
        false
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        self.0.typecode.is_extended()
    }

    /// Clone-if-shared accessor; never mutates a shared instance in place.
    fn make_mut(&mut self) -> &mut DescrInner {
        Arc::make_mut(&mut self.0)
    }

    /// A copy with the given element size (copy-on-write).
    pub fn with_elsize(&self, elsize: usize) -> Descr {
        let mut d = self.clone();
        d.make_mut().elsize = elsize;
        d
    }

    /// A copy with the given byte order (copy-on-write).
    pub fn with_byteorder(&self, byteorder: ByteOrder) -> Descr {
        let mut d = self.clone();
        d.make_mut().byteorder = byteorder;
        d
    }

    /// A copy with a subarray attached (elements are `base`-typed blocks of
    /// the given shape).
    pub fn with_subarray(base: Descr, shape: Vec<usize>) -> Descr {
        let elsize = base.elsize() * shape.iter().product::<usize>();
        let mut d = Descr::new(base.typecode());
        {
            let inner = d.make_mut();
            inner.elsize = elsize;
            inner.byteorder = base.byteorder();
            inner.subarray = Some(Subarray { base, shape });
        }
        d
    }

    pub fn to_native(&self) -> Descr {
        self.with_byteorder(ByteOrder::Native)
    }

    /// Size of the elementary unit the byte-swap operates on: a code unit
    /// for text, one component for complex, the element itself otherwise.
    pub(crate) fn swap_unit(&self) -> usize {
        use Typecode::*;
        match self.0.typecode {
            Complex64 | Complex128 => self.0.elsize / 2,
            Unicode => 4,
            Bytes | Char => 1,
            _ => self.0.elsize,
        }
    }

    /// Store one scalar at `dst`.
    ///
    /// ## Safety
    ///
    /// `dst` must be valid for `elsize` bytes.
    pub unsafe fn setitem(&self, value: &Value, dst: *mut u8) -> Result<(), ArrayError> {
        use Typecode::*;
        match self.0.typecode {
            Bool => {
                let b = value
                    .as_bool()
                    .ok_or_else(|| ArrayError::new(ErrorKind::TypeMismatch, "cannot store value as boolean"))?;
                *dst = b as u8;
            }
            Int8 => self.set_num::<i8>(value, dst)?,
            Int16 => self.set_num::<i16>(value, dst)?,
            Int32 => self.set_num::<i32>(value, dst)?,
            Int64 => self.set_num::<i64>(value, dst)?,
            UInt8 => self.set_num::<u8>(value, dst)?,
            UInt16 => self.set_num::<u16>(value, dst)?,
            UInt32 => self.set_num::<u32>(value, dst)?,
            UInt64 => self.set_num::<u64>(value, dst)?,
            Float32 => self.set_num::<f32>(value, dst)?,
            Float64 => self.set_num::<f64>(value, dst)?,
            Complex64 => self.set_complex::<f32>(value, dst)?,
            Complex128 => self.set_complex::<f64>(value, dst)?,
            Bytes | Char => {
                let bytes = match value {
                    Value::Bytes(b) => b.clone(),
                    Value::Str(s) => s.clone().into_bytes(),
                    _ => {
                        return Err(ArrayError::new(
                            ErrorKind::TypeMismatch,
                            "cannot store value as a byte string",
                        ))
                    }
                };
                let n = bytes.len().min(self.0.elsize);
                ptr::copy_nonoverlapping(bytes.as_ptr(), dst, n);
                ptr::write_bytes(dst.add(n), 0, self.0.elsize - n);
            }
            Unicode => {
                let s = match value {
                    Value::Str(s) => s.as_str(),
                    _ => {
                        return Err(ArrayError::new(
                            ErrorKind::TypeMismatch,
                            "cannot store value as text",
                        ))
                    }
                };
                let units = self.0.elsize / 4;
                let mut chars = s.chars();
                for i in 0..units {
                    let u = chars.next().map(|c| c as u32).unwrap_or(0);
                    write_scalar::<u32>(dst.add(i * 4), u);
                }
                if self.0.byteorder == ByteOrder::Swapped {
                    swap_units(dst, 4, units);
                }
            }
        }
        Ok(())
    }

    unsafe fn set_num<T: Copy + NumCast>(&self, value: &Value, dst: *mut u8) -> Result<(), ArrayError> {
        let v: T = value
            .cast()
            .ok_or_else(|| ArrayError::new(ErrorKind::Overflow, "value does not fit in element type"))?;
        write_scalar(dst, v);
        if self.0.byteorder == ByteOrder::Swapped {
            swap_units(dst, mem::size_of::<T>(), 1);
        }
        Ok(())
    }

    unsafe fn set_complex<T: Copy + NumCast>(&self, value: &Value, dst: *mut u8) -> Result<(), ArrayError> {
        let c = value
            .as_complex()
            .ok_or_else(|| ArrayError::new(ErrorKind::TypeMismatch, "cannot store value as complex"))?;
        let re: T = NumCast::from(c.re)
            .ok_or_else(|| ArrayError::new(ErrorKind::Overflow, "value does not fit in element type"))?;
        let im: T = NumCast::from(c.im)
            .ok_or_else(|| ArrayError::new(ErrorKind::Overflow, "value does not fit in element type"))?;
        write_scalar(dst, re);
        write_scalar(dst.add(mem::size_of::<T>()), im);
        if self.0.byteorder == ByteOrder::Swapped {
            swap_units(dst, mem::size_of::<T>(), 2);
        }
        Ok(())
    }

    /// Load one scalar from `src`.
    ///
    /// ## Safety
    ///
    /// `src` must be valid for `elsize` bytes.
    pub unsafe fn getitem(&self, src: *const u8) -> Value {
        use Typecode::*;
        let swapped = self.0.byteorder == ByteOrder::Swapped;
        match self.0.typecode {
            Bool => Value::Bool(*src != 0),
            Int8 => Value::Int(read_scalar::<i8>(src, false) as i64),
            Int16 => Value::Int(read_scalar::<i16>(src, swapped) as i64),
            Int32 => Value::Int(read_scalar::<i32>(src, swapped) as i64),
            Int64 => Value::Int(read_scalar::<i64>(src, swapped)),
            UInt8 => Value::UInt(read_scalar::<u8>(src, false) as u64),
            UInt16 => Value::UInt(read_scalar::<u16>(src, swapped) as u64),
            UInt32 => Value::UInt(read_scalar::<u32>(src, swapped) as u64),
            UInt64 => Value::UInt(read_scalar::<u64>(src, swapped)),
            Float32 => Value::Float(read_scalar::<f32>(src, swapped) as f64),
            Float64 => Value::Float(read_scalar::<f64>(src, swapped)),
            Complex64 => Value::Complex(Complex::new(
                read_scalar::<f32>(src, swapped) as f64,
                read_scalar::<f32>(src.add(4), swapped) as f64,
            )),
            Complex128 => Value::Complex(Complex::new(
                read_scalar::<f64>(src, swapped),
                read_scalar::<f64>(src.add(8), swapped),
            )),
            Bytes | Char => {
                let mut raw = vec![0u8; self.0.elsize];
                ptr::copy_nonoverlapping(src, raw.as_mut_ptr(), self.0.elsize);
                while raw.last() == Some(&0) {
                    raw.pop();
                }
                Value::Bytes(raw)
            }
            Unicode => {
                let units = self.0.elsize / 4;
                let mut s = String::new();
                for i in 0..units {
                    let u = read_scalar::<u32>(src.add(i * 4), swapped);
                    if u == 0 {
                        break;
                    }
                    if let Some(c) = char::from_u32(u) {
                        s.push(c);
                    }
                }
                Value::Str(s)
            }
        }
    }

    /// Whether the type can be read from text streams.
    pub fn has_scan(&self) -> bool {
        self.0.typecode.is_numeric()
    }

    /// Parse the longest valid text prefix of `s` into `dst`, returning how
    /// many bytes of `s` were consumed. `None` means no element could be
    /// read at the current position.
    ///
    /// ## Safety
    ///
    /// `dst` must be valid for `elsize` bytes.
    pub unsafe fn parse_prefix(&self, s: &str, dst: *mut u8) -> Option<usize> {
        use Typecode::*;
        let s_trim = s.trim_start();
        let skipped = s.len() - s_trim.len();
        let (value, used) = match self.0.typecode {
            Bool | Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => {
                let n = int_prefix_len(s_trim);
                if n == 0 {
                    return None;
                }
                let v: i64 = s_trim[..n].parse().ok()?;
                (Value::Int(v), n)
            }
            Float32 | Float64 => {
                let n = float_prefix_len(s_trim);
                if n == 0 {
                    return None;
                }
                let v: f64 = s_trim[..n].parse().ok()?;
                (Value::Float(v), n)
            }
            Complex64 | Complex128 => {
                let (c, n) = complex_prefix(s_trim)?;
                (Value::Complex(c), n)
            }
            Bytes | Unicode | Char => return None,
        };
        self.setitem(&value, dst).ok()?;
        Some(skipped + used)
    }

    /// Bytes that may extend a text token of this type; used when pulling
    /// tokens out of a byte stream.
    pub(crate) fn scan_charset(&self) -> &'static [u8] {
        use Typecode::*;
        match self.0.typecode {
            Float32 | Float64 => b"+-0123456789.eEinfatyINFATY",
            Complex64 | Complex128 => b"+-0123456789.eEinfatyINFATYjJ",
            _ => b"+-0123456789",
        }
    }

    /// Extend the first two elements of `dst` into an arithmetic progression
    /// of `len` elements, natively in the element type.
    ///
    /// ## Safety
    ///
    /// `dst` must be valid for `len * elsize` bytes with the first two
    /// elements initialized; the descriptor must be in native byte order.
    pub unsafe fn fill(&self, dst: *mut u8, len: usize) -> Result<(), ArrayError> {
        use Typecode::*;
        debug_assert!(self.0.byteorder == ByteOrder::Native);
        match self.0.typecode {
            Int8 => fill_progression::<i8>(dst, len),
            Int16 => fill_progression::<i16>(dst, len),
            Int32 => fill_progression::<i32>(dst, len),
            Int64 => fill_progression::<i64>(dst, len),
            UInt8 => fill_progression::<u8>(dst, len),
            UInt16 => fill_progression::<u16>(dst, len),
            UInt32 => fill_progression::<u32>(dst, len),
            UInt64 => fill_progression::<u64>(dst, len),
            Float32 => fill_progression::<f32>(dst, len),
            Float64 => fill_progression::<f64>(dst, len),
            Complex64 => fill_progression::<Complex<f32>>(dst, len),
            Complex128 => fill_progression::<Complex<f64>>(dst, len),
            Bool | Bytes | Unicode | Char => {
                return Err(ArrayError::new(
                    ErrorKind::InvalidArgument,
                    "no fill-function for data-type.",
                ))
            }
        }
        Ok(())
    }

    /// Compare the elements at `a` and `b`.
    ///
    /// ## Safety
    ///
    /// Both pointers must be valid for `elsize` bytes.
    pub unsafe fn compare(&self, a: *const u8, b: *const u8) -> Ordering {
        use Typecode::*;
        match self.0.typecode {
            Bool | UInt8 | UInt16 | UInt32 | UInt64 => {
                let (x, y) = (self.getitem(a), self.getitem(b));
                x.as_u64().cmp(&y.as_u64())
            }
            Int8 | Int16 | Int32 | Int64 => {
                let (x, y) = (self.getitem(a), self.getitem(b));
                x.as_i64().cmp(&y.as_i64())
            }
            Float32 | Float64 => {
                let (x, y) = (self.getitem(a), self.getitem(b));
                x.as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal)
            }
            _ => {
                let sa = std::slice::from_raw_parts(a, self.0.elsize);
                let sb = std::slice::from_raw_parts(b, self.0.elsize);
                sa.cmp(sb)
            }
        }
    }
}

/// Whether every value of `from` is representable in `to` without data loss.
pub fn can_cast_safely(from: &Descr, to: &Descr) -> bool {
    let (f, t) = (from.typecode(), to.typecode());
    if f == t {
        return !f.is_extended() || to.elsize() >= from.elsize();
    }
    if f == Typecode::Bool {
        return t.is_numeric();
    }
    let (fs, ts) = (from.elsize(), to.elsize());
    if f.is_int() {
        return (t.is_int() && ts > fs)
            || (t.is_float() && (ts >= 8 || ts > 2 * fs))
            || (t.is_complex() && (ts / 2 >= 8 || ts / 2 > 2 * fs));
    }
    if f.is_uint() {
        return (t.is_uint() && ts > fs)
            || (t.is_int() && ts > fs)
            || (t.is_float() && (ts >= 8 || ts > 2 * fs))
            || (t.is_complex() && (ts / 2 >= 8 || ts / 2 > 2 * fs));
    }
    if f.is_float() {
        return (t.is_float() && ts >= fs) || (t.is_complex() && ts / 2 >= fs);
    }
    if f.is_complex() {
        return t.is_complex() && ts >= fs;
    }
    false
}

#[inline]
unsafe fn write_scalar<T: Copy>(dst: *mut u8, v: T) {
    ptr::copy_nonoverlapping(&v as *const T as *const u8, dst, mem::size_of::<T>());
}

#[inline]
unsafe fn read_scalar<T: Copy>(src: *const u8, swapped: bool) -> T {
    let mut raw = [0u8; 16];
    let n = mem::size_of::<T>();
    debug_assert!(n <= raw.len());
    ptr::copy_nonoverlapping(src, raw.as_mut_ptr(), n);
    if swapped {
        raw[..n].reverse();
    }
    ptr::read_unaligned(raw.as_ptr() as *const T)
}

#[inline]
unsafe fn swap_units(ptr: *mut u8, unit: usize, nunits: usize) {
    for i in 0..nunits {
        let u = std::slice::from_raw_parts_mut(ptr.add(i * unit), unit);
        u.reverse();
    }
}

unsafe fn fill_progression<T>(dst: *mut u8, len: usize)
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    let p = dst as *mut T;
    let first = ptr::read_unaligned(p);
    let second = ptr::read_unaligned(p.add(1));
    let delta = second - first;
    let mut prev = second;
    for i in 2..len {
        prev = prev + delta;
        ptr::write_unaligned(p.add(i), prev);
    }
}

/// Length of the longest `[+-]?digits` prefix.
fn int_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    if i == start {
        0
    } else {
        i
    }
}

/// Length of the longest floating point prefix, including `inf` and `nan`
/// spellings.
fn float_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    for word in [&b"infinity"[..], b"inf", b"nan"] {
        if b.len() - i >= word.len() && b[i..i + word.len()].eq_ignore_ascii_case(word) {
            return i + word.len();
        }
    }
    let mut digits = 0;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < b.len() && b[i] == b'.' {
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Parse `a`, `bj` or `a+bj` and return the value with the consumed length.
fn complex_prefix(s: &str) -> Option<(Complex<f64>, usize)> {
    let n1 = float_prefix_len(s);
    if n1 == 0 {
        return None;
    }
    let first: f64 = s[..n1].parse().ok()?;
    let rest = &s[n1..];
    if rest.starts_with('j') || rest.starts_with('J') {
        return Some((Complex::new(0.0, first), n1 + 1));
    }
    let n2 = float_prefix_len(rest);
    if n2 > 0 {
        let after = &rest[n2..];
        if after.starts_with('j') || after.starts_with('J') {
            let im: f64 = rest[..n2].parse().ok()?;
            return Some((Complex::new(first, im), n1 + n2 + 1));
        }
    }
    Some((Complex::new(first, 0.0), n1))
}
