// Copyright 2014-2016 bluss and ndarray developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Streaming construction from binary data, delimited text and iterators.
//!
//! Binary sources copy whole elements. Text sources parse one element at
//! a time through the descriptor's scan support and skip a separator
//! between elements with whitespace-tolerant matching. Unbounded reads
//! grow the backing allocation as they go and shrink it to the final
//! element count at the end.

use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ptr;

use num_integer::Integer;

use crate::descriptor::Descr;
use crate::error::{ArrayError, ErrorKind};
use crate::value::Value;
use crate::{Array, ArrayFlags};

/// Elements grown at a time while reading an unbounded text stream.
const FROM_BUFFER_SIZE: usize = 4096;

/// Read an array from a binary or delimited-text stream.
///
/// A negative `num` reads as many elements as the stream holds; for the
/// binary case the remaining length is measured by seeking. `sep` absent
/// or empty selects binary mode; otherwise the stream is text with `sep`
/// between elements, where whitespace in the separator matches any run
/// of whitespace in the input.
pub fn from_file<R: Read + Seek>(
    reader: &mut R,
    descr: Descr,
    num: isize,
    sep: Option<&str>,
) -> Result<Array, ArrayError> {
    if descr.holds_references() {
        return Err(ArrayError::new(
            ErrorKind::Value,
            "cannot read into a reference-holding array",
        ));
    }
    if descr.elsize() == 0 {
        return Err(ArrayError::new(ErrorKind::Value, "the elements are 0-sized"));
    }
    let (mut ret, nread) = match sep {
        None | Some("") => fromfile_binary(reader, descr, num)?,
        Some(sep) => {
            if !descr.has_scan() {
                return Err(ArrayError::new(
                    ErrorKind::Value,
                    "unable to read character files of that array type",
                ));
            }
            let mut source = FileText {
                inner: BufReader::new(reader),
                peeked: None,
            };
            from_text(descr, num, sep, &mut source)?
        }
    };
    // a short read shrinks the result rather than failing
    if nread < ret.size() {
        shrink(&mut ret, nread)?;
    }
    Ok(ret)
}

/// Read an array from raw bytes, binary or delimited text.
///
/// Binary mode requires the byte length to cover `num` elements, or to be
/// an exact multiple of the element size when `num` is negative.
pub fn from_bytes(
    data: &[u8],
    descr: Descr,
    num: isize,
    sep: Option<&str>,
) -> Result<Array, ArrayError> {
    if descr.holds_references() {
        return Err(ArrayError::new(
            ErrorKind::Value,
            "cannot build a reference-holding array from raw bytes",
        ));
    }
    let elsize = descr.elsize();
    if elsize == 0 {
        return Err(ArrayError::new(ErrorKind::Value, "zero-valued itemsize"));
    }
    match sep {
        None | Some("") => {
            let num = if num < 0 {
                let (q, r) = data.len().div_rem(&elsize);
                if r != 0 {
                    return Err(ArrayError::new(
                        ErrorKind::Value,
                        "byte length must be a multiple of element size",
                    ));
                }
                q
            } else {
                if data.len() < num as usize * elsize {
                    return Err(ArrayError::new(
                        ErrorKind::Value,
                        "input is smaller than requested size",
                    ));
                }
                num as usize
            };
            let mut r =
                Array::new_from_descr(None, descr, &[num], None, None, ArrayFlags::EMPTY, None)?;
            unsafe {
                ptr::copy_nonoverlapping(data.as_ptr(), r.as_mut_ptr(), num * elsize);
            }
            Ok(r)
        }
        Some(sep) => {
            if !descr.has_scan() {
                return Err(ArrayError::new(
                    ErrorKind::Value,
                    "unable to read character strings with that array type",
                ));
            }
            let text = std::str::from_utf8(data).map_err(|_| {
                ArrayError::new(ErrorKind::Value, "text input is not valid utf-8")
            })?;
            let mut source = StrText { rest: text };
            let (mut r, nread) = from_text(descr, num, sep, &mut source)?;
            if nread < r.size() {
                shrink(&mut r, nread)?;
            }
            Ok(r)
        }
    }
}

/// Consume an iterator of values into a fresh 1-d array.
///
/// A negative `count` consumes the iterator to exhaustion, growing the
/// allocation with 50% overallocation (0, 4, 8, 14, 23, 36, 56, 86, ...);
/// a non-negative `count` reads exactly that many elements and fails when
/// the iterator runs short. The live length tracks every successful
/// write, so a mid-stream failure still drops a consistent array.
pub fn from_iter<I>(iter: I, descr: Descr, count: isize) -> Result<Array, ArrayError>
where
    I: IntoIterator<Item = Value>,
{
    let elsize = descr.elsize();
    if elsize == 0 {
        return Err(ArrayError::new(
            ErrorKind::Value,
            "must specify length when using a variable-size data-type",
        ));
    }
    if descr.holds_references() {
        // growth reallocates, which would strand the references already
        // written elements hold
        return Err(ArrayError::new(
            ErrorKind::Value,
            "cannot consume an iterator into a reference-holding array",
        ));
    }
    let mut elcount = count.max(0) as usize;
    let mut ret = Array::new_from_descr(None, descr, &[elcount], None, None, ArrayFlags::EMPTY, None)?;
    ret.dim[0] = 0;
    let mut it = iter.into_iter();
    let mut i = 0usize;
    while count < 0 || i < count as usize {
        let value = match it.next() {
            Some(v) => v,
            None => break,
        };
        if i >= elcount {
            elcount = (i >> 1) + (if i < 4 { 4 } else { 2 }) + i;
            if elcount > isize::MAX as usize / elsize {
                return Err(ArrayError::new(
                    ErrorKind::OutOfMemory,
                    "cannot allocate array memory",
                ));
            }
            let p = ret.owned_buffer_mut()?.resize(elcount * elsize)?;
            ret.rebase_ptr(p);
        }
        ret.dim[0] = i + 1;
        let dst = ret.as_mut_ptr();
        unsafe { ret.descr().setitem(&value, dst.add(i * elsize))? };
        i += 1;
    }
    if count >= 0 && i < count as usize {
        return Err(ArrayError::new(ErrorKind::Value, "iterator too short"));
    }
    shrink(&mut ret, i)?;
    Ok(ret)
}

/// Binary bulk read; a short read shrinks the result rather than failing.
fn fromfile_binary<R: Read + Seek>(
    reader: &mut R,
    descr: Descr,
    num: isize,
) -> Result<(Array, usize), ArrayError> {
    let elsize = descr.elsize();
    let num = if num < 0 {
        let io_err = || ArrayError::new(ErrorKind::Io, "could not seek in file");
        let start = reader.stream_position().map_err(|_| io_err())?;
        let end = reader.seek(SeekFrom::End(0)).map_err(|_| io_err())?;
        reader.seek(SeekFrom::Start(start)).map_err(|_| io_err())?;
        (end.saturating_sub(start)) as usize / elsize
    } else {
        num as usize
    };
    let mut r = Array::new_from_descr(None, descr, &[num], None, None, ArrayFlags::EMPTY, None)?;
    let total = num * elsize;
    let dst = unsafe { std::slice::from_raw_parts_mut(r.as_mut_ptr(), total) };
    let mut filled = 0usize;
    while filled < total {
        match reader.read(&mut dst[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    Ok((r, filled / elsize))
}

/// Resize the backing allocation to `n` elements (at least one element's
/// worth stays allocated) and record the new length. A failure here is
/// surfaced: the buffer would otherwise stay oversized relative to the
/// reported length.
fn shrink(a: &mut Array, n: usize) -> Result<(), ArrayError> {
    let elsize = a.itemsize();
    let p = a.owned_buffer_mut()?.resize(n.max(1) * elsize)?;
    a.rebase_ptr(p);
    a.dim[0] = n;
    Ok(())
}

/// How a separator-skip attempt ended.
enum Skip {
    Matched,
    /// The input ended while the separator still had characters left.
    End,
    /// A required literal failed to match.
    Mismatch,
}

/// One source of delimited text elements; the string and stream readers
/// share the parse loop through this.
trait TextSource {
    /// Parse one element into `dst`; `false` is a clean stop.
    ///
    /// ## Safety
    ///
    /// `dst` must be valid for one element of `descr`.
    unsafe fn next_element(&mut self, descr: &Descr, dst: *mut u8) -> bool;

    fn skip_separator(&mut self, sep: &str) -> Skip;
}

/// Collapse whitespace runs in the separator to single spaces and pad it
/// with leading and trailing space wildcards, so arbitrary whitespace
/// around the literal separator characters matches.
fn clean_separator(sep: &str) -> String {
    let mut out = String::with_capacity(sep.len() + 2);
    if !sep.is_empty() && !sep.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    let mut skip_space = false;
    for c in sep.chars() {
        if c.is_whitespace() {
            if !skip_space {
                out.push(' ');
                skip_space = true;
            }
        } else {
            out.push(c);
            skip_space = false;
        }
    }
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// The shared text-read loop: parse, count, grow when the chunk is full,
/// skip the separator, stop cleanly on any failure to match.
fn from_text<S: TextSource>(
    descr: Descr,
    num: isize,
    sep: &str,
    source: &mut S,
) -> Result<(Array, usize), ArrayError> {
    let size = if num >= 0 { num as usize } else { FROM_BUFFER_SIZE };
    let mut r = Array::new_from_descr(None, descr, &[size], None, None, ArrayFlags::EMPTY, None)?;
    let elsize = r.itemsize();
    let clean = clean_separator(sep);
    let mut capacity = size;
    let mut nread = 0usize;
    let mut thisbuf = 0usize;
    let mut offset = 0usize;
    while num < 0 || nread < num as usize {
        let dst = r.as_mut_ptr();
        if !unsafe { source.next_element(r.descr(), dst.add(offset)) } {
            break;
        }
        nread += 1;
        thisbuf += 1;
        offset += elsize;
        if num < 0 && thisbuf == size {
            // grow by one buffer's worth and keep going
            let newcap = capacity + size;
            let p = r.owned_buffer_mut()?.resize(newcap * elsize)?;
            r.rebase_ptr(p);
            capacity = newcap;
            thisbuf = 0;
        }
        match source.skip_separator(&clean) {
            Skip::Matched => {}
            Skip::End | Skip::Mismatch => break,
        }
    }
    if num < 0 {
        shrink(&mut r, nread)?;
    }
    Ok((r, nread))
}

struct StrText<'a> {
    rest: &'a str,
}

impl TextSource for StrText<'_> {
    unsafe fn next_element(&mut self, descr: &Descr, dst: *mut u8) -> bool {
        match descr.parse_prefix(self.rest, dst) {
            Some(n) => {
                self.rest = &self.rest[n..];
                true
            }
            None => false,
        }
    }

    fn skip_separator(&mut self, sep: &str) -> Skip {
        let bytes = self.rest.as_bytes();
        let sep = sep.as_bytes();
        let mut i = 0;
        let mut k = 0;
        loop {
            if i >= bytes.len() {
                self.rest = "";
                return Skip::End;
            }
            let c = bytes[i];
            if k == sep.len() {
                let matched = i != 0;
                self.rest = &self.rest[i..];
                return if matched { Skip::Matched } else { Skip::Mismatch };
            }
            if sep[k] == b' ' {
                // whitespace wildcard: one or more whitespace characters
                if !c.is_ascii_whitespace() {
                    k += 1;
                    continue;
                }
            } else if sep[k] != c {
                self.rest = &self.rest[i..];
                return Skip::Mismatch;
            } else {
                k += 1;
            }
            i += 1;
        }
    }
}

struct FileText<R: Read> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> FileText<R> {
    fn getc(&mut self) -> Option<u8> {
        if let Some(b) = self.peeked.take() {
            return Some(b);
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    fn ungetc(&mut self, b: u8) {
        self.peeked = Some(b);
    }
}

impl<R: Read> TextSource for FileText<R> {
    unsafe fn next_element(&mut self, descr: &Descr, dst: *mut u8) -> bool {
        // pull one token: leading whitespace, then characters that can
        // extend a text representation of the element type
        let mut c = loop {
            match self.getc() {
                Some(b) if b.is_ascii_whitespace() => continue,
                Some(b) => break b,
                None => return false,
            }
        };
        let charset = descr.scan_charset();
        let mut token = Vec::new();
        loop {
            if charset.contains(&c) {
                token.push(c);
            } else {
                self.ungetc(c);
                break;
            }
            match self.getc() {
                Some(b) => c = b,
                None => break,
            }
        }
        if token.is_empty() {
            return false;
        }
        let s = match std::str::from_utf8(&token) {
            Ok(s) => s,
            Err(_) => return false,
        };
        matches!(descr.parse_prefix(s, dst), Some(n) if n == s.len())
    }

    fn skip_separator(&mut self, sep: &str) -> Skip {
        let sep = sep.as_bytes();
        let mut k = 0;
        let mut consumed = false;
        loop {
            let c = match self.getc() {
                Some(c) => c,
                None => return Skip::End,
            };
            if k == sep.len() {
                self.ungetc(c);
                return if consumed { Skip::Matched } else { Skip::Mismatch };
            }
            if sep[k] == b' ' {
                if !c.is_ascii_whitespace() {
                    k += 1;
                    self.ungetc(c);
                } else {
                    consumed = true;
                }
            } else if sep[k] != c {
                self.ungetc(c);
                return Skip::Mismatch;
            } else {
                k += 1;
                consumed = true;
            }
        }
    }
}
