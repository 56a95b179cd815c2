use std::sync::atomic::{AtomicUsize, Ordering};

use defmac::defmac;
use itertools::Itertools;
use quickcheck::quickcheck;

use ndcore::dimension::fill_contiguous_strides;
use ndcore::{
    arange, asarray, from_kind, from_object, from_object_with_depth, seq, Array, ArrayData,
    ArrayError, ArrayFlags, Descr, ErrorKind, Subtype, Typecode, Value, MAX_DIMS,
};

#[test]
fn from_nested_sequence() {
    defmac!(arr v => asarray(v, None).unwrap());
    let a = arr!(seq![[1, 2, 3], [4, 5, 6]]);
    assert_eq!(a.shape(), &[2, 3]);
    assert_eq!(a.descr().typecode(), Typecode::Int64);
    assert_eq!(a.strides(), &[24, 8]);
    assert!(a.is_c_contiguous());
    assert_eq!(a.get(&[1, 2]), Some(Value::Int(6)));

    let b = arr!(seq![[[1, 2]], [[3, 4]], [[5, 6]]]);
    assert_eq!(b.shape(), &[3, 1, 2]);
    assert_eq!(b.get(&[2, 0, 1]), Some(Value::Int(6)));
}

#[test]
fn scalar_input_gives_zero_d() {
    let a = asarray(Value::Int(7), None).unwrap();
    assert_eq!(a.ndim(), 0);
    assert_eq!(a.size(), 1);
    assert_eq!(a.get(&[]), Some(Value::Int(7)));
}

#[test]
fn fortran_order_request() {
    let a = from_object(seq![[1, 2, 3], [4, 5, 6]], None, ArrayFlags::FORTRAN).unwrap();
    assert!(a.is_f_contiguous());
    assert!(!a.is_c_contiguous());
    assert_eq!(a.strides(), &[8, 16]);
    assert_eq!(a.get(&[1, 0]), Some(Value::Int(4)));
    assert_eq!(a.to_nested().unwrap(), seq![[1, 2, 3], [4, 5, 6]]);
}

#[test]
fn round_trip_int_and_float() {
    let a = asarray(seq![[1, 2], [3, 4]], None).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![[1, 2], [3, 4]]);

    let a = asarray(seq![0.5, -1.25, 3.0], None).unwrap();
    assert_eq!(a.descr().typecode(), Typecode::Float64);
    assert_eq!(a.to_nested().unwrap(), seq![0.5, -1.25, 3.0]);
}

#[test]
fn mixed_leaves_promote() {
    let v = Value::Seq(vec![Value::Int(1), Value::Float(2.5)]);
    let a = asarray(v, None).unwrap();
    assert_eq!(a.descr().typecode(), Typecode::Float64);
    assert_eq!(a.to_nested().unwrap(), seq![1.0, 2.5]);
}

#[test]
fn ragged_sequence_is_strict_by_default() {
    let err = asarray(seq![[1, 2, 3], [4, 5]], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn empty_sequence() {
    let a = asarray(Value::Seq(vec![]), None).unwrap();
    assert_eq!(a.shape(), &[0]);
    assert_eq!(a.size(), 0);
    assert_eq!(a.to_nested().unwrap(), Value::Seq(vec![]));
}

#[test]
fn unicode_itemsize_from_leaves() {
    let v = Value::Seq(vec![Value::from("ab"), Value::from("wxyz")]);
    let a = asarray(v, Some(Descr::new(Typecode::Unicode))).unwrap();
    assert_eq!(a.shape(), &[2]);
    // four code units of four bytes, sized by the longest leaf
    assert_eq!(a.itemsize(), 16);
    assert_eq!(a.get(&[0]), Some(Value::Str("ab".to_owned())));
    assert_eq!(a.get(&[1]), Some(Value::Str("wxyz".to_owned())));
}

#[test]
fn depth_bounds_are_enforced() {
    let v = seq![[1, 2], [3, 4]];
    let err =
        from_object_with_depth(v, None, 3, 0, ArrayFlags::EMPTY, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let v = seq![[1, 2], [3, 4]];
    let err =
        from_object_with_depth(v, None, 0, 1, ArrayFlags::EMPTY, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn nesting_deeper_than_max_dims_fails() {
    let deep = (0..MAX_DIMS + 2).fold(Value::Int(1), |v, _| Value::Seq(vec![v]));
    let err = asarray(deep, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn too_many_dims_rejected() {
    let dims = vec![1usize; MAX_DIMS + 1];
    let err = Array::new_from_descr(
        None,
        Descr::new(Typecode::Int32),
        &dims,
        None,
        None,
        ArrayFlags::EMPTY,
        None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn overflow_is_array_too_big() {
    let huge = isize::MAX as usize / 8 + 1;
    let err = Array::empty(Descr::new(Typecode::Int64), &[huge], false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArrayTooBig);
    let err = Array::empty(
        Descr::new(Typecode::Int64),
        &[1 << 30, 1 << 30, 1 << 30],
        false,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArrayTooBig);
}

#[test]
fn empty_extents_are_allowed() {
    let a = Array::zeros(Descr::new(Typecode::Float64), &[3, 0, 2], false).unwrap();
    assert_eq!(a.size(), 0);
    assert_eq!(a.shape(), &[3, 0, 2]);
    // at least one element's worth of storage backs the raw pointer
    assert!(!a.as_ptr().is_null());
}

#[test]
fn subarray_descriptor_splices_shape() {
    let d = Descr::with_subarray(Descr::new(Typecode::Int32), vec![2, 2]);
    let a = Array::zeros(d, &[3], false).unwrap();
    assert_eq!(a.shape(), &[3, 2, 2]);
    assert_eq!(a.descr().typecode(), Typecode::Int32);
    assert_eq!(a.itemsize(), 4);
    assert!(a.descr().subarray().is_none());
    assert_eq!(a.strides(), &[16, 8, 4]);
}

#[test]
fn asarray_reuses_but_ensurecopy_copies() {
    let a = asarray(seq![1, 2, 3], None).unwrap();
    let p = a.as_ptr();
    let b = asarray(Value::Array(a), None).unwrap();
    assert_eq!(b.as_ptr(), p);
    let c = from_object(Value::Array(b), None, ArrayFlags::ENSURECOPY).unwrap();
    assert_ne!(c.as_ptr(), p);
    assert_eq!(c.to_nested().unwrap(), seq![1, 2, 3]);
    assert!(c.flags().contains(ArrayFlags::CARRAY));
}

#[test]
fn unsafe_cast_requires_forcecast() {
    let a = asarray(seq![1, 2, 3], None).unwrap();
    let err = from_object(
        Value::Array(a.view()),
        Some(Descr::new(Typecode::Int16)),
        ArrayFlags::EMPTY,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let b = from_object(
        Value::Array(a),
        Some(Descr::new(Typecode::Int16)),
        ArrayFlags::FORCECAST,
    )
    .unwrap();
    assert_eq!(b.descr().typecode(), Typecode::Int16);
    assert_eq!(b.get(&[2]), Some(Value::Int(3)));
}

#[test]
fn element_strides_request_forces_copy() {
    // int16 elements three bytes apart: strides are not element multiples
    let mut raw = [0u8; 16];
    for i in 0..4 {
        raw[i * 3..i * 3 + 2].copy_from_slice(&(i as i16 + 1).to_ne_bytes());
    }
    let a = Array::new_from_descr(
        None,
        Descr::new(Typecode::Int16),
        &[4],
        Some(&[3]),
        Some(ArrayData::External(raw.as_mut_ptr())),
        ArrayFlags::WRITEABLE,
        None,
    )
    .unwrap();
    let b = from_object(Value::Array(a), None, ArrayFlags::ELEMENTSTRIDES).unwrap();
    assert!(b.is_c_contiguous());
    assert_eq!(b.strides(), &[2]);
    assert_eq!(b.to_nested().unwrap(), seq![1, 2, 3, 4]);
}

static FINALIZED: AtomicUsize = AtomicUsize::new(0);

fn counting_finalize(a: &mut Array, _ctx: Option<&Value>) -> Result<(), ArrayError> {
    FINALIZED.fetch_add(1, Ordering::SeqCst);
    a.update_flags();
    Ok(())
}

fn failing_finalize(_a: &mut Array, _ctx: Option<&Value>) -> Result<(), ArrayError> {
    Err(from_kind(ErrorKind::Internal))
}

#[test]
fn finalize_hook_runs_and_can_abort() {
    let st = Subtype {
        name: "tracked",
        finalize: Some(counting_finalize),
    };
    let before = FINALIZED.load(Ordering::SeqCst);
    Array::new_from_descr(
        Some(&st),
        Descr::new(Typecode::Int32),
        &[2],
        None,
        None,
        ArrayFlags::EMPTY,
        None,
    )
    .unwrap();
    assert_eq!(FINALIZED.load(Ordering::SeqCst), before + 1);

    let st = Subtype {
        name: "failing",
        finalize: Some(failing_finalize),
    };
    let err = Array::new_from_descr(
        Some(&st),
        Descr::new(Typecode::Int32),
        &[2],
        None,
        None,
        ArrayFlags::EMPTY,
        None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // ENSUREARRAY suppresses the subtype hook entirely
    Array::new_from_descr(
        Some(&st),
        Descr::new(Typecode::Int32),
        &[2],
        None,
        None,
        ArrayFlags::ENSUREARRAY,
        None,
    )
    .unwrap();
}

quickcheck! {
    fn c_order_addresses_increase(dims: Vec<u8>) -> bool {
        let dims: Vec<usize> = dims.into_iter().take(4).map(|d| (d % 4 + 1) as usize).collect();
        let elsize = 8usize;
        let mut flags = ArrayFlags::EMPTY;
        let (strides, nbytes) = fill_contiguous_strides(&dims, elsize, false, &mut flags);
        if nbytes != elsize * dims.iter().product::<usize>() {
            return false;
        }
        // C index order must visit strictly increasing addresses
        let offsets: Vec<isize> = dims
            .iter()
            .map(|&d| 0..d)
            .multi_cartesian_product()
            .map(|ix| ix.iter().zip(&strides).map(|(&i, &s)| i as isize * s).sum())
            .collect();
        offsets.windows(2).all(|w| w[0] < w[1])
    }

    fn fortran_first_axis_fastest(dims: Vec<u8>) -> bool {
        let dims: Vec<usize> = dims.into_iter().take(4).map(|d| (d % 4 + 1) as usize).collect();
        if dims.is_empty() {
            return true;
        }
        let elsize = 4usize;
        let mut flags = ArrayFlags::EMPTY;
        let (strides, nbytes) = fill_contiguous_strides(&dims, elsize, true, &mut flags);
        strides[0] == elsize as isize
            && nbytes == elsize * dims.iter().product::<usize>()
            && strides
                .windows(2)
                .enumerate()
                .all(|(i, w)| w[1] == w[0] * dims[i] as isize)
    }

    fn round_trip_int_sequence(xs: Vec<i32>) -> bool {
        let values: Vec<Value> = xs.iter().map(|&x| Value::Int(x as i64)).collect();
        let a = asarray(Value::Seq(values), None).unwrap();
        let expect: Vec<Value> = xs.iter().map(|&x| Value::Int(x as i64)).collect();
        a.to_nested().unwrap() == Value::Seq(expect)
    }

    fn arange_integer_length(start: i8, len: u8) -> bool {
        let start = start as f64;
        let stop = start + len as f64;
        let a = arange(start, stop, 1.0, Descr::new(Typecode::Int64)).unwrap();
        a.size() == len as usize
            && (0..len as usize)
                .all(|i| a.get(&[i]) == Some(Value::Int(start as i64 + i as i64)))
    }
}
