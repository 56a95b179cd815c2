use ndcore::{
    asarray, copy_into, from_object, move_into, seq, Array, ArrayData, ArrayFlags, Descr,
    ErrorKind, Typecode, Value,
};

#[test]
fn copy_same_shape_and_idempotence() {
    let src = asarray(seq![[1, 2], [3, 4]], None).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Int64), &[2, 2], false).unwrap();
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![[1, 2], [3, 4]]);
    // copying again changes nothing
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![[1, 2], [3, 4]]);
}

#[test]
fn copy_casts_between_element_types() {
    let src = asarray(seq![1, 2, 3], None).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Float64), &[3], false).unwrap();
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![1.0, 2.0, 3.0]);
}

#[test]
fn copy_between_orders() {
    let src = from_object(seq![[1, 2, 3], [4, 5, 6]], None, ArrayFlags::FORTRAN).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Int64), &[2, 3], false).unwrap();
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![[1, 2, 3], [4, 5, 6]]);
}

#[test]
fn flattened_copy_between_shapes() {
    let src = asarray(seq![[1, 2, 3], [4, 5, 6]], None).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Int64), &[3, 2], false).unwrap();
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![[1, 2], [3, 4], [5, 6]]);

    // both sides traverse in C order regardless of their layout
    let src = from_object(seq![[1, 2, 3], [4, 5, 6]], None, ArrayFlags::FORTRAN).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Int64), &[6], false).unwrap();
    copy_into(&mut dst, &src).unwrap();
    assert_eq!(dst.to_nested().unwrap(), seq![1, 2, 3, 4, 5, 6]);
}

#[test]
fn count_mismatch_fails() {
    let src = asarray(seq![1, 2, 3], None).unwrap();
    let mut dst = Array::zeros(Descr::new(Typecode::Int64), &[2, 2], false).unwrap();
    let err = copy_into(&mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn zero_size_rules() {
    let mut empty_dst = Array::zeros(Descr::new(Typecode::Int64), &[0], false).unwrap();
    let empty_src = Array::zeros(Descr::new(Typecode::Int64), &[0, 3], false).unwrap();
    copy_into(&mut empty_dst, &empty_src).unwrap();

    // a scalar goes into anything, even an empty destination
    let scalar = asarray(Value::Int(9), None).unwrap();
    copy_into(&mut empty_dst, &scalar).unwrap();
    assert_eq!(empty_dst.size(), 0);

    let full = asarray(seq![1, 2], None).unwrap();
    let err = copy_into(&mut empty_dst, &full).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

    let mut full_dst = Array::zeros(Descr::new(Typecode::Int64), &[2], false).unwrap();
    let err = copy_into(&mut full_dst, &empty_src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn move_into_reversed_self_assignment() {
    let a = asarray(seq![0, 1, 2], None).unwrap();
    let src = a.view();
    let mut dst = a.view();
    dst.invert_axis(0);
    move_into(&mut dst, &src).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![2, 1, 0]);
}

#[test]
fn move_into_disjoint_views_copies_directly() {
    let a = asarray(seq![1, 2, 3], None).unwrap();
    let mut b = Array::zeros(Descr::new(Typecode::Int64), &[3], false).unwrap();
    move_into(&mut b, &a).unwrap();
    assert_eq!(b.to_nested().unwrap(), seq![1, 2, 3]);
    assert_eq!(a.to_nested().unwrap(), seq![1, 2, 3]);
}

#[test]
fn overlapping_forward_copy_runs_in_reverse() {
    // two int32 windows over one allocation, shifted by one element
    let mut raw: Vec<u8> = (0i32..4).flat_map(|x| x.to_ne_bytes()).collect();
    let ptr = raw.as_mut_ptr();
    let src = Array::new_from_descr(
        None,
        Descr::new(Typecode::Int32),
        &[3],
        None,
        Some(ArrayData::External(ptr)),
        ArrayFlags::BEHAVED,
        None,
    )
    .unwrap();
    let mut dst = Array::new_from_descr(
        None,
        Descr::new(Typecode::Int32),
        &[3],
        None,
        Some(ArrayData::External(unsafe { ptr.add(4) })),
        ArrayFlags::BEHAVED,
        None,
    )
    .unwrap();
    copy_into(&mut dst, &src).unwrap();
    // a forward pass would have smeared element 0 over the whole window
    assert_eq!(dst.to_nested().unwrap(), seq![0, 1, 2]);
    assert_eq!(src.get(&[0]), Some(Value::Int(0)));
}
