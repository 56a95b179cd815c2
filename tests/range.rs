use approx::assert_abs_diff_eq;

use ndcore::{arange, seq, ByteOrder, Descr, ErrorKind, Typecode, Value};

#[test]
fn basic_integer_range() {
    let a = arange(0.0, 5.0, 1.0, Descr::new(Typecode::Int64)).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![0, 1, 2, 3, 4]);
}

#[test]
fn empty_ranges_are_not_errors() {
    let a = arange(0.0, 0.0, 1.0, Descr::new(Typecode::Int64)).unwrap();
    assert_eq!(a.shape(), &[0]);
    // step pointing away from stop is a zero-length range
    let a = arange(10.0, 0.0, 1.0, Descr::new(Typecode::Int64)).unwrap();
    assert_eq!(a.shape(), &[0]);
}

#[test]
fn single_and_two_element_ranges() {
    let a = arange(3.0, 4.0, 2.0, Descr::new(Typecode::Int32)).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![3]);
    let a = arange(3.0, 7.0, 2.0, Descr::new(Typecode::Int32)).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![3, 5]);
}

#[test]
fn fractional_step() {
    let a = arange(0.0, 1.0, 0.25, Descr::new(Typecode::Float64)).unwrap();
    assert_eq!(a.shape(), &[4]);
    for (i, want) in [0.0, 0.25, 0.5, 0.75].iter().enumerate() {
        match a.get(&[i]) {
            Some(Value::Float(v)) => assert_abs_diff_eq!(v, *want),
            other => panic!("unexpected element {:?}", other),
        }
    }
}

#[test]
fn negative_step() {
    let a = arange(5.0, 0.0, -2.0, Descr::new(Typecode::Int64)).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![5, 3, 1]);
}

#[test]
fn complex_range() {
    let a = arange(0.0, 3.0, 1.0, Descr::new(Typecode::Complex128)).unwrap();
    match a.get(&[2]) {
        Some(Value::Complex(c)) => {
            assert_eq!(c.re, 2.0);
            assert_eq!(c.im, 0.0);
        }
        other => panic!("unexpected element {:?}", other),
    }
}

#[test]
fn swapped_order_output() {
    let d = Descr::new(Typecode::Int32).with_byteorder(ByteOrder::Swapped);
    let a = arange(0.0, 4.0, 1.0, d).unwrap();
    assert_eq!(a.descr().byteorder(), ByteOrder::Swapped);
    assert_eq!(a.to_nested().unwrap(), seq![0, 1, 2, 3]);
    // the stored bytes really are in opposite-of-native order
    let raw = unsafe { std::slice::from_raw_parts(a.as_ptr().add(8), 4) };
    let mut expect = 2i32.to_ne_bytes();
    expect.reverse();
    assert_eq!(raw, &expect[..]);
}

#[test]
fn type_without_fill_support() {
    let err = arange(0.0, 5.0, 1.0, Descr::new(Typecode::Bool)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn overflowing_length() {
    let err = arange(0.0, f64::MAX, 1e-300, Descr::new(Typecode::Float64)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overflow);
}
