use std::io::Cursor;

use ndcore::{from_bytes, from_file, from_iter, seq, Descr, ErrorKind, Typecode, Value};

#[test]
fn text_with_separator_and_stray_whitespace() {
    let a = from_bytes(b"1,2, 3,4", Descr::new(Typecode::Int64), -1, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![1, 2, 3, 4]);
}

#[test]
fn bounded_text_read_stops_cleanly() {
    // garbage after the requested count is never looked at
    let a = from_bytes(b"1,2,garbage", Descr::new(Typecode::Int64), 2, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![1, 2]);

    // fewer elements than requested shrinks rather than failing
    let a = from_bytes(b"5,6", Descr::new(Typecode::Int64), 4, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![5, 6]);
}

#[test]
fn unbounded_text_read_stops_at_garbage() {
    let a = from_bytes(b"1,2,x", Descr::new(Typecode::Int64), -1, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![1, 2]);
}

#[test]
fn float_text_read() {
    let a = from_bytes(b"0.5, 1.5e1, -2", Descr::new(Typecode::Float64), -1, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![0.5, 15.0, -2.0]);
}

#[test]
fn empty_text_read_yields_empty_array() {
    let a = from_bytes(b"", Descr::new(Typecode::Int64), -1, Some(",")).unwrap();
    assert_eq!(a.shape(), &[0]);
}

#[test]
fn binary_bytes_require_whole_elements() {
    let data: Vec<u8> = (0u32..4).flat_map(|x| x.to_ne_bytes()).collect();
    let a = from_bytes(&data, Descr::new(Typecode::UInt32), -1, None).unwrap();
    assert_eq!(a.shape(), &[4]);
    assert_eq!(a.get(&[3]), Some(Value::UInt(3)));

    let err = from_bytes(&data[..7], Descr::new(Typecode::UInt32), -1, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);

    let err = from_bytes(&data, Descr::new(Typecode::UInt32), 5, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn binary_file_read_counts_remaining_bytes() {
    let data: Vec<u8> = (0i64..5).flat_map(|x| x.to_ne_bytes()).collect();
    let mut file = Cursor::new(data);
    let a = from_file(&mut file, Descr::new(Typecode::Int64), -1, None).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![0, 1, 2, 3, 4]);
}

#[test]
fn short_binary_file_read_shrinks() {
    let data: Vec<u8> = (0i64..3).flat_map(|x| x.to_ne_bytes()).collect();
    let mut file = Cursor::new(data);
    let a = from_file(&mut file, Descr::new(Typecode::Int64), 10, None).unwrap();
    assert_eq!(a.shape(), &[3]);
    assert_eq!(a.to_nested().unwrap(), seq![0, 1, 2]);
}

#[test]
fn text_file_read() {
    let mut file = Cursor::new(b"10 20 30".to_vec());
    let a = from_file(&mut file, Descr::new(Typecode::Int64), -1, Some(" ")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![10, 20, 30]);
}

#[test]
fn text_file_read_with_literal_separator() {
    let mut file = Cursor::new(b"1, 2,3 , 4".to_vec());
    let a = from_file(&mut file, Descr::new(Typecode::Int64), -1, Some(",")).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![1, 2, 3, 4]);
}

#[test]
fn unreadable_text_type_fails() {
    let err = from_bytes(
        b"ab,cd",
        Descr::new(Typecode::Bytes).with_elsize(2),
        -1,
        Some(","),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn zero_sized_elements_are_rejected() {
    let err = from_bytes(b"abc", Descr::new(Typecode::Bytes), -1, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn iterator_consumption_grows_and_shrinks() {
    // enough elements to force several rounds of amortized growth
    let a = from_iter((0..1000).map(Value::from), Descr::new(Typecode::Int64), -1).unwrap();
    assert_eq!(a.shape(), &[1000]);
    assert_eq!(a.get(&[0]), Some(Value::Int(0)));
    assert_eq!(a.get(&[999]), Some(Value::Int(999)));
}

#[test]
fn iterator_exact_count_stops_early() {
    let a = from_iter((0..100).map(Value::from), Descr::new(Typecode::Int64), 4).unwrap();
    assert_eq!(a.to_nested().unwrap(), seq![0, 1, 2, 3]);
}

#[test]
fn iterator_too_short_fails() {
    let err = from_iter((0..3).map(Value::from), Descr::new(Typecode::Int64), 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn iterator_needs_fixed_item_size() {
    let err = from_iter(
        std::iter::empty::<Value>(),
        Descr::new(Typecode::Unicode),
        -1,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn empty_iterator_yields_empty_array() {
    let a = from_iter(std::iter::empty::<Value>(), Descr::new(Typecode::Int64), -1).unwrap();
    assert_eq!(a.shape(), &[0]);
}
