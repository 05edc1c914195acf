use super::*;

#[test]
fn test_new_is_empty() {
    let buf = GrowableBuffer::new();
    assert!(buf.is_empty());
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
}

#[test]
fn test_grow_from_empty_uses_initial_capacity() {
    let buf = GrowableBuffer::new().grow(3);
    assert_eq!(buf.len(), 0);
    assert!(buf.capacity() >= INITIAL_CAPACITY);
}

#[test]
fn test_grow_preserves_contents() {
    let mut buf = GrowableBuffer::new();
    buf.push_slice(b"12 hel");
    let grown = buf.grow(10_000);
    assert_eq!(grown.as_slice(), b"12 hel");
    assert!(grown.capacity() >= 6 + 10_000);
}

#[test]
fn test_grow_within_capacity_keeps_allocation() {
    let buf = GrowableBuffer::with_capacity(64);
    let cap = buf.capacity();
    let buf = buf.grow(10);
    assert_eq!(buf.capacity(), cap);
}

#[test]
fn test_grow_at_least_doubles() {
    let mut buf = GrowableBuffer::with_capacity(INITIAL_CAPACITY);
    buf.push_slice(&[b'x'; INITIAL_CAPACITY]);
    let buf = buf.grow(1);
    assert!(buf.capacity() >= 2 * INITIAL_CAPACITY);
    assert_eq!(buf.len(), INITIAL_CAPACITY);
}

#[test]
fn test_push_slice_accumulates() {
    let mut buf = GrowableBuffer::new();
    buf.push_slice(b"7 ");
    buf.push_slice(b"");
    buf.push_slice(b"seven");
    assert_eq!(buf.as_slice(), b"7 seven");
}

#[test]
fn test_finish_with_resets() {
    let mut buf = GrowableBuffer::new();
    buf.push_slice(b"3 thr");
    let record = buf.finish_with(b"ee\n");
    assert_eq!(record, b"3 three\n");
    assert!(buf.is_empty());

    buf.push_slice(b"4");
    assert_eq!(buf.as_slice(), b"4");
}

#[test]
fn test_take_and_into_vec() {
    let mut buf = GrowableBuffer::new();
    buf.push_slice(b"abc");
    assert_eq!(buf.take(), b"abc");
    assert!(buf.is_empty());

    buf.push_slice(b"def");
    assert_eq!(buf.into_vec(), b"def");
}
