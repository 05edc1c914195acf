use super::*;
use crate::store::MergeStore;
use proptest::prelude::*;

fn frame_all(chunks: &[&[u8]]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut parser = FramingParser::new();
    let mut out = Vec::new();
    for chunk in chunks {
        parser.feed(chunk, |line| out.push(line));
    }
    (out, parser.pending().to_vec())
}

// ---- Record parsing ----

#[test]
fn test_parse_index_basic() {
    assert_eq!(parse_index(b"0 alpha\n"), Ok(0));
    assert_eq!(parse_index(b"42 x\n"), Ok(42));
    assert_eq!(parse_index(b"007 bond\n"), Ok(7));
    assert_eq!(parse_index(b"3 \n"), Ok(3));
}

#[test]
fn test_parse_index_errors() {
    assert_eq!(
        parse_index(b"banana\n"),
        Err(RecordFormatError::MissingSeparator)
    );
    assert_eq!(parse_index(b" x\n"), Err(RecordFormatError::InvalidIndex));
    assert_eq!(parse_index(b"12a x\n"), Err(RecordFormatError::InvalidIndex));
    assert_eq!(parse_index(b"-1 x\n"), Err(RecordFormatError::InvalidIndex));
    assert_eq!(
        parse_index(b"99999999999999999999 x\n"),
        Err(RecordFormatError::IndexOverflow)
    );
}

#[test]
fn test_parse_index_max() {
    assert_eq!(parse_index(b"18446744073709551615 x\n"), Ok(u64::MAX));
}

#[test]
fn test_record_content_only_splits_first_separator() {
    let record = Record::parse(b"5 hello world\n".to_vec()).unwrap();
    assert_eq!(record.index(), 5);
    assert_eq!(record.content().unwrap(), b"hello world\n");
    assert_eq!(record.payload(), b"5 hello world\n");
}

#[test]
fn test_record_parse_hands_back_payload() {
    let (err, payload) = Record::parse(b"banana\n".to_vec()).unwrap_err();
    assert_eq!(err, RecordFormatError::MissingSeparator);
    assert_eq!(payload, b"banana\n");
}

#[test]
fn test_encode() {
    let mut out = Vec::new();
    Record::encode(12, b"twelve", &mut out);
    Record::encode(0, b"", &mut out);
    assert_eq!(out, b"12 twelve\n0 \n");
}

#[test]
fn test_classify() {
    assert_eq!(classify(b"EOF\n".to_vec()), Frame::Sentinel);
    assert!(matches!(classify(b"1 EOF\n".to_vec()), Frame::Record(r) if r.index() == 1));
    assert!(matches!(
        classify(b"EOF".to_vec()),
        Frame::Malformed(RecordFormatError::MissingSeparator, _)
    ));
}

#[test]
fn test_preview_trims_terminator_and_truncates() {
    assert_eq!(preview(b"banana\n"), "banana");
    let long = vec![b'a'; 100];
    let p = preview(&long);
    assert!(p.ends_with("..."));
    assert_eq!(p.len(), 48 + 3);
}

// ---- Framing ----

#[test]
fn test_feed_single_chunk() {
    let (lines, pending) = frame_all(&[b"0 a\n1 b\nEOF\n".as_slice()]);
    assert_eq!(lines, vec![b"0 a\n".to_vec(), b"1 b\n".to_vec(), b"EOF\n".to_vec()]);
    assert!(pending.is_empty());
}

#[test]
fn test_feed_partial_tail_is_staged() {
    let mut parser = FramingParser::new();
    let mut lines = Vec::new();
    assert_eq!(parser.feed(b"0 alp", |l| lines.push(l)), 0);
    assert!(parser.has_pending());
    assert_eq!(parser.pending(), b"0 alp");
    assert_eq!(parser.feed(b"ha\n1 be", |l| lines.push(l)), 1);
    assert_eq!(lines, vec![b"0 alpha\n".to_vec()]);
    assert_eq!(parser.pending(), b"1 be");
    assert_eq!(parser.emitted(), 1);
}

#[test]
fn test_split_sentinel() {
    let mut parser = FramingParser::new();
    let mut store = MergeStore::new();
    let mut intake = Intake::new("test");

    parser.feed(b"EO", |l| intake.accept(l, &mut store));
    assert!(!intake.sentinel_received());
    parser.feed(b"F\n", |l| intake.accept(l, &mut store));
    assert!(intake.sentinel_received());
    assert!(store.is_empty());
}

#[test]
fn test_empty_chunk_is_noop() {
    let (lines, pending) = frame_all(&[b"".as_slice(), b"0 x".as_slice(), b"".as_slice(), b"\n".as_slice()]);
    assert_eq!(lines, vec![b"0 x\n".to_vec()]);
    assert!(pending.is_empty());
}

#[test]
fn test_bare_terminators_are_records() {
    let (lines, _) = frame_all(&[b"\n\n".as_slice()]);
    assert_eq!(lines, vec![b"\n".to_vec(), b"\n".to_vec()]);
}

// ---- Intake ----

#[test]
fn test_malformed_record_isolation() {
    let mut parser = FramingParser::new();
    let mut store = MergeStore::new();
    let mut intake = Intake::new("test");

    parser.feed(b"0 alpha\nbanana\n1 beta\nEOF\n", |l| {
        intake.accept(l, &mut store)
    });

    assert!(intake.sentinel_received());
    let stats = intake.stats();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.malformed, 1);
    let payloads: Vec<&[u8]> = store.iter().map(|r| r.payload()).collect();
    assert_eq!(payloads, vec![&b"0 alpha\n"[..], &b"1 beta\n"[..]]);
}

#[test]
fn test_duplicate_keeps_first_writer() {
    let mut store = MergeStore::new();
    let mut intake = Intake::new("test");
    intake.accept(b"3 first\n".to_vec(), &mut store);
    intake.accept(b"3 second\n".to_vec(), &mut store);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(3).unwrap().payload(), b"3 first\n");
    assert_eq!(intake.stats().duplicates, 1);
    assert_eq!(intake.stats().discarded(), 1);
}

#[test]
fn test_records_after_sentinel_are_dropped() {
    let mut store = MergeStore::new();
    let mut intake = Intake::new("test");
    intake.accept(b"EOF\n".to_vec(), &mut store);
    intake.accept(b"9 late\n".to_vec(), &mut store);
    intake.accept(b"EOF\n".to_vec(), &mut store);

    assert!(store.is_empty());
    assert_eq!(intake.stats().after_sentinel, 2);
}

fn arb_stream() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            (0u64..1000, "[a-z ]{0,12}").prop_map(|(i, s)| {
                let mut out = Vec::new();
                Record::encode(i, s.as_bytes(), &mut out);
                out
            }),
            Just(b"banana\n".to_vec()),
            Just(b"EOF\n".to_vec()),
        ],
        0..40,
    )
    .prop_map(|lines| lines.concat())
}

proptest! {
    #[test]
    fn prop_chunk_boundary_independence(
        stream in arb_stream(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..20),
        tail in "[0-9a-z ]{0,5}",
    ) {
        let mut stream = stream;
        stream.extend_from_slice(tail.as_bytes());

        let (whole, whole_pending) = frame_all(&[stream.as_slice()]);

        let mut points: Vec<usize> = cuts.iter().map(|c| c.index(stream.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut prev = 0;
        for p in points {
            chunks.push(&stream[prev..p]);
            prev = p;
        }
        chunks.push(&stream[prev..]);

        let (split, split_pending) = frame_all(&chunks);
        prop_assert_eq!(whole, split);
        prop_assert_eq!(whole_pending, split_pending);
    }

    #[test]
    fn prop_byte_at_a_time_matches_whole(stream in arb_stream()) {
        let (whole, _) = frame_all(&[stream.as_slice()]);
        let singles: Vec<&[u8]> = stream.chunks(1).collect();
        let (split, pending) = frame_all(&singles);
        prop_assert_eq!(whole, split);
        prop_assert!(pending.is_empty());
    }
}
