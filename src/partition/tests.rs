use super::*;
use crate::manifest::Manifest;
use std::fs;

#[test]
fn test_count_lines() {
    assert_eq!(count_lines(b""), 0);
    assert_eq!(count_lines(b"a\n"), 1);
    assert_eq!(count_lines(b"a\nb"), 2);
    assert_eq!(count_lines(b"\n\n"), 2);
}

#[test]
fn test_contiguous_split() {
    let parts = partition_bytes(b"alpha\nbeta\ngamma\n", 2, Strategy::Contiguous);
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], b"0 alpha\n1 beta\n");
    assert_eq!(parts[1], b"2 gamma\n");
}

#[test]
fn test_round_robin_split() {
    let parts = partition_bytes(b"a\nb\nc\nd\ne\n", 2, Strategy::RoundRobin);
    assert_eq!(parts[0], b"0 a\n2 c\n4 e\n");
    assert_eq!(parts[1], b"1 b\n3 d\n");
}

#[test]
fn test_more_fragments_than_lines() {
    let parts = partition_bytes(b"only\n", 3, Strategy::Contiguous);
    assert_eq!(parts[0], b"0 only\n");
    assert!(parts[1].is_empty());
    assert!(parts[2].is_empty());
}

#[test]
fn test_unterminated_last_line_gets_terminator() {
    let parts = partition_bytes(b"x\ny", 1, Strategy::Contiguous);
    assert_eq!(parts[0], b"0 x\n1 y\n");
}

#[test]
fn test_empty_lines_and_spaces_preserved() {
    let parts = partition_bytes(b"\n a b \n", 1, Strategy::Contiguous);
    assert_eq!(parts[0], b"0 \n1  a b \n");
}

#[test]
fn test_partition_file_writes_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("orig.txt");
    fs::write(&original, b"one\ntwo\nthree\nfour\n").unwrap();

    let config = PartitionConfig {
        fragments: 3,
        strategy: Strategy::RoundRobin,
        prefix: "part".to_string(),
        out_dir: dir.path().join("out"),
    };
    let summary = partition_file(&original, &config).unwrap();
    assert_eq!(summary.lines, 4);
    assert_eq!(summary.fragments.len(), 3);
    assert_eq!(summary.descriptor, dir.path().join("out").join("part.desc"));
    assert_eq!(
        fs::read(&summary.fragments[0]).unwrap(),
        b"0 one\n3 four\n"
    );

    let manifest = Manifest::load(&summary.descriptor).unwrap();
    assert_eq!(manifest.original, fs::canonicalize(&original).unwrap());
    assert_eq!(manifest.fragments, summary.fragments);
}

#[test]
fn test_partition_file_rejects_zero_fragments() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("orig.txt");
    fs::write(&original, b"a\n").unwrap();
    let config = PartitionConfig {
        fragments: 0,
        out_dir: dir.path().to_path_buf(),
        ..PartitionConfig::default()
    };
    let err = partition_file(&original, &config).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
