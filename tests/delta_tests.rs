//! Delta codec tests: format scenarios, checksum arithmetic, round trips.

use repliq::delta::{NHASH, apply, checksum, encode, output_size};

/// Deterministic byte generator (fixed LCG step) so fixtures are stable.
fn pseudo_bytes(n: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

#[test]
fn checksum_known_value() {
    // Four-byte lane pass over "hell", fold, then the 'o' tail shifted into
    // the top byte.
    assert_eq!(checksum(b"hello"), 3_613_748_332);
}

#[test]
fn checksum_empty_is_zero() {
    assert_eq!(checksum(b""), 0);
}

#[test]
fn short_source_emits_single_literal() {
    // Source at or below the window size can never produce a copy command.
    let delta = encode(b"abc", b"hello");
    assert_eq!(delta, b"5\n5:hello3NPMmh;");
}

#[test]
fn self_match_collapses_to_one_copy() {
    let buf = pseudo_bytes(256, 1);
    let delta = encode(&buf, &buf);
    assert!(
        delta.starts_with(b"40\n40@0,"),
        "expected a single whole-buffer copy, got {:?}",
        String::from_utf8_lossy(&delta)
    );
    assert!(delta.ends_with(b";"));
    assert!(delta.len() < 32);
    assert_eq!(apply(&buf, &delta).unwrap(), buf);
}

#[test]
fn round_trip_empty_target() {
    let src = pseudo_bytes(100, 3);
    let delta = encode(&src, b"");
    assert_eq!(apply(&src, &delta).unwrap(), b"");
}

#[test]
fn round_trip_empty_source() {
    let target = pseudo_bytes(300, 4);
    let delta = encode(b"", &target);
    assert_eq!(apply(b"", &delta).unwrap(), target);
}

#[test]
fn round_trip_short_source() {
    for n in 0..=NHASH {
        let src = pseudo_bytes(n, 5);
        let target = pseudo_bytes(200, 6);
        let delta = encode(&src, &target);
        assert_eq!(apply(&src, &delta).unwrap(), target, "src len {n}");
    }
}

#[test]
fn round_trip_with_edits() {
    // A realistic blob update: a replaced run, an insertion, a deletion.
    let src = pseudo_bytes(4096, 7);
    let mut changed = src.clone();
    changed[100..132].copy_from_slice(&pseudo_bytes(32, 9));
    let target = [&changed[..2000], &pseudo_bytes(77, 11)[..], &changed[2100..]].concat();

    let delta = encode(&src, &target);
    assert_eq!(apply(&src, &delta).unwrap(), target);
    assert!(
        delta.len() < target.len() / 2,
        "mostly-shared content should compress: {} vs {}",
        delta.len(),
        target.len()
    );
}

#[test]
fn round_trip_unrelated_buffers() {
    let src = pseudo_bytes(500, 21);
    let target = pseudo_bytes(500, 22);
    let delta = encode(&src, &target);
    assert_eq!(apply(&src, &delta).unwrap(), target);
}

#[test]
fn output_size_reads_header() {
    let src = pseudo_bytes(1000, 13);
    let target = pseudo_bytes(750, 14);
    let delta = encode(&src, &target);
    assert_eq!(output_size(&delta).unwrap(), target.len());
}

#[test]
fn apply_rejects_corrupted_literal() {
    let mut delta = encode(b"abc", b"hello").to_vec();
    let pos = delta.iter().position(|&b| b == b'h').unwrap();
    delta[pos] = b'x';
    assert!(apply(b"abc", &delta).is_err());
}

#[test]
fn apply_rejects_copy_out_of_bounds() {
    // 5-byte target claimed as a copy of 5 bytes at offset 60 of a 3-byte
    // source (after the mandatory size header).
    let delta = b"5\n5@y,0;";
    assert!(apply(b"abc", delta).is_err());
}
