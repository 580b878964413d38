//! Tests for lockstep merging across phase streams.

use super::*;
use ctcsmooth_ark::{ArkError, ArkFormat, ArkResult, ArkWriter, Matrix, Precision};

type Stream = std::vec::IntoIter<ArkResult<(String, Matrix)>>;

fn ramp(rows: usize, cols: usize, seed: f64) -> Matrix {
    let data = (0..rows * cols)
        .map(|i| seed + (i as f64) * 0.125)
        .collect();
    Matrix::from_vec(rows, cols, data, Precision::Float).unwrap()
}

fn stream(recs: Vec<(&str, Matrix)>) -> Stream {
    recs.into_iter()
        .map(|(k, m)| Ok((k.to_string(), m)))
        .collect::<Vec<_>>()
        .into_iter()
}

fn merge(streams: Vec<Stream>) -> Vec<SmoothResult<(String, Matrix)>> {
    Lockstep::new(streams).collect()
}

fn write_binary(streams: Vec<Stream>) -> (SmoothResult<RunStats>, Vec<u8>) {
    let mut out = ArkWriter::new(Vec::new(), ArkFormat::Binary);
    let result = smooth_streams(streams, &mut out);
    (result, out.into_inner())
}

// ============================================================================
// Averaging through lockstep
// ============================================================================

#[test]
fn test_single_stream_passthrough() {
    let a = ramp(4, 3, 0.0);
    let b = ramp(2, 3, 1.0);
    let (result, bytes) = write_binary(vec![stream(vec![("u1", a.clone()), ("u2", b.clone())])]);
    assert_eq!(result.unwrap(), RunStats { utterances: 2, frames: 6 });

    let mut expected = ArkWriter::new(Vec::new(), ArkFormat::Binary);
    expected.write("u1", &a).unwrap();
    expected.write("u2", &b).unwrap();
    assert_eq!(bytes, expected.into_inner());
}

#[test]
fn test_three_streams_truncate_to_last() {
    let m1 = ramp(10, 40, 0.0);
    let m2 = ramp(10, 40, 1.0);
    let m3 = ramp(8, 40, 2.0);

    let out = merge(vec![
        stream(vec![("utt1", m1.clone())]),
        stream(vec![("utt1", m2.clone())]),
        stream(vec![("utt1", m3.clone())]),
    ]);
    assert_eq!(out.len(), 1);
    let (key, mat) = out.into_iter().next().unwrap().unwrap();
    assert_eq!(key, "utt1");
    assert_eq!(mat.shape(), (8, 40));

    for r in 0..8 {
        for c in 0..40 {
            let v = |m: &Matrix| m.get(r, c).unwrap() as f32;
            let want = (v(&m1) + v(&m2) + v(&m3)) / 3.0;
            assert_eq!(mat.get(r, c).unwrap(), want as f64);
        }
    }
}

#[test]
fn test_two_streams_shorter_first_fails() {
    let out = merge(vec![
        stream(vec![("utt1", ramp(5, 40, 0.0))]),
        stream(vec![("utt1", ramp(7, 40, 0.0))]),
    ]);
    assert_eq!(out.len(), 1);
    assert!(matches!(
        out[0],
        Err(SmoothError::ShapeMismatch { expected_rows: 7, got_rows: 5, .. })
    ));
}

#[test]
fn test_mismatch_stops_after_written_records() {
    let (result, bytes) = write_binary(vec![
        stream(vec![("a", ramp(2, 2, 0.0)), ("b", ramp(1, 2, 0.0)), ("c", ramp(2, 2, 0.0))]),
        stream(vec![("a", ramp(2, 2, 0.0)), ("b", ramp(3, 2, 0.0)), ("c", ramp(2, 2, 0.0))]),
    ]);
    assert!(matches!(result, Err(SmoothError::ShapeMismatch { ref key, .. }) if key == "b"));

    let mut expected = ArkWriter::new(Vec::new(), ArkFormat::Binary);
    expected.write("a", &ramp(2, 2, 0.0)).unwrap();
    assert_eq!(bytes, expected.into_inner());
}

#[test]
fn test_unsupported_stream_counts_emit_nothing() {
    let none: Vec<Stream> = Vec::new();
    assert!(merge(none).is_empty());

    let five = (0..5).map(|_| stream(vec![("u", ramp(1, 1, 0.0))])).collect();
    let (result, bytes) = write_binary(five);
    assert_eq!(result.unwrap(), RunStats::default());
    assert!(bytes.is_empty());
}

// ============================================================================
// Lockstep alignment
// ============================================================================

#[test]
fn test_stops_at_shortest_stream() {
    let out = merge(vec![
        stream(vec![("a", ramp(2, 2, 0.0)), ("b", ramp(2, 2, 0.0)), ("c", ramp(2, 2, 0.0))]),
        stream(vec![("a", ramp(2, 2, 0.0)), ("b", ramp(2, 2, 0.0))]),
    ]);
    let keys: Vec<_> = out.into_iter().map(|r| r.unwrap().0).collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn test_key_comes_from_first_stream() {
    let out = merge(vec![
        stream(vec![("first", ramp(1, 2, 0.0))]),
        stream(vec![("second", ramp(1, 2, 0.0))]),
    ]);
    assert_eq!(out[0].as_ref().unwrap().0, "first");
}

#[test]
fn test_read_error_propagates() {
    let bad: Stream = vec![Err(ArkError::UnexpectedEof)].into_iter();
    let out = merge(vec![stream(vec![("a", ramp(1, 1, 0.0))]), bad]);
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0], Err(SmoothError::Ark(ArkError::UnexpectedEof))));
}

#[test]
fn test_rerun_is_byte_identical() {
    let build = || {
        vec![
            stream(vec![("x", ramp(6, 5, 0.3)), ("y", ramp(3, 5, 0.1))]),
            stream(vec![("x", ramp(6, 5, 0.7)), ("y", ramp(4, 5, 0.2))]),
            stream(vec![("x", ramp(5, 5, 0.9)), ("y", ramp(3, 5, 0.4))]),
        ]
    };
    let (r1, b1) = write_binary(build());
    let (r2, b2) = write_binary(build());
    assert_eq!(r1.unwrap(), r2.unwrap());
    assert!(!b1.is_empty());
    assert_eq!(b1, b2);
}

#[test]
fn test_truncation_never_grows() {
    let out = merge(vec![
        stream(vec![("u", ramp(9, 3, 0.0))]),
        stream(vec![("u", ramp(4, 3, 0.0))]),
    ]);
    assert_eq!(out[0].as_ref().unwrap().1.rows(), 4);
}

// ============================================================================
// Subprocess pipeline
// ============================================================================

#[cfg(unix)]
#[test]
fn test_smoother_runs_scorer_pipelines() {
    // The scorer arguments are swallowed by `true`.
    let config = SmoothConfig {
        cmd: r"printf 'utt1 [ 1 2 ]\nutt2 [ 3 5 ]\n'; true".into(),
        frames: 2,
        ..Default::default()
    };
    let smoother = Smoother::new(config);
    assert_eq!(smoother.commands().len(), 2);

    let mut out = ArkWriter::new(Vec::new(), ArkFormat::Text);
    let stats = smoother.run(&mut out).unwrap();
    assert_eq!(stats, RunStats { utterances: 2, frames: 2 });
    assert_eq!(
        String::from_utf8(out.into_inner()).unwrap(),
        "utt1  [\n  1 2 ]\nutt2  [\n  3 5 ]\n"
    );
}

#[test]
fn test_smoother_out_of_range_spawns_nothing() {
    let config = SmoothConfig {
        cmd: "/nonexistent/scorer".into(),
        frames: 7,
        ..Default::default()
    };
    let mut out = ArkWriter::new(Vec::new(), ArkFormat::Binary);
    let stats = Smoother::new(config).run(&mut out).unwrap();
    assert_eq!(stats, RunStats::default());
    assert!(out.into_inner().is_empty());
}
