//! Overlay compositing tests.
//!
//! The pixel-exact assertions go through [`compose`] in memory; tests that
//! exercise the file-based stage functions only check structure (names,
//! dimensions), since the frame files are JPEG and recompression is lossy.

use image::{Rgb, RgbImage};

use delineate::{
    CLASSES, DelineateError, EXPECTED_SCORE_COUNT, Frame, NullSegmenter, OVERLAY_PALETTE,
    SAMPLE_HEIGHT, SAMPLE_WIDTH, SegmentationMap, Segmenter, apply_overlays, compose,
    overlay_frame,
};

fn solid_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([120, 90, 60]))
}

fn darkened(image: &RgbImage) -> RgbImage {
    let mut copy = image.clone();
    for pixel in copy.pixels_mut() {
        for value in &mut pixel.0 {
            *value = (f32::from(*value) / 1.5) as u8;
        }
    }
    copy
}

fn background_only() -> Vec<f32> {
    vec![0.0; EXPECTED_SCORE_COUNT]
}

// Set a rectangular high-score region in one channel.
fn with_region(
    mut scores: Vec<f32>,
    channel: usize,
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
) -> Vec<f32> {
    for row in rows {
        for col in cols.clone() {
            scores[(row * SAMPLE_WIDTH as usize + col) * CLASSES + channel] = 1.0;
        }
    }
    scores
}

fn map_from(scores: Vec<f32>) -> SegmentationMap {
    SegmentationMap::from_scores(scores).expect("well-shaped scores")
}

struct MapSegmenter {
    scores: Vec<f32>,
}

impl Segmenter for MapSegmenter {
    fn predict(&self, _sample: &RgbImage) -> Vec<f32> {
        self.scores.clone()
    }
}

fn count_pixels(image: &RgbImage, color: Rgb<u8>) -> usize {
    image.pixels().filter(|&&pixel| pixel == color).count()
}

// ── compose ────────────────────────────────────────────────────────

#[test]
fn background_only_map_yields_darkened_frame() {
    let original = solid_frame(64, 48);
    let mut composited = original.clone();

    compose(&mut composited, &map_from(background_only()));

    assert_eq!(composited, darkened(&original));
}

#[test]
fn region_channel_draws_its_palette_color() {
    let mut composited = solid_frame(64, 64);
    let scores = with_region(background_only(), 3, 64..192, 64..192);

    compose(&mut composited, &map_from(scores));

    assert!(count_pixels(&composited, OVERLAY_PALETTE[3]) > 0);
    for channel in (1..CLASSES).filter(|&channel| channel != 3) {
        assert_eq!(
            count_pixels(&composited, OVERLAY_PALETTE[channel]),
            0,
            "channel {channel} must not be drawn",
        );
    }
}

#[test]
fn outline_is_hollow() {
    let mut composited = solid_frame(64, 64);
    let scores = with_region(background_only(), 1, 64..192, 64..192);

    compose(&mut composited, &map_from(scores));

    // The region center (native coordinates) stays darkened: only the
    // dilated perimeter is painted.
    let darkened_pixel = *darkened(&solid_frame(1, 1)).get_pixel(0, 0);
    assert_eq!(*composited.get_pixel(32, 32), darkened_pixel);
    assert!(count_pixels(&composited, OVERLAY_PALETTE[1]) > 0);
}

#[test]
fn channel_zero_is_never_drawn() {
    let original = solid_frame(64, 64);
    let mut composited = original.clone();
    let scores = with_region(background_only(), 0, 64..192, 64..192);

    compose(&mut composited, &map_from(scores));

    assert_eq!(composited, darkened(&original));
}

#[test]
fn non_finite_channel_is_skipped() {
    let original = solid_frame(64, 64);
    let mut composited = original.clone();
    let mut scores = with_region(background_only(), 2, 64..192, 64..192);
    scores[(100 * SAMPLE_WIDTH as usize + 100) * CLASSES + 2] = f32::NAN;

    compose(&mut composited, &map_from(scores));

    // The poisoned channel contributes nothing; the frame still composes.
    assert_eq!(composited, darkened(&original));
}

#[test]
fn higher_channel_wins_on_overlap() {
    let mut composited = solid_frame(64, 64);
    let scores = with_region(
        with_region(background_only(), 2, 64..192, 64..192),
        3,
        64..192,
        64..192,
    );

    compose(&mut composited, &map_from(scores));

    assert_eq!(count_pixels(&composited, OVERLAY_PALETTE[2]), 0);
    assert!(count_pixels(&composited, OVERLAY_PALETTE[3]) > 0);
}

// ── overlay_frame / apply_overlays ─────────────────────────────────

#[test]
fn overlay_frame_preserves_file_name() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let output_dir = workspace.path().join("processed");
    std::fs::create_dir(&output_dir).expect("output dir");

    let frame_path = workspace.path().join("frame_00001.jpg");
    solid_frame(32, 32).save(&frame_path).expect("write frame");

    let frame = Frame {
        index: 1,
        path: frame_path,
    };
    overlay_frame(&frame, &NullSegmenter, &output_dir).expect("overlay");

    let output = image::open(output_dir.join("frame_00001.jpg")).expect("read output");
    assert_eq!((output.width(), output.height()), (32, 32));
}

#[test]
fn malformed_inference_output_is_fatal() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let frame_path = workspace.path().join("frame_00007.jpg");
    solid_frame(16, 16).save(&frame_path).expect("write frame");

    let frame = Frame {
        index: 7,
        path: frame_path,
    };
    let truncated = MapSegmenter {
        scores: vec![0.0; 7],
    };

    let error = overlay_frame(&frame, &truncated, workspace.path())
        .expect_err("shape mismatch must fail");

    match error {
        DelineateError::InferenceShape {
            frame_index,
            expected,
            actual,
        } => {
            assert_eq!(frame_index, 7);
            assert_eq!(expected, EXPECTED_SCORE_COUNT);
            assert_eq!(actual, 7);
        }
        other => panic!("expected InferenceShape, got: {other}"),
    }
}

#[test]
fn apply_overlays_processes_every_frame() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let output_dir = workspace.path().join("processed");

    let mut frames = Vec::new();
    for index in 1..=3 {
        let path = workspace.path().join(format!("frame_0000{index}.jpg"));
        solid_frame(24, 24).save(&path).expect("write frame");
        frames.push(Frame { index, path });
    }

    apply_overlays(&frames, &NullSegmenter, &output_dir, 2).expect("overlay stage");

    for index in 1..=3 {
        assert!(
            output_dir.join(format!("frame_0000{index}.jpg")).exists(),
            "missing output frame {index}",
        );
    }
}

#[test]
fn apply_overlays_creates_missing_output_directory() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let output_dir = workspace.path().join("nested").join("processed");

    apply_overlays(&[], &NullSegmenter, &output_dir, 1).expect("empty overlay stage");
    assert!(output_dir.is_dir());
}
