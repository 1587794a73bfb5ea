//! End-to-end reader tests over synthetic containers

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use mvx_archive::{
    collapse_mask, Archive, ArchiveError, ArchiveMeta, ArchiveWriter, AudioClip,
    CameraCalibration, EntryKey, FrameSelection, ImageKind, ModelFrame, PayloadEncoding,
    ScanMesh,
};
use mvx_common::CameraId;
use std::io::Cursor;
use std::path::PathBuf;

fn cam(index: u8) -> CameraId {
    CameraId::new(index).unwrap()
}

fn meta(subject: &str, part: &str, num_device: u32, num_frame: u32) -> ArchiveMeta {
    ArchiveMeta {
        subject: subject.to_string(),
        performance_part: part.to_string(),
        capture_date: "2023-04-12".to_string(),
        actor: mvx_archive::ActorInfo {
            age: 27,
            color: "neutral".to_string(),
            gender: "female".to_string(),
            height_cm: 168.0,
            weight_kg: 57.5,
        },
        camera: mvx_archive::CameraInfo {
            num_device,
            num_frame,
            resolution: [64, 48],
        },
    }
}

fn sample_calibration(seed: f64) -> CameraCalibration {
    CameraCalibration {
        d: vec![0.01 * seed, -0.02, 0.0, 0.0, 0.001],
        k: [
            [1200.0 + seed, 0.0, 512.0],
            [0.0, 1200.0 + seed, 384.0],
            [0.0, 0.0, 1.0],
        ],
        rt: [
            [1.0, 0.0, 0.0, seed],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 2.5],
            [0.0, 0.0, 0.0, 1.0],
        ],
    }
}

fn jpeg_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 32]));
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 95);
    DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
    bytes
}

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn write_archive(writer: &ArchiveWriter, name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    writer.write_to(&path).unwrap();
    (dir, path)
}

/// Speech-type fixture with imagery, calibration, landmarks and audio
fn speech_archive() -> ArchiveWriter {
    let mut writer = ArchiveWriter::new(meta("0026", "s1_all", 60, 4));

    for index in [0u8, 12, 25] {
        writer.add_camera(cam(index));
        writer
            .put_calibration(cam(index), &sample_calibration(index as f64))
            .unwrap();
        for frame in 0..3u32 {
            writer.put_image(
                cam(index),
                ImageKind::Color,
                frame,
                jpeg_bytes(8 + frame, 6, 200),
            );
        }
    }
    // Calibration may cover cameras that never captured anything.
    writer
        .put_calibration(cam(40), &sample_calibration(40.0))
        .unwrap();

    // Landmark results for camera 25, with a detection gap at frame 1.
    writer
        .put_keypoints2d(cam(25), 0, &vec![[1.0, 2.0], [3.0, 4.0]])
        .unwrap();
    writer
        .put_keypoints2d(cam(25), 2, &vec![[5.0, 6.0], [7.0, 8.0]])
        .unwrap();

    writer
        .put_keypoints3d(0, &vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]])
        .unwrap();

    writer
        .put_audio(&AudioClip {
            sample_rate: 16_000,
            samples: vec![0.0, 0.25, -0.25, 0.5],
        })
        .unwrap();

    writer
}

/// Expression-type fixture with model frames, UV textures and scan data
fn expression_archive() -> ArchiveWriter {
    let mut writer = ArchiveWriter::new(meta("0026", "e0", 60, 4));
    writer.add_camera(cam(0));
    writer
        .put_calibration(cam(0), &sample_calibration(0.0))
        .unwrap();

    writer
        .put_model_frame(
            0,
            &ModelFrame {
                global_pose: [0.1, 0.0, 0.0],
                neck_pose: [0.0, 0.1, 0.0],
                jaw_pose: [0.0, 0.0, 0.1],
                left_eye_pose: [0.0; 3],
                right_eye_pose: [0.0; 3],
                translation: [0.0, 0.0, 1.0],
                shape: vec![0.5; 10],
                expression: vec![0.25; 5],
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
                albedo: vec![0.5; 12],
            },
        )
        .unwrap();

    writer.put_uv_texture(0, jpeg_bytes(16, 16, 180));

    writer
        .put_scan_mesh(&ScanMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[0, 1, 2]],
        })
        .unwrap();

    let mask = RgbImage::from_fn(6, 4, |x, _| {
        if x < 3 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    writer.put_scan_mask(cam(0), png_bytes(&mask));

    writer
}

#[test]
fn open_rejects_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.mvc");
    std::fs::write(&path, b"NOTMVCAPnope-this-is-not-a-container").unwrap();

    let err = Archive::open(&path).unwrap_err();
    assert!(matches!(err, ArchiveError::Format(_)));
}

#[test]
fn open_rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.mvc");
    std::fs::write(&path, b"MVC").unwrap();

    let err = Archive::open(&path).unwrap_err();
    assert!(matches!(err, ArchiveError::Format(_)));
}

#[test]
fn open_rejects_oversized_index_length() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lying.mvc");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MVCAPT01");
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let err = Archive::open(&path).unwrap_err();
    assert!(matches!(err, ArchiveError::Format(_)));
}

#[test]
fn open_rejects_missing_metadata() {
    let writer = ArchiveWriter::new(meta("", "s1_all", 60, 4));
    let (_dir, path) = write_archive(&writer, "nosubject.mvc");

    let err = Archive::open(&path).unwrap_err();
    assert!(matches!(err, ArchiveError::Format(_)));
}

#[test]
fn metadata_accessors() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    assert_eq!(archive.meta().subject, "0026");
    assert_eq!(archive.camera_info().num_device, 60);
    assert_eq!(archive.camera_info().num_frame, 4);
    assert_eq!(archive.actor_info().age, 27);
    assert_eq!(archive.capture_date(), "2023-04-12");
    assert!(archive.capabilities().speech);
    assert!(!archive.capabilities().expression);
    assert_eq!(archive.camera_group().len(), 3);
}

#[test]
fn calibration_lookup_and_memoization() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    assert_eq!(archive.calibration_loads(), 0);
    let first = archive.all_calibrations().unwrap().clone();
    assert_eq!(archive.calibration_loads(), 1);
    let second = archive.all_calibrations().unwrap().clone();
    assert_eq!(archive.calibration_loads(), 1);
    assert_eq!(first, second);

    // The memoized table must equal fresh per-key reads.
    for (camera, calib) in &first {
        let fresh = archive.calibration(&camera.to_string()).unwrap();
        assert_eq!(&fresh, calib);
    }

    // Calibration covers camera 40 even though it captured nothing.
    assert_eq!(first.len(), 4);
    assert!(first.contains_key(&cam(40)));
}

#[test]
fn calibration_concurrent_first_calls_collapse() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                archive.all_calibrations().unwrap();
            });
        }
    });

    assert_eq!(archive.calibration_loads(), 1);
}

#[test]
fn calibration_missing_camera_is_not_found() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    let err = archive.calibration("55").unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn single_image_access_tiers() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    // Present frame decodes.
    let img = archive.image("00", ImageKind::Color, 0).unwrap().unwrap();
    assert_eq!(img.height(), 6);

    // Absent frame and absent camera are expected conditions, not errors.
    assert!(archive.image("00", ImageKind::Color, 3).unwrap().is_none());
    assert!(archive.image("30", ImageKind::Color, 0).unwrap().is_none());

    // Malformed camera id is a hard validation error.
    let err = archive.image("7", ImageKind::Color, 0).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidRequest(_)));
}

#[test]
fn mask_decode_matches_channel_max_reduction() {
    let mut writer = ArchiveWriter::new(meta("0026", "s1_all", 60, 4));
    writer.add_camera(cam(0));
    let mask = RgbImage::from_fn(5, 3, |x, y| Rgb([(x * 40) as u8, (y * 80) as u8, 7]));
    writer.put_image(cam(0), ImageKind::Mask, 0, png_bytes(&mask));
    let (_dir, path) = write_archive(&writer, "m.mvc");

    let archive = Archive::open(&path).unwrap();
    let decoded = archive.image("00", ImageKind::Mask, 0).unwrap().unwrap();
    let DynamicImage::ImageLuma8(gray) = decoded else {
        panic!("mask must decode to a single channel");
    };

    // Independent multi-channel decode + per-pixel max across channels.
    let reference = collapse_mask(&image::load_from_memory(&png_bytes(&mask)).unwrap().to_rgb8());
    assert_eq!(gray.as_raw(), reference.as_raw());
}

#[test]
fn gray_mask_roundtrips_unchanged() {
    let mut writer = ArchiveWriter::new(meta("0026", "s1_all", 60, 4));
    writer.add_camera(cam(0));
    let gray = GrayImage::from_fn(4, 4, |x, y| Luma([(x + y * 4) as u8 * 10]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    writer.put_image(cam(0), ImageKind::Mask, 0, bytes);
    let (_dir, path) = write_archive(&writer, "g.mvc");

    let archive = Archive::open(&path).unwrap();
    let decoded = archive.image("00", ImageKind::Mask, 0).unwrap().unwrap();
    assert_eq!(decoded.to_luma8().as_raw(), gray.as_raw());
}

#[test]
fn batch_access_orders_and_errors() {
    let mut writer = ArchiveWriter::new(meta("0026", "s1_all", 60, 8));
    writer.add_camera(cam(0));
    // Width encodes the frame id so ordering is observable after decode.
    for frame in [4u32, 0, 2] {
        writer.put_image(cam(0), ImageKind::Color, frame, jpeg_bytes(10 + frame, 6, 90));
    }
    let (_dir, path) = write_archive(&writer, "b.mvc");
    let archive = Archive::open(&path).unwrap();

    // "All" yields ascending frame order.
    let all = archive
        .images("00", ImageKind::Color, FrameSelection::All)
        .unwrap();
    let widths: Vec<u32> = all.iter().map(|img| img.width()).collect();
    assert_eq!(widths, vec![10, 12, 14]);

    // Explicit lists keep input order.
    let listed = archive
        .images("00", ImageKind::Color, FrameSelection::Frames(vec![2, 0]))
        .unwrap();
    let widths: Vec<u32> = listed.iter().map(|img| img.width()).collect();
    assert_eq!(widths, vec![12, 10]);

    // A missing frame inside a batch is a hard error, unlike single access.
    let err = archive
        .images("00", ImageKind::Color, FrameSelection::Frames(vec![0, 1]))
        .unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));

    // So is a camera with no entries at all.
    let err = archive
        .images("30", ImageKind::Color, FrameSelection::All)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn keypoints2d_tiers() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    // Outside the landmark detector range: malformed request.
    let err = archive.keypoints2d("05", 0).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidRequest(_)));

    // Frame beyond the sequence: malformed request.
    let err = archive.keypoints2d("25", 99).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidRequest(_)));

    // In-range camera with no detector output at all.
    assert!(archive.keypoints2d("20", 0).unwrap().is_none());

    // Detection gap at frame 1 (occlusion) is expected.
    assert!(archive.keypoints2d("25", 1).unwrap().is_none());

    let landmarks = archive.keypoints2d("25", 0).unwrap().unwrap();
    assert_eq!(landmarks, vec![[1.0, 2.0], [3.0, 4.0]]);
}

#[test]
fn keypoints3d_presence() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    assert!(archive.keypoints3d(0).unwrap().is_some());
    assert!(archive.keypoints3d(1).unwrap().is_none());
    assert!(matches!(
        archive.keypoints3d(99),
        Err(ArchiveError::InvalidRequest(_))
    ));
}

#[test]
fn capability_gating_by_performance_part() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let speech = Archive::open(&path).unwrap();

    // Speech take: audio present, expression modalities gated off.
    let audio = speech.audio().unwrap().unwrap();
    assert_eq!(audio.sample_rate, 16_000);
    assert!(speech.model_frame(0).unwrap().is_none());
    assert!(speech.uv_texture(0).unwrap().is_none());
    assert!(speech.scan_mesh().unwrap().is_none());
    assert!(speech.scan_mask("00").unwrap().is_none());

    let (_dir2, path2) = write_archive(&expression_archive(), "e.mvc");
    let expression = Archive::open(&path2).unwrap();

    // Expression take: the reverse.
    assert!(expression.audio().unwrap().is_none());
    let model = expression.model_frame(0).unwrap().unwrap();
    assert_eq!(model.shape.len(), 10);
    assert!(expression.uv_texture(0).unwrap().is_some());
    let mesh = expression.scan_mesh().unwrap().unwrap();
    assert_eq!(mesh.triangles.len(), 1);
    let mask = expression.scan_mask("00").unwrap().unwrap();
    assert_eq!(mask.to_luma8().get_pixel(0, 0).0, [255]);
}

#[test]
fn wrong_payload_kind_is_fatal() {
    let mut writer = speech_archive();
    // A numeric payload planted where compressed image bytes belong.
    writer.put_entry(
        EntryKey::Image {
            camera: cam(0),
            kind: ImageKind::Color,
            frame: 3,
        },
        PayloadEncoding::Raw,
        vec![1, 2, 3],
    );
    let (_dir, path) = write_archive(&writer, "w.mvc");
    let archive = Archive::open(&path).unwrap();

    let err = archive.image("00", ImageKind::Color, 3).unwrap_err();
    assert!(matches!(err, ArchiveError::Decode(_)));
}

#[test]
fn corrupt_image_payload_is_a_decode_error() {
    let mut writer = speech_archive();
    writer.put_entry(
        EntryKey::Image {
            camera: cam(12),
            kind: ImageKind::Color,
            frame: 3,
        },
        PayloadEncoding::CompressedImage,
        b"definitely not a jpeg".to_vec(),
    );
    let (_dir, path) = write_archive(&writer, "c.mvc");
    let archive = Archive::open(&path).unwrap();

    let err = archive.image("12", ImageKind::Color, 3).unwrap_err();
    assert!(matches!(err, ArchiveError::Decode(_)));

    // The corrupt entry does not poison neighbors.
    assert!(archive.image("12", ImageKind::Color, 0).unwrap().is_some());
}

#[test]
fn group_counts_reflect_entries() {
    let (_dir, path) = write_archive(&speech_archive(), "s.mvc");
    let archive = Archive::open(&path).unwrap();

    let counts = archive.group_counts();
    assert_eq!(counts.get("calibration"), Some(&4));
    assert_eq!(counts.get("images"), Some(&9));
    assert_eq!(counts.get("keypoints2d"), Some(&2));
    assert_eq!(counts.get("keypoints3d"), Some(&1));
    assert_eq!(counts.get("audio"), Some(&1));
    assert_eq!(counts.get("scan"), None);
}
