use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use dirigo_core::{
    AcquisitionRequest, AcquisitionSession, CaptureMode, EditForm, Engine, FrameField,
    FrameSpecModel, FramesPerFile, LoggerSettings, Position, SessionOptions, StackSpecModel,
    ViewerMessage,
};
use dirigo_sim::{SimConfig, SimEngine};
use tiff::decoder::Decoder;

fn engine() -> SimEngine {
    SimEngine::new(SimConfig {
        realtime: false,
        ..SimConfig::default()
    })
}

/// 20 x 20 pixel frames, `frames` per series.
fn small_frame(frames: u32) -> FrameSpecModel {
    let mut form = EditForm::new(FrameSpecModel::default());
    form.edit(FrameField::PixelWidth, "20 um").unwrap();
    form.edit(FrameField::FramesPerSeries, &frames.to_string()).unwrap();
    assert_eq!(form.model().shape(), (20, 20));
    form.snapshot()
}

fn run_to_end(session: &mut AcquisitionSession) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while session.is_alive() {
        assert!(Instant::now() < deadline, "acquisition did not finish");
        std::thread::sleep(Duration::from_millis(5));
    }
    session.stop().unwrap();
}

fn count_pages(path: &Path) -> usize {
    let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
    let mut pages = 1;
    while decoder.more_images() {
        decoder.next_image().unwrap();
        pages += 1;
    }
    pages
}

fn tif_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "tif"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_series_logs_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let mut logger = LoggerSettings::with_path(dir.path().join("run"));
    logger.basename = "beads".into();
    logger.frames_per_file = FramesPerFile::Finite(2);

    let frame = small_frame(5).generate_spec();
    let request = CaptureMode::Series.request(frame, &StackSpecModel::default());
    let options = SessionOptions {
        logger: Some(logger),
        ..SessionOptions::default()
    };
    let mut session = AcquisitionSession::start(&engine, request, options).unwrap();
    run_to_end(&mut session);
    assert_eq!(session.frames_logged(), Some(5));

    let files = tif_files(&dir.path().join("run"));
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["beads_0.tif", "beads_1.tif", "beads_2.tif"]);
    // Two channels, one page each per frame.
    assert_eq!(count_pages(&files[0]), 4);
    assert_eq!(count_pages(&files[1]), 4);
    assert_eq!(count_pages(&files[2]), 2);

    let mut decoder = Decoder::new(File::open(&files[0]).unwrap()).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (20, 20));
}

#[test]
fn test_raw_logging_renames_files() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let mut logger = LoggerSettings::with_path(dir.path());
    logger.save_raw = true;
    logger.frames_per_file = FramesPerFile::Unlimited;

    let request = AcquisitionRequest::Frame(small_frame(3).generate_spec());
    let options = SessionOptions {
        logger: Some(logger),
        ..SessionOptions::default()
    };
    let mut session = AcquisitionSession::start(&engine, request, options).unwrap();
    run_to_end(&mut session);

    let files = tif_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("file_raw.tif"));
    assert_eq!(count_pages(&files[0]), 6);
}

#[test]
fn test_stack_visits_every_depth() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine();
    let stack = StackSpecModel::new(
        Position::from_micrometers(-10.0),
        Position::from_micrometers(20.0),
        Position::from_micrometers(10.0),
    )
    .unwrap();
    assert_eq!(stack.depths(), 4);

    let request = CaptureMode::Stack.request(small_frame(1).generate_spec(), &stack);
    let options = SessionOptions {
        logger: Some(LoggerSettings::with_path(dir.path())),
        ..SessionOptions::default()
    };
    let mut session = AcquisitionSession::start(&engine, request, options).unwrap();
    run_to_end(&mut session);

    assert_eq!(session.frames_logged(), Some(4));
    let z = engine.z_scanner().unwrap();
    assert_relative_eq!(z.position().micrometers(), 20.0, epsilon = 1e-6);
}

#[test]
fn test_preview_runs_until_stopped() {
    let engine = engine();
    let frame = small_frame(1).generate_spec();
    let request = CaptureMode::Preview.request(frame, &StackSpecModel::default());
    let mut session =
        AcquisitionSession::start(&engine, request, SessionOptions::default()).unwrap();
    let viewer = session.take_viewer().unwrap();
    assert!(session.take_viewer().is_none());
    assert_eq!(session.display_channels().len(), 2);

    let first = viewer.recv_timeout(Duration::from_secs(10)).unwrap();
    match first {
        ViewerMessage::Frame(frame) => assert_eq!((frame.width, frame.height), (20, 20)),
        ViewerMessage::EndOfStream => panic!("preview ended on its own"),
    }
    assert!(session.is_alive());
    assert_eq!(session.frames_logged(), None);

    session.stop().unwrap();
    assert!(!session.is_alive());
    // The viewer inbox disconnects once the display worker has exited.
    let remaining: Vec<_> = viewer.iter().collect();
    assert!(remaining.len() <= dirigo_sim::VIEWER_CAPACITY);
    session.stop().unwrap();
}

#[test]
fn test_stack_without_z_scanner_fails_to_start() {
    let engine = SimEngine::new(SimConfig {
        has_z_scanner: false,
        realtime: false,
        ..SimConfig::default()
    });
    let frame = small_frame(1).generate_spec();
    let request = CaptureMode::Stack.request(frame, &StackSpecModel::default());
    let result = AcquisitionSession::start(&engine, request, SessionOptions::default());
    assert!(matches!(
        result,
        Err(dirigo_core::Error::HardwareUnavailable("z scanner"))
    ));
}
