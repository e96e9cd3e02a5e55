//! TIFF logger: one 16-bit page per channel per frame, rolling over to a new
//! file every `frames_per_file` frames.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tiff::encoder::{colortype, TiffEncoder};

use dirigo_core::{FrameRef, Logger, LoggerSettings, RawFrame, Worker, WorkerThread};

use crate::error::{Error, Result};
use crate::worker::consume;

/// Buffered file shared with the encoder writing into it.
#[derive(Clone)]
struct SharedFile(Arc<Mutex<BufWriter<File>>>);

impl SharedFile {
    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl Seek for SharedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.lock().seek(pos)
    }
}

/// One open TIFF file.
struct OpenFile {
    encoder: TiffEncoder<SharedFile>,
    file: SharedFile,
}

impl OpenFile {
    fn create(path: &Path) -> Result<Self> {
        let file = SharedFile(Arc::new(Mutex::new(BufWriter::new(File::create(path)?))));
        let encoder = TiffEncoder::new(file.clone())?;
        Ok(Self { encoder, file })
    }

    /// Flushes the buffered tail and syncs the file, reporting failures that
    /// dropping the writer would swallow.
    fn close(self) -> Result<()> {
        let Self { encoder, file } = self;
        drop(encoder);
        let mut writer = file.lock();
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Sequence of multi-page TIFF files.
pub struct TiffSeries {
    settings: LoggerSettings,
    current: Option<OpenFile>,
    frames_in_file: u64,
    next_file: u32,
    files: Vec<PathBuf>,
}

impl TiffSeries {
    #[must_use]
    pub fn new(settings: LoggerSettings) -> Self {
        Self {
            settings,
            current: None,
            frames_in_file: 0,
            next_file: 0,
            files: Vec::new(),
        }
    }

    /// Files opened so far, in order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Closes the open file, if any.
    ///
    /// # Errors
    /// Fails if the buffered tail cannot be written or synced.
    pub fn finish(&mut self) -> Result<()> {
        match self.current.take() {
            Some(open) => open.close(),
            None => Ok(()),
        }
    }

    fn open_next(&mut self) -> Result<()> {
        self.finish()?;
        let path = self.settings.file_path(self.next_file, "tif");
        let open = OpenFile::create(&path)?;
        log::info!("logging to {}", path.display());
        self.current = Some(open);
        self.frames_in_file = 0;
        self.next_file += 1;
        self.files.push(path);
        Ok(())
    }

    /// Appends every channel of `frame` as a page.
    ///
    /// # Errors
    /// Fails on I/O errors or when a plane does not match the frame size.
    pub fn write(&mut self, frame: &RawFrame) -> Result<()> {
        if let Some(bad) = frame.channels.iter().position(|p| p.len() != frame.pixel_count()) {
            return Err(Error::InvalidFrame(format!(
                "channel {bad} of frame {} has {} samples, expected {}",
                frame.index,
                frame.channels[bad].len(),
                frame.pixel_count()
            )));
        }
        if self.current.is_none() || self.settings.frames_per_file.is_full(self.frames_in_file) {
            self.open_next()?;
        }
        let Some(open) = self.current.as_mut() else {
            return Err(Error::InvalidFrame("no open file".into()));
        };
        for plane in &frame.channels {
            open.encoder.write_image::<colortype::Gray16>(frame.width, frame.height, plane)?;
        }
        self.frames_in_file += 1;
        Ok(())
    }
}

/// Logger worker writing a [`TiffSeries`].
pub struct TiffLogger {
    inbox: Option<Receiver<FrameRef>>,
    settings: LoggerSettings,
    written: Arc<AtomicU64>,
    thread: WorkerThread,
}

impl TiffLogger {
    /// Prepares the save directory.
    ///
    /// # Errors
    /// Fails if the directory cannot be created.
    pub fn new(inbox: Receiver<FrameRef>, settings: LoggerSettings) -> Result<Self> {
        std::fs::create_dir_all(&settings.save_path)?;
        Ok(Self {
            inbox: Some(inbox),
            settings,
            written: Arc::new(AtomicU64::new(0)),
            thread: WorkerThread::new("logger-tiff"),
        })
    }
}

impl Worker for TiffLogger {
    fn name(&self) -> &str {
        self.thread.name()
    }

    fn start(&mut self) -> dirigo_core::Result<()> {
        let inbox = self
            .inbox
            .take()
            .ok_or_else(|| dirigo_core::Error::Engine("logger already started".into()))?;
        let mut series = TiffSeries::new(self.settings.clone());
        let written = Arc::clone(&self.written);
        self.thread.spawn(move |signal| {
            let consumed = consume(&inbox, &signal, |frame| {
                series.write(&frame)?;
                written.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
            let finished = series.finish();
            let handled = consumed?;
            finished?;
            log::info!("logged {handled} frame(s) to {} file(s)", series.files().len());
            Ok(())
        })
    }

    fn stop(&self) {
        self.thread.request_stop();
    }

    fn join(&mut self) -> dirigo_core::Result<()> {
        self.thread.join()
    }

    fn is_alive(&self) -> bool {
        self.thread.is_alive()
    }
}

impl Logger for TiffLogger {
    fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    fn frames_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}
