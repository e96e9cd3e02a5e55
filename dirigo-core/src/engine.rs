//! Engine interface: worker traits, frame types and worker-to-worker wiring.
//!
//! An engine backend builds four kinds of workers (acquisition, processor,
//! display, logger), each running on its own thread. Workers are wired with
//! [`Publisher`]s: a downstream worker is built from a receiver obtained by
//! subscribing to its upstream worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::acquisition::AcquisitionRequest;
use crate::display::{DataRange, DisplayChannelHandle, FrameAverage, Gamma};
use crate::error::{Error, Result};
use crate::logger::LoggerSettings;
use crate::stage::{LinearAxis, XyStage};
use crate::units::{Frequency, Position};

/// Default queue depth between workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// One multi-channel frame as produced by the digitizer or a processor.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Sequence number within the acquisition, starting at 0.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// One row-major plane per enabled digitizer channel.
    pub channels: Vec<Vec<u16>>,
    /// Objective position for stack frames.
    pub depth: Option<Position>,
}

impl RawFrame {
    /// Zero-filled frame with `channel_count` planes.
    #[must_use]
    pub fn zeroed(index: u64, width: u32, height: u32, channel_count: usize) -> Self {
        let len = width as usize * height as usize;
        Self {
            index,
            width,
            height,
            channels: vec![vec![0; len]; channel_count],
            depth: None,
        }
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Frames are shared between subscribers without copying.
pub type FrameRef = Arc<RawFrame>;

/// Display-ready 8-bit RGB image, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbFrame {
    #[must_use]
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }

    /// `[r, g, b]` at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        self.pixels
            .get(offset..offset + 3)
            .map(|p| [p[0], p[1], p[2]])
    }
}

/// Items delivered to the live viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerMessage {
    Frame(RgbFrame),
    /// The display worker finished; no more frames follow.
    EndOfStream,
}

/// Bounded fan-out from one worker to any number of subscribers.
///
/// Each subscriber owns a bounded queue. [`Publisher::publish`] blocks while
/// a subscriber's queue is full; [`Publisher::publish_lossy`] drops the item
/// for that subscriber instead. Subscribers whose receiver was dropped are
/// forgotten. [`Publisher::close`] drops every sender, which subscribers see
/// as a disconnected channel.
#[derive(Debug)]
pub struct Publisher<T> {
    capacity: usize,
    subscribers: Mutex<Subscribers<T>>,
}

#[derive(Debug)]
struct Subscribers<T> {
    next_id: u64,
    senders: Vec<(u64, SyncSender<T>)>,
}

impl<T: Clone> Publisher<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                senders: Vec::new(),
            }),
        }
    }

    /// Adds a subscriber and returns its inbox.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        let mut subscribers = self.lock();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.senders.push((id, tx));
        rx
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Delivers `item` to every subscriber, waiting for queue space.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, item: &T) -> usize {
        // Cloned out so a blocked send does not hold the lock.
        let senders = self.lock().senders.clone();
        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, tx) in &senders {
            if tx.send(item.clone()).is_ok() {
                delivered += 1;
            } else {
                gone.push(*id);
            }
        }
        if !gone.is_empty() {
            self.lock().senders.retain(|(id, _)| !gone.contains(id));
        }
        delivered
    }

    /// Delivers `item` to every subscriber with queue space and drops it for
    /// the rest.
    pub fn publish_lossy(&self, item: &T) -> usize {
        let mut subscribers = self.lock();
        let mut delivered = 0;
        subscribers
            .senders
            .retain(|(_, tx)| match tx.try_send(item.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
        delivered
    }

    /// Disconnects every subscriber.
    pub fn close(&self) {
        self.lock().senders.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers<T>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cooperative stop flag shared between a worker handle and its thread.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A named thread with a stop signal; the building block of engine workers.
#[derive(Debug)]
pub struct WorkerThread {
    name: String,
    signal: StopSignal,
    handle: Option<JoinHandle<Result<()>>>,
}

impl WorkerThread {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signal: StopSignal::new(),
            handle: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Runs `body` on a new thread.
    ///
    /// # Errors
    /// Fails if the worker was already started or the OS refuses the thread.
    pub fn spawn<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(StopSignal) -> Result<()> + Send + 'static,
    {
        if self.handle.is_some() {
            return Err(Error::Engine(format!("worker {} already started", self.name)));
        }
        let signal = self.signal.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || body(signal))?;
        self.handle = Some(handle);
        log::debug!("worker {} started", self.name);
        Ok(())
    }

    pub fn request_stop(&self) {
        self.signal.request();
    }

    /// Whether the thread was started and has not finished.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Waits for the thread and returns the body's result.
    ///
    /// Joining a worker that never started, or joining twice, is a no-op.
    ///
    /// # Errors
    /// Returns the body's error, or [`Error::WorkerFailed`] if it panicked.
    pub fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let result = handle
            .join()
            .map_err(|_| Error::WorkerFailed(self.name.clone()))?;
        log::debug!("worker {} joined", self.name);
        result
    }
}

/// Lifecycle shared by every engine worker.
pub trait Worker: Send {
    fn name(&self) -> &str;

    /// Spawns the worker thread.
    ///
    /// # Errors
    /// Fails if the thread cannot be started.
    fn start(&mut self) -> Result<()>;

    /// Asks the worker to finish; returns immediately.
    fn stop(&self);

    /// Waits for the worker thread to exit.
    ///
    /// # Errors
    /// Returns the error the worker ended with.
    fn join(&mut self) -> Result<()>;

    fn is_alive(&self) -> bool;
}

/// Produces raw frames from the digitizer.
pub trait Acquisition: Worker {
    fn request(&self) -> &AcquisitionRequest;
    fn subscribe(&self) -> Receiver<FrameRef>;
}

/// Transforms raw frames (rolling average).
pub trait Processor: Worker {
    /// Range of values the processor emits.
    fn data_range(&self) -> DataRange;
    fn frames_averaged(&self) -> FrameAverage;
    fn set_frames_averaged(&self, frames: FrameAverage);
    fn subscribe(&self) -> Receiver<FrameRef>;
}

/// Maps processed frames to RGB for the viewer.
pub trait Display: Worker {
    /// One handle per enabled digitizer channel, in channel order.
    fn channels(&self) -> &[DisplayChannelHandle];
    fn gamma(&self) -> Gamma;
    fn set_gamma(&self, gamma: Gamma);
    fn subscribe_viewer(&self) -> Receiver<ViewerMessage>;
}

/// Writes frames to disk.
pub trait Logger: Worker {
    fn settings(&self) -> &LoggerSettings;
    fn frames_written(&self) -> u64;
}

/// A photodetector that can be switched on and off.
pub trait Detector: Send + Sync {
    fn index(&self) -> usize;
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

/// Static description of the instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareInfo {
    /// Enable flag of every digitizer channel present.
    pub channels: Vec<bool>,
    pub detector_count: usize,
    pub has_stage: bool,
    pub has_z_scanner: bool,
    pub fast_scanner_frequency: Frequency,
    pub data_range: DataRange,
}

impl HardwareInfo {
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn enabled_channel_count(&self) -> usize {
        self.channels.iter().filter(|e| **e).count()
    }
}

/// Backend that owns the hardware and builds workers.
pub trait Engine: Send + Sync {
    fn hardware(&self) -> HardwareInfo;

    fn detectors(&self) -> Vec<Arc<dyn Detector>>;

    fn stage(&self) -> Option<XyStage>;

    fn z_scanner(&self) -> Option<Arc<dyn LinearAxis>>;

    /// # Errors
    /// Fails if the request needs hardware the engine lacks.
    fn make_acquisition(&self, request: AcquisitionRequest) -> Result<Box<dyn Acquisition>>;

    /// # Errors
    /// Fails if the worker cannot be built.
    fn make_processor(&self, inbox: Receiver<FrameRef>) -> Result<Box<dyn Processor>>;

    /// # Errors
    /// Fails if the worker cannot be built.
    fn make_display(&self, inbox: Receiver<FrameRef>) -> Result<Box<dyn Display>>;

    /// # Errors
    /// Fails if the save directory cannot be prepared.
    fn make_logger(
        &self,
        inbox: Receiver<FrameRef>,
        settings: LoggerSettings,
    ) -> Result<Box<dyn Logger>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publisher_fans_out() {
        let publisher = Publisher::new(4);
        let a = publisher.subscribe();
        let b = publisher.subscribe();
        assert_eq!(publisher.publish(&7_u32), 2);
        assert_eq!(a.recv().unwrap(), 7);
        assert_eq!(b.recv().unwrap(), 7);
    }

    #[test]
    fn test_publisher_forgets_dropped_subscribers() {
        let publisher = Publisher::new(4);
        let keep = publisher.subscribe();
        drop(publisher.subscribe());
        assert_eq!(publisher.publish(&1_u8), 1);
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(keep.recv().unwrap(), 1);
    }

    #[test]
    fn test_publish_lossy_drops_when_full() {
        let publisher = Publisher::new(1);
        let rx = publisher.subscribe();
        assert_eq!(publisher.publish_lossy(&1_u8), 1);
        assert_eq!(publisher.publish_lossy(&2_u8), 0);
        assert_eq!(rx.recv().unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_close_disconnects() {
        let publisher: Publisher<u8> = Publisher::new(1);
        let rx = publisher.subscribe();
        publisher.close();
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_worker_thread_stop_and_join() {
        let mut worker = WorkerThread::new("spin");
        assert!(!worker.is_alive());
        worker
            .spawn(|signal| {
                while !signal.is_requested() {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            })
            .unwrap();
        assert!(worker.spawn(|_| Ok(())).is_err());
        worker.request_stop();
        worker.join().unwrap();
        assert!(!worker.is_alive());
        // Second join is a no-op.
        worker.join().unwrap();
    }

    #[test]
    fn test_worker_thread_propagates_error() {
        let mut worker = WorkerThread::new("fail");
        worker
            .spawn(|_| Err(Error::Engine("boom".into())))
            .unwrap();
        assert!(matches!(worker.join(), Err(Error::Engine(_))));
    }

    #[test]
    fn test_rgb_pixel_lookup() {
        let mut frame = RgbFrame::black(2, 2);
        frame.pixels[9..12].copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(frame.pixel(2, 0), None);
    }
}
