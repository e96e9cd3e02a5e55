//! Rolling-average processor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use dirigo_core::{
    DataRange, FrameAverage, FrameRef, Processor, Publisher, RawFrame, Worker, WorkerThread,
};

use crate::worker::consume;

/// Running mean over the last `n` frames, per channel and pixel.
#[derive(Debug, Default)]
pub struct RollingAverage {
    frames: VecDeque<FrameRef>,
    sums: Vec<Vec<u32>>,
}

impl RollingAverage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(&self, frame: &RawFrame) -> bool {
        self.frames.front().is_some_and(|f| {
            f.width == frame.width
                && f.height == frame.height
                && f.channel_count() == frame.channel_count()
        })
    }

    fn add(&mut self, frame: &RawFrame) {
        for (sum, plane) in self.sums.iter_mut().zip(&frame.channels) {
            for (s, v) in sum.iter_mut().zip(plane) {
                *s += u32::from(*v);
            }
        }
    }

    fn remove_oldest(&mut self) {
        if let Some(old) = self.frames.pop_front() {
            for (sum, plane) in self.sums.iter_mut().zip(&old.channels) {
                for (s, v) in sum.iter_mut().zip(plane) {
                    *s -= u32::from(*v);
                }
            }
        }
    }

    /// Adds `frame` and returns the mean of the newest `window` frames.
    ///
    /// A frame with a different geometry restarts the average.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, frame: FrameRef, window: FrameAverage) -> RawFrame {
        if !self.matches(&frame) {
            self.frames.clear();
            self.sums = vec![vec![0; frame.pixel_count()]; frame.channel_count()];
        }
        self.add(&frame);
        self.frames.push_back(Arc::clone(&frame));
        while self.frames.len() > window.get() as usize {
            self.remove_oldest();
        }

        let n = u32::try_from(self.frames.len()).unwrap_or(u32::MAX).max(1);
        let channels = self
            .sums
            .iter()
            .map(|sum| sum.iter().map(|s| (s / n) as u16).collect())
            .collect();
        RawFrame {
            index: frame.index,
            width: frame.width,
            height: frame.height,
            channels,
            depth: frame.depth,
        }
    }
}

/// Processor worker wrapping a [`RollingAverage`].
pub struct RollingAverageProcessor {
    inbox: Option<Receiver<FrameRef>>,
    range: DataRange,
    window: Arc<AtomicU32>,
    publisher: Arc<Publisher<FrameRef>>,
    thread: WorkerThread,
}

impl RollingAverageProcessor {
    #[must_use]
    pub fn new(inbox: Receiver<FrameRef>, range: DataRange, capacity: usize) -> Self {
        Self {
            inbox: Some(inbox),
            range,
            window: Arc::new(AtomicU32::new(FrameAverage::default().get())),
            publisher: Arc::new(Publisher::new(capacity)),
            thread: WorkerThread::new("processor-rolling-average"),
        }
    }
}

impl Worker for RollingAverageProcessor {
    fn name(&self) -> &str {
        self.thread.name()
    }

    fn start(&mut self) -> dirigo_core::Result<()> {
        let inbox = self
            .inbox
            .take()
            .ok_or_else(|| dirigo_core::Error::Engine("processor already started".into()))?;
        let window = Arc::clone(&self.window);
        let publisher = Arc::clone(&self.publisher);
        self.thread.spawn(move |signal| {
            let mut average = RollingAverage::new();
            let handled = consume(&inbox, &signal, |frame| {
                let n = FrameAverage::new(window.load(Ordering::Relaxed)).unwrap_or_default();
                let out = Arc::new(average.push(frame, n));
                publisher.publish(&out);
                Ok(())
            });
            publisher.close();
            log::debug!("processor handled {} frame(s)", handled?);
            Ok(())
        })
    }

    fn stop(&self) {
        self.thread.request_stop();
    }

    fn join(&mut self) -> dirigo_core::Result<()> {
        let result = self.thread.join();
        self.publisher.close();
        result
    }

    fn is_alive(&self) -> bool {
        self.thread.is_alive()
    }
}

impl Processor for RollingAverageProcessor {
    fn data_range(&self) -> DataRange {
        self.range
    }

    fn frames_averaged(&self) -> FrameAverage {
        FrameAverage::new(self.window.load(Ordering::Relaxed)).unwrap_or_default()
    }

    fn set_frames_averaged(&self, frames: FrameAverage) {
        log::debug!("averaging {frames} frame(s)");
        self.window.store(frames.get(), Ordering::Relaxed);
    }

    fn subscribe(&self) -> Receiver<FrameRef> {
        self.publisher.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64, value: u16) -> FrameRef {
        let mut frame = RawFrame::zeroed(index, 2, 1, 1);
        frame.channels[0] = vec![value, value * 2];
        Arc::new(frame)
    }

    #[test]
    fn test_single_frame_passes_through() {
        let mut average = RollingAverage::new();
        let out = average.push(frame(0, 10), FrameAverage::default());
        assert_eq!(out.channels[0], vec![10, 20]);
    }

    #[test]
    fn test_window_slides() {
        let mut average = RollingAverage::new();
        let n = FrameAverage::new(2).unwrap();
        let _ = average.push(frame(0, 10), n);
        let out = average.push(frame(1, 20), n);
        assert_eq!(out.channels[0], vec![15, 30]);
        let out = average.push(frame(2, 40), n);
        assert_eq!(out.channels[0], vec![30, 60]);
        assert_eq!(out.index, 2);
    }

    #[test]
    fn test_shrinking_window() {
        let mut average = RollingAverage::new();
        let _ = average.push(frame(0, 10), FrameAverage::new(3).unwrap());
        let _ = average.push(frame(1, 20), FrameAverage::new(3).unwrap());
        let out = average.push(frame(2, 30), FrameAverage::default());
        assert_eq!(out.channels[0], vec![30, 60]);
    }

    #[test]
    fn test_geometry_change_restarts() {
        let mut average = RollingAverage::new();
        let n = FrameAverage::new(4).unwrap();
        let _ = average.push(frame(0, 10), n);
        let big = Arc::new(RawFrame::zeroed(1, 3, 3, 1));
        let out = average.push(big, n);
        assert_eq!(out.channels[0], vec![0; 9]);
    }
}
