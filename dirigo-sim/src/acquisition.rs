//! Simulated digitizer: renders frames at the rate the timing model predicts.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dirigo_core::timing::frame_rate;
use dirigo_core::{
    Acquisition, AcquisitionRequest, FrameRef, LinearAxis, Publisher, StopSignal, Worker,
    WorkerThread,
};

use crate::hardware::SimHardware;
use crate::synth::Specimen;
use crate::worker::POLL;

/// Frame source for raster frame and raster stack requests.
pub struct SimAcquisition {
    request: AcquisitionRequest,
    hardware: Arc<SimHardware>,
    publisher: Arc<Publisher<FrameRef>>,
    thread: WorkerThread,
}

impl SimAcquisition {
    #[must_use]
    pub fn new(request: AcquisitionRequest, hardware: Arc<SimHardware>, capacity: usize) -> Self {
        Self {
            thread: WorkerThread::new(format!("acquisition-{}", request.kind_name())),
            request,
            hardware,
            publisher: Arc::new(Publisher::new(capacity)),
        }
    }
}

impl Worker for SimAcquisition {
    fn name(&self) -> &str {
        self.thread.name()
    }

    fn start(&mut self) -> dirigo_core::Result<()> {
        let request = self.request.clone();
        let hardware = Arc::clone(&self.hardware);
        let publisher = Arc::clone(&self.publisher);
        self.thread.spawn(move |signal| {
            let result = produce(&request, &hardware, &publisher, &signal);
            // Downstream workers finish once their inbox disconnects.
            publisher.close();
            result
        })
    }

    fn stop(&self) {
        self.thread.request_stop();
    }

    fn join(&mut self) -> dirigo_core::Result<()> {
        let result = self.thread.join();
        // Never started: release subscribers that are waiting on us.
        self.publisher.close();
        result
    }

    fn is_alive(&self) -> bool {
        self.thread.is_alive()
    }
}

impl Acquisition for SimAcquisition {
    fn request(&self) -> &AcquisitionRequest {
        &self.request
    }

    fn subscribe(&self) -> Receiver<FrameRef> {
        self.publisher.subscribe()
    }
}

fn produce(
    request: &AcquisitionRequest,
    hardware: &SimHardware,
    publisher: &Publisher<FrameRef>,
    signal: &StopSignal,
) -> dirigo_core::Result<()> {
    let config = &hardware.config;
    let spec = request.frame();
    let (width, height) = (spec.pixels_per_line(), spec.lines_per_frame());
    let enabled: Vec<usize> = config
        .channels
        .iter()
        .enumerate()
        .filter_map(|(i, on)| on.then_some(i))
        .collect();
    let specimen = Specimen::new(config.seed, enabled.len(), config.data_range);
    let period = frame_rate(spec, config.fast_scanner_frequency)
        .period()
        .to_duration();
    let buffers = request.buffers();
    log::info!(
        "acquiring {buffers} {width}x{height} frame(s), {} channel(s), {:.1} frames/s",
        enabled.len(),
        1.0 / period.as_secs_f64().max(f64::MIN_POSITIVE)
    );

    let mut index: u64 = 0;
    let mut deadline = Instant::now();
    while !signal.is_requested() && !buffers.is_complete(index) {
        let depth = match request {
            AcquisitionRequest::Stack(stack) => {
                let depth = stack.depth(u32::try_from(index).unwrap_or(u32::MAX));
                if let Some(z) = &hardware.z {
                    z.move_to(depth)?;
                }
                Some(depth)
            }
            AcquisitionRequest::Frame(_) => None,
        };
        let lit: Vec<bool> = enabled.iter().map(|&c| hardware.detector_on(c)).collect();
        let frame = Arc::new(specimen.render(index, width, height, depth, &lit));
        if publisher.publish(&frame) == 0 {
            log::trace!("frame {index} had no subscribers");
        }
        index += 1;

        if config.realtime {
            deadline += period;
            sleep_until(deadline, signal);
            // Fall behind rather than burst to catch up.
            deadline = deadline.max(Instant::now());
        }
    }
    log::info!("acquisition produced {index} frame(s)");
    Ok(())
}

fn sleep_until(deadline: Instant, signal: &StopSignal) {
    loop {
        let now = Instant::now();
        if now >= deadline || signal.is_requested() {
            return;
        }
        thread::sleep((deadline - now).min(POLL).max(Duration::from_micros(50)));
    }
}
