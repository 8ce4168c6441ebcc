// Helmet IMU - Streaming Control Loop
//
// `Streamer` is the one device context. It owns the sensor, the drain
// engine, the acquisition state, the framer, the notifier and the rear
// light; ISRs and BLE callbacks only reach it through `PendingSignals` and
// the radio event channel. One `poll` is one loop iteration:
//
//   radio events -> trigger -> FIFO ready / tick -> drain
//     -> Discard | frame + send | classify + send -> rear light

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use crate::acquisition::{AcquisitionController, BatchAction};
use crate::config::{AcquisitionMode, OutputPath, StreamConfig};
use crate::drivers::lsm6dsox::Lsm6dsox;
use crate::drivers::rear_light::RearLight;
use crate::events::{Batch, PendingSignals, RadioEvent};
use crate::fifo::{DrainEngine, PartialDrain};
use crate::framer::{Frame, Framer};
use crate::inference::{self, Motion};
use crate::input::TriggerDebouncer;
use crate::notifier::{Notifier, Radio, SendOutcome};

/// What one `poll` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// A debounced trigger armed a new burst.
    pub armed: bool,
    /// Slots read this cycle (including a partial batch).
    pub drained: usize,
    pub overrun: bool,
    pub drain_failed: bool,
    /// Set when a non-empty batch reached the controller gate.
    pub action: Option<BatchAction>,
    /// Frames handed to the notifier without error.
    pub frames: usize,
    /// Frames actually notified to a connected peer.
    pub delivered: usize,
    pub label: Option<Motion>,
}

pub struct Streamer<I2C, R, P> {
    imu: Lsm6dsox<I2C>,
    drain: DrainEngine,
    controller: AcquisitionController,
    debouncer: TriggerDebouncer,
    framer: Framer,
    notifier: Notifier<R>,
    light: RearLight<P>,
    signals: Arc<PendingSignals>,
    radio_events: Receiver<RadioEvent>,
    config: StreamConfig,
    sequence: u32,
    last_tick_ms: Option<u32>,
}

impl<I2C, R, P> Streamer<I2C, R, P>
where
    I2C: I2c,
    R: Radio,
    P: OutputPin,
{
    pub fn new(
        imu: Lsm6dsox<I2C>,
        notifier: Notifier<R>,
        light: RearLight<P>,
        signals: Arc<PendingSignals>,
        radio_events: Receiver<RadioEvent>,
        config: StreamConfig,
    ) -> Self {
        let capacity = imu.config().fifo_capacity();
        log::info!(
            "Streamer: {:?}, {:?}, transfer unit {} B",
            config.mode,
            config.output,
            config.layout.transfer_unit
        );
        Self {
            imu,
            drain: DrainEngine::new(capacity),
            controller: AcquisitionController::new(config.mode),
            debouncer: TriggerDebouncer::new(config.debounce_ms),
            framer: Framer::new(config.layout),
            notifier,
            light,
            signals,
            radio_events,
            config,
            sequence: 0,
            last_tick_ms: None,
        }
    }

    /// A burst is in progress.
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn controller(&self) -> &AcquisitionController {
        &self.controller
    }

    pub fn notifier(&self) -> &Notifier<R> {
        &self.notifier
    }

    pub fn overruns(&self) -> u32 {
        self.drain.overruns()
    }

    /// One control-loop iteration.
    pub fn poll(&mut self, now_ms: u32) -> CycleReport {
        let mut report = CycleReport::default();

        while let Ok(event) = self.radio_events.try_recv() {
            self.notifier.handle_event(event);
        }
        self.notifier.tick();

        if self.signals.take_trigger() && self.debouncer.accept(now_ms) {
            report.armed = self.controller.on_trigger();
            if report.armed {
                if let Err(e) = self.imu.flush_fifo() {
                    log::warn!("FIFO flush on arm failed: {}", e);
                }
            }
        }

        if self.drain_due(now_ms) {
            self.run_cycle(now_ms, &mut report);
        }

        self.light.update(now_ms);
        report
    }

    fn drain_due(&mut self, now_ms: u32) -> bool {
        let ready = self.signals.take_fifo_ready();
        match self.controller.mode() {
            AcquisitionMode::Burst { .. } => ready,
            AcquisitionMode::Continuous { tick_ms } => {
                let tick = self
                    .last_tick_ms
                    .map_or(true, |last| now_ms.wrapping_sub(last) >= tick_ms);
                if ready || tick {
                    self.last_tick_ms = Some(now_ms);
                }
                ready || tick
            }
        }
    }

    fn run_cycle(&mut self, now_ms: u32, report: &mut CycleReport) {
        let drained = match self.drain.drain(&mut self.imu) {
            Ok(drained) => drained,
            Err(PartialDrain { partial, .. }) => {
                // Only whole batches are streamed.
                log::debug!("Partial batch of {} slots discarded", partial.len());
                report.drained = partial.len();
                report.drain_failed = true;
                return;
            }
        };

        report.drained = drained.batch.len();
        report.overrun = drained.overrun;
        if drained.batch.is_empty() {
            return;
        }

        let action = self.controller.batch_action();
        report.action = Some(action);
        if action == BatchAction::Discard {
            log::trace!("Idle, {} slots discarded", drained.batch.len());
            return;
        }

        let sent = match self.config.output {
            OutputPath::RawFrames => self.send_frames(&drained.batch, report),
            OutputPath::Labels => self.send_label(&drained.batch, now_ms, report),
        };
        if sent {
            self.controller.on_batch_sent();
        }
    }

    fn send_frames(&mut self, batch: &Batch, report: &mut CycleReport) -> bool {
        let frames = match self.framer.frame_split(batch, self.sequence) {
            Ok(frames) => frames,
            Err(e) => {
                log::warn!("Batch of {} samples not framed: {}", batch.len(), e);
                return false;
            }
        };
        self.sequence = self.sequence.wrapping_add(frames.len() as u32);
        // Every frame gets its own attempt; a failed notify does not drop the rest.
        let mut all_sent = true;
        for frame in &frames {
            all_sent &= self.send(frame, report);
        }
        all_sent
    }

    fn send_label(&mut self, batch: &Batch, now_ms: u32, report: &mut CycleReport) -> bool {
        let features = match inference::extract_features(batch, self.imu.config()) {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Batch dropped: {}", e);
                return false;
            }
        };
        let Some(result) = inference::classify(&features) else {
            log::debug!("No label above confidence threshold");
            return false;
        };

        log::info!(
            "Classified {} ({:.0}%)",
            result.motion.as_str(),
            result.confidence * 100.0
        );
        report.label = Some(result.motion);
        if result.motion == Motion::Braking {
            self.light.pulse(now_ms, self.config.rear_light_ms);
        }
        self.send(&Frame::from(result.motion.as_str().as_bytes()), report)
    }

    fn send(&mut self, frame: &Frame, report: &mut CycleReport) -> bool {
        match self.notifier.send(frame) {
            Ok(outcome) => {
                report.frames += 1;
                if outcome == SendOutcome::Delivered {
                    report.delivered += 1;
                }
                true
            }
            // Already logged and counted by the notifier.
            Err(_) => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        self.imu.bus_mut()
    }

    #[cfg(test)]
    pub(crate) fn light(&self) -> &RearLight<P> {
        &self.light
    }
}
