// Helmet IMU - Acquisition Controller
//
// Decides what happens to each drained batch.
//
//   Burst:      Idle --trigger--> Armed(N) --N sent batches--> Idle
//   Continuous: always Streaming
//
// Triggers while Armed are ignored, so a burst is never extended or
// restarted by contact bounce. There is no cancel path: a burst ends when
// its count is used up or the device resets.

use crate::config::AcquisitionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Armed { remaining: u32 },
    Streaming,
}

/// What the control loop should do with the next drained batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    /// Drain to keep the FIFO moving, then drop the data.
    Discard,
    /// Frame / classify and send.
    Stream,
}

pub struct AcquisitionController {
    mode: AcquisitionMode,
    state: AcquisitionState,
}

impl AcquisitionController {
    pub fn new(mode: AcquisitionMode) -> Self {
        let state = match mode {
            AcquisitionMode::Burst { .. } => AcquisitionState::Idle,
            AcquisitionMode::Continuous { .. } => AcquisitionState::Streaming,
        };
        Self { mode, state }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// A debounced trigger press. Returns `true` if it armed a new burst.
    pub fn on_trigger(&mut self) -> bool {
        match (self.mode, self.state) {
            (AcquisitionMode::Burst { batches }, AcquisitionState::Idle) if batches > 0 => {
                self.state = AcquisitionState::Armed { remaining: batches };
                log::info!("Trigger: recording {} IMU batches", batches);
                true
            }
            (_, state) => {
                log::debug!("Trigger ignored in {:?}", state);
                false
            }
        }
    }

    pub fn batch_action(&self) -> BatchAction {
        match self.state {
            AcquisitionState::Idle => BatchAction::Discard,
            AcquisitionState::Armed { .. } | AcquisitionState::Streaming => BatchAction::Stream,
        }
    }

    /// One batch was drained and handed to the notifier without error.
    pub fn on_batch_sent(&mut self) {
        if let AcquisitionState::Armed { remaining } = self.state {
            let left = remaining.saturating_sub(1);
            if let AcquisitionMode::Burst { batches } = self.mode {
                log::info!("Sent IMU batch {}/{}", batches - left, batches);
            }
            self.state = if left == 0 {
                log::info!("Burst complete");
                AcquisitionState::Idle
            } else {
                AcquisitionState::Armed { remaining: left }
            };
        }
    }

    /// A burst is in progress (power management must not sleep).
    pub fn is_busy(&self) -> bool {
        matches!(self.state, AcquisitionState::Armed { .. })
    }
}
