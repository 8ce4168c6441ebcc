// Helmet IMU - Data Types & Events

use std::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::registers::tags;

// ---------------------------------------------------------------------------
// FIFO slot contents
// ---------------------------------------------------------------------------

/// Which sensor produced a FIFO slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTag {
    Gyro,
    Accel,
    Timestamp,
}

impl SampleTag {
    pub fn from_raw(tag: u8) -> Option<Self> {
        match tag {
            tags::GYRO_NC => Some(Self::Gyro),
            tags::ACCEL_NC => Some(Self::Accel),
            tags::TIMESTAMP => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// One decoded FIFO slot: raw two's-complement axis values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tag: SampleTag,
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Samples drained in one FIFO read cycle, in arrival order.
///
/// Built only by the drain engine; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    samples: Vec<Sample>,
}

impl Batch {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self { samples: Vec::with_capacity(n) }
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter_tagged(&self, tag: SampleTag) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(move |s| s.tag == tag)
    }
}

impl From<Vec<Sample>> for Batch {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

// ---------------------------------------------------------------------------
// FIFO status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FifoStatus {
    /// Unread slots (10-bit DIFF_FIFO).
    pub level: u16,
    /// FIFO full; the device has dropped data.
    pub overrun: bool,
    /// Level reached the configured watermark.
    pub watermark: bool,
}

// ---------------------------------------------------------------------------
// Radio events (posted by the BLE stack, applied by the main loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    Connected { conn_handle: u16 },
    Disconnected,
}

// ---------------------------------------------------------------------------
// Pending signals (set from GPIO ISRs)
// ---------------------------------------------------------------------------

/// Flags raised by interrupt callbacks and consumed by the main loop.
/// Handlers only store; all register I/O happens in the loop.
#[derive(Debug, Default)]
pub struct PendingSignals {
    fifo_ready: AtomicBool,
    trigger: AtomicBool,
}

impl PendingSignals {
    pub fn raise_fifo_ready(&self) {
        self.fifo_ready.store(true, Ordering::Release);
    }

    pub fn raise_trigger(&self) {
        self.trigger.store(true, Ordering::Release);
    }

    pub fn take_fifo_ready(&self) -> bool {
        self.fifo_ready.swap(false, Ordering::AcqRel)
    }

    pub fn take_trigger(&self) -> bool {
        self.trigger.swap(false, Ordering::AcqRel)
    }
}
