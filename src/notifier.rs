// Helmet IMU - Wireless Notifier
//
// Owns the BLE connection state and the notify characteristic.
//
//   Advertising --connect--> Connected --disconnect--> Advertising
//
// Re-advertising on disconnect is automatic. `send` never blocks and never
// fails for lack of a peer: with nobody connected it drops the frame and
// counts it. Notifications are unacknowledged, so a frame the peer misses
// is gone.

use crate::config::{BLE_ADV_INTERVAL_MS, BLE_ADV_MAX_LEN};
use crate::error::RadioError;
use crate::events::RadioEvent;
use crate::framer::Frame;

/// The slice of the BLE stack the notifier drives.
pub trait Radio {
    /// Start (or restart) advertising with a raw AD payload.
    fn advertise(&mut self, payload: &[u8], interval_ms: u32) -> Result<(), RadioError>;
    /// Set the characteristic value and push a notification.
    fn notify(&mut self, value: &[u8]) -> Result<(), RadioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Advertising,
    Connected { conn_handle: u16 },
    /// Peer gone and re-advertising failed; retried by [`Notifier::tick`].
    Disconnected,
}

/// Outcome of a send that did not hit a radio error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Nobody connected; nothing was transmitted.
    NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendStats {
    pub sent: u32,
    pub dropped_disconnected: u32,
    pub failed: u32,
}

/// Flags (LE General Discoverable, BR/EDR not supported) followed by the
/// complete local name.
pub fn advertisement_payload(name: &str) -> Result<Vec<u8>, RadioError> {
    let name = name.as_bytes();
    let size = 3 + 2 + name.len();
    if size > BLE_ADV_MAX_LEN {
        return Err(RadioError::AdvertisementTooLong {
            size,
            limit: BLE_ADV_MAX_LEN,
        });
    }
    let mut adv = Vec::with_capacity(size);
    adv.extend_from_slice(&[0x02, 0x01, 0x06]);
    adv.extend_from_slice(&[name.len() as u8 + 1, 0x09]);
    adv.extend_from_slice(name);
    Ok(adv)
}

pub struct Notifier<R> {
    radio: R,
    state: ConnectionState,
    adv_payload: Vec<u8>,
    stats: SendStats,
}

impl<R: Radio> Notifier<R> {
    /// Build the advertisement and start advertising.
    pub fn start(radio: R, device_name: &str) -> Result<Self, RadioError> {
        let mut notifier = Self {
            radio,
            state: ConnectionState::Disconnected,
            adv_payload: advertisement_payload(device_name)?,
            stats: SendStats::default(),
        };
        notifier.readvertise()?;
        Ok(notifier)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> SendStats {
        self.stats
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    #[cfg(test)]
    pub(crate) fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    fn readvertise(&mut self) -> Result<(), RadioError> {
        self.radio.advertise(&self.adv_payload, BLE_ADV_INTERVAL_MS)?;
        self.state = ConnectionState::Advertising;
        Ok(())
    }

    /// Apply a connection event from the radio stack.
    pub fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::Connected { conn_handle } => {
                log::info!("Connected (handle {})", conn_handle);
                self.state = ConnectionState::Connected { conn_handle };
            }
            RadioEvent::Disconnected => {
                log::info!("Disconnected, re-advertising");
                self.state = ConnectionState::Disconnected;
                if let Err(e) = self.readvertise() {
                    log::error!("Re-advertise failed: {}", e);
                }
            }
        }
    }

    /// Retry advertising after a failed restart. Called once per loop iteration.
    pub fn tick(&mut self) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        match self.readvertise() {
            Ok(()) => log::info!("Advertising restored"),
            Err(e) => log::debug!("Re-advertise retry failed: {}", e),
        }
    }

    /// Notify the connected peer, or drop the frame if there is none.
    pub fn send(&mut self, frame: &Frame) -> Result<SendOutcome, RadioError> {
        match self.state {
            ConnectionState::Connected { .. } => match self.radio.notify(frame.as_bytes()) {
                Ok(()) => {
                    self.stats.sent = self.stats.sent.wrapping_add(1);
                    log::debug!("Sent {} bytes", frame.len());
                    Ok(SendOutcome::Delivered)
                }
                Err(e) => {
                    self.stats.failed = self.stats.failed.wrapping_add(1);
                    log::warn!("Notify failed ({} so far): {}", self.stats.failed, e);
                    Err(e)
                }
            },
            ConnectionState::Advertising | ConnectionState::Disconnected => {
                self.stats.dropped_disconnected = self.stats.dropped_disconnected.wrapping_add(1);
                log::debug!("No device connected, frame dropped");
                Ok(SendOutcome::NotConnected)
            }
        }
    }
}
