// Helmet IMU - NimBLE Radio
//
// GATT server with one service and one READ | NOTIFY characteristic.
// Connect / disconnect callbacks run on the NimBLE host task; they only
// post a `RadioEvent` and the main loop applies it to the `Notifier`.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::{uuid128, BLECharacteristic, BLEDevice, NimbleProperties};

use crate::config::{BLE_CHAR_UUID, BLE_DEVICE_NAME, BLE_PREFERRED_MTU, BLE_SERVICE_UUID};
use crate::error::RadioError;
use crate::events::RadioEvent;
use crate::notifier::Radio;

/// Advertising interval unit (0.625 ms) expressed in microseconds.
const ADV_INTERVAL_UNIT_US: u32 = 625;

pub struct NimbleRadio {
    device: &'static BLEDevice,
    characteristic: Arc<Mutex<BLECharacteristic>>,
}

impl NimbleRadio {
    /// Bring up the NimBLE host, register the GATT service and route
    /// connection events into `events`. Advertising is left to the notifier.
    pub fn init(events: Sender<RadioEvent>) -> anyhow::Result<Self> {
        let device = BLEDevice::take();
        BLEDevice::set_device_name(BLE_DEVICE_NAME)
            .map_err(|e| anyhow::anyhow!("set device name: {:?}", e))?;
        device
            .set_preferred_mtu(BLE_PREFERRED_MTU)
            .map_err(|e| anyhow::anyhow!("set preferred MTU: {:?}", e))?;

        let server = device.get_server();
        // The notifier re-advertises so it always knows the connection state.
        server.advertise_on_disconnect(false);

        let connect_tx = events.clone();
        server.on_connect(move |_server, desc| {
            let _ = connect_tx.send(RadioEvent::Connected {
                conn_handle: desc.conn_handle(),
            });
        });
        server.on_disconnect(move |_desc, _reason| {
            let _ = events.send(RadioEvent::Disconnected);
        });

        let service = server.create_service(uuid128!(BLE_SERVICE_UUID));
        let characteristic = service.lock().create_characteristic(
            uuid128!(BLE_CHAR_UUID),
            NimbleProperties::READ | NimbleProperties::NOTIFY,
        );

        log::info!("BLE GATT server ready ({})", BLE_DEVICE_NAME);
        Ok(Self {
            device,
            characteristic,
        })
    }
}

impl Radio for NimbleRadio {
    fn advertise(&mut self, payload: &[u8], interval_ms: u32) -> Result<(), RadioError> {
        let units = (interval_ms * 1000 / ADV_INTERVAL_UNIT_US) as u16;
        let mut advertising = self.device.get_advertising().lock();
        advertising
            .scan_response(false)
            .min_interval(units)
            .max_interval(units);
        advertising
            .set_raw_data(payload)
            .map_err(|e| RadioError::Advertise(format!("{:?}", e)))?;
        advertising
            .start()
            .map_err(|e| RadioError::Advertise(format!("{:?}", e)))?;
        log::info!("Advertising every {} ms", interval_ms);
        Ok(())
    }

    fn notify(&mut self, value: &[u8]) -> Result<(), RadioError> {
        self.characteristic.lock().set_value(value).notify();
        Ok(())
    }
}
