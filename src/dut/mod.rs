//! The test script run on the device under test
//!
//! The DUT drives one pin at a time and asks the fixture to check it. It never learns the
//! verdict; the fixture keeps the tally and shows the outcome.

use std::{path::Path, time::Duration};

use anyhow::Context;

use crate::{
    communication::{
        rpc::{CallError, DeviceId, Link, Request},
        CommunicationHandle,
    },
    indicator::{Color, Indicator},
    pins::{BoardLayout, Level, PinBank, PinId},
};

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    /// The fixture did not answer `start`. Expected when the board runs on a bench.
    #[error("No fixture attached: {0}")]
    NoFixture(#[source] CallError),
    #[error("{request:?} failed: {source}")]
    Call {
        request: Request,
        #[source]
        source: CallError,
    },
    #[error("GPIO access failed: {0:?}")]
    Hardware(anyhow::Error),
}

impl From<anyhow::Error> for SequenceError {
    fn from(e: anyhow::Error) -> Self {
        SequenceError::Hardware(e)
    }
}

pub struct Sequencer<C: CommunicationHandle, B: PinBank, I: Indicator> {
    link: Link<C>,
    bank: B,
    layout: BoardLayout,
    indicator: I,
    device_id: DeviceId,
    /// Wait between driving a pin and asking for it to be checked
    settle: Duration,
    stop_timeout: Duration,
}

impl<C: CommunicationHandle, B: PinBank, I: Indicator> Sequencer<C, B, I> {
    pub const SETTLE_TIME: Duration = Duration::from_millis(10);
    pub const STOP_TIMEOUT: Duration = Duration::from_millis(3000);

    pub fn new(link: Link<C>, bank: B, layout: BoardLayout, indicator: I, device_id: DeviceId) -> Self {
        Self {
            link,
            bank,
            layout,
            indicator,
            device_id,
            settle: Self::SETTLE_TIME,
            stop_timeout: Self::STOP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Runs the complete test. Any failure after `start` aborts the rest of the script; the whole
    /// script may be run again afterwards.
    pub fn run(&mut self) -> Result<(), SequenceError> {
        self.link.call(&Request::Start).map_err(SequenceError::NoFixture)?;

        log::info!("Start test program");
        self.progress(Color::SWEEP_HIGH);
        self.call(Request::Mac(self.device_id))?;

        let result = self.sweeps();
        let floated = self.bank.float_all(&self.layout.pins);
        if let (Err(e), Err(cause)) = (&floated, &result) {
            log::error!("Could not release pins after {cause}: {e:?}");
        }
        result?;
        floated?;

        self.progress(Color::STOPPING);
        self.bank.float(self.layout.led)?;
        self.call_with_timeout(Request::Stop, self.stop_timeout)?;
        self.progress(Color::OFF);
        Ok(())
    }

    /// All pins high, then all pins low
    fn sweeps(&mut self) -> Result<(), SequenceError> {
        self.sweep(Level::High)?;
        self.progress(Color::SWEEP_LOW);
        self.sweep(Level::Low)
    }

    fn sweep(&mut self, level: Level) -> Result<(), SequenceError> {
        let pins: Vec<PinId> = self.layout.pins.ids().collect();
        for pin in pins {
            self.bank.float_all(&self.layout.pins)?;
            self.bank.drive(pin, level)?;
            std::thread::sleep(self.settle);
            self.call(Request::TestPin { pin, level })?;
        }
        Ok(())
    }

    fn call(&mut self, request: Request) -> Result<(), SequenceError> {
        self.link.call(&request).map_err(|source| SequenceError::Call { request, source })
    }

    fn call_with_timeout(&mut self, request: Request, timeout: Duration) -> Result<(), SequenceError> {
        self.link
            .call_with_timeout(&request, timeout)
            .map_err(|source| SequenceError::Call { request, source })
    }

    /// The DUT's own pixel only shows progress, a failing pixel does not stop the test
    fn progress(&mut self, color: Color) {
        if let Err(e) = self.indicator.display(color) {
            log::warn!("Could not update status pixel: {e:?}");
        }
    }

    pub fn link(&self) -> &Link<C> {
        &self.link
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}

/// Reads a MAC address like `24:0a:c4:00:fe:01` from `path`
pub fn read_device_id(path: impl AsRef<Path>) -> anyhow::Result<DeviceId> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read device id from {}", path.display()))?;
    parse_mac(text.trim())
}

fn parse_mac(text: &str) -> anyhow::Result<DeviceId> {
    let mut id = [0; 6];
    let mut parts = text.split(':');
    for byte in id.iter_mut() {
        let part = parts.next().with_context(|| format!("{text:?} is too short for a MAC"))?;
        *byte = u8::from_str_radix(part, 16)
            .with_context(|| format!("{part:?} in {text:?} is not a hex byte"))?;
    }
    anyhow::ensure!(parts.next().is_none(), "{text:?} is too long for a MAC");

    Ok(DeviceId::from_unique_id(id))
}
