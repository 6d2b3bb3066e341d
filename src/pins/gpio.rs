use std::collections::HashMap;

use anyhow::Context;
use rppal::gpio::{Bias, Gpio, IoPin, Mode};

use super::{Level, PinBank, PinId, Pull};

/// The board's GPIOs, accessed through rppal
pub struct GpioBank {
    pins: HashMap<PinId, IoPin>,
}

impl GpioBank {
    /// Claims every pin of `pins` as a floating input
    pub fn new(pins: impl IntoIterator<Item = PinId>) -> anyhow::Result<Self> {
        let gpio = Gpio::new().context("Could not open GPIO peripheral")?;
        let mut bank = HashMap::new();
        for id in pins {
            let mut pin = gpio
                .get(id.0)
                .with_context(|| format!("Could not claim {id}"))?
                .into_io(Mode::Input);
            pin.set_bias(Bias::Off);
            pin.set_reset_on_drop(true);
            bank.insert(id, pin);
        }

        Ok(Self { pins: bank })
    }

    fn pin(&mut self, id: PinId) -> anyhow::Result<&mut IoPin> {
        self.pins.get_mut(&id).with_context(|| format!("{id} is not managed by this bank"))
    }
}

const fn bias(pull: Pull) -> Bias {
    match pull {
        Pull::None => Bias::Off,
        Pull::Up => Bias::PullUp,
        Pull::Down => Bias::PullDown,
    }
}

impl PinBank for GpioBank {
    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()> {
        let pin = self.pin(pin)?;
        pin.set_mode(Mode::Input);
        pin.set_bias(bias(pull));
        Ok(())
    }

    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()> {
        let pin = self.pin(pin)?;
        pin.set_bias(Bias::Off);
        pin.write(match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        });
        pin.set_mode(Mode::Output);
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        let pin = self.pin(pin)?;
        Ok(Level::from(pin.read() == rppal::gpio::Level::High))
    }
}
