//! Pin identifiers, the per-revision pin tables and the hardware access seam

mod gpio;
pub use gpio::GpioBank;
mod memory;
pub use memory::MemoryBank;
mod revision;
pub use revision::Revision;

use std::fmt::Display;

/// A GPIO number as printed on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub u8);

impl Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GP{:02}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Level::Low),
            1 => Some(Level::High),
            _ => None,
        }
    }

    pub const fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

impl Pull {
    /// Level an input with this pull settles to when nothing else drives it
    pub const fn rest_level(self) -> Option<Level> {
        match self {
            Pull::None => None,
            Pull::Up => Some(Level::High),
            Pull::Down => Some(Level::Low),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinSpec {
    pub id: PinId,
    /// Strapped high in hardware. Such a pin can't be biased low and is not checked for shorts
    /// while the expected level is high.
    pub always_high: bool,
}

impl PinSpec {
    pub const fn new(id: u8) -> Self {
        Self { id: PinId(id), always_high: false }
    }

    pub const fn strapped(id: u8) -> Self {
        Self { id: PinId(id), always_high: true }
    }
}

/// The sixteen pins under test, in the order they are swept and printed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinSet([PinSpec; PinSet::LEN]);

impl PinSet {
    pub const LEN: usize = 16;

    pub fn new(pins: [PinSpec; Self::LEN]) -> Result<Self, PinSetError> {
        for (i, pin) in pins.iter().enumerate() {
            if pins[..i].iter().any(|p| p.id == pin.id) {
                return Err(PinSetError::Duplicate(pin.id));
            }
        }
        Ok(Self(pins))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PinSpec> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PinId> + '_ {
        self.0.iter().map(|p| p.id)
    }

    pub fn get(&self, id: PinId) -> Option<&PinSpec> {
        self.0.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PinId) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: PinId) -> Option<usize> {
        self.0.iter().position(|p| p.id == id)
    }

    pub fn as_slice(&self) -> &[PinSpec] {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PinSetError {
    #[error("{0} appears more than once")]
    Duplicate(PinId),
}

/// Everything the core needs to know about one hardware revision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    pub pins: PinSet,
    /// Data pin of the status pixel
    pub led: PinId,
    pub uart_rx: PinId,
    pub uart_tx: PinId,
}

impl BoardLayout {
    /// The pins under test plus the pixel pin, each once
    pub fn claimed_pins(&self) -> Vec<PinId> {
        let mut pins: Vec<PinId> = self.pins.ids().collect();
        if !pins.contains(&self.led) {
            pins.push(self.led);
        }
        pins
    }
}

/// Access to the board's GPIOs. Implementations must leave a pin in the requested mode until it
/// is reconfigured.
pub trait PinBank {
    /// Configure `pin` as an input without pull resistor
    fn float(&mut self, pin: PinId) -> anyhow::Result<()> {
        self.set_input(pin, Pull::None)
    }

    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()>;

    /// Configure `pin` as an output driving `level`
    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()>;

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level>;

    fn float_all(&mut self, pins: &PinSet) -> anyhow::Result<()> {
        for pin in pins.ids() {
            self.float(pin)?;
        }
        Ok(())
    }
}

impl<B: PinBank + ?Sized> PinBank for Box<B> {
    fn float(&mut self, pin: PinId) -> anyhow::Result<()> {
        (**self).float(pin)
    }

    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()> {
        (**self).set_input(pin, pull)
    }

    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()> {
        (**self).drive(pin, level)
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        (**self).read(pin)
    }
}
