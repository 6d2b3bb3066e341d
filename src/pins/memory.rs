use std::collections::HashMap;

use super::{Level, PinBank, PinId, Pull};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Input(Pull),
    Output(Level),
}

/// A bank without hardware behind it. Outputs read back what they drive, inputs read their pull
/// rest level and floating inputs read low.
///
/// Used for bench runs on a development machine.
pub struct MemoryBank {
    modes: HashMap<PinId, Mode>,
}

impl MemoryBank {
    pub fn new(pins: impl IntoIterator<Item = PinId>) -> Self {
        Self { modes: pins.into_iter().map(|id| (id, Mode::Input(Pull::None))).collect() }
    }

    /// Whether `pin` currently drives a level
    pub fn is_output(&self, pin: PinId) -> bool {
        matches!(self.modes.get(&pin), Some(Mode::Output(_)))
    }

    fn mode(&mut self, pin: PinId) -> anyhow::Result<&mut Mode> {
        self.modes.get_mut(&pin).ok_or_else(|| anyhow::anyhow!("{pin} is not managed by this bank"))
    }
}

impl PinBank for MemoryBank {
    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()> {
        *self.mode(pin)? = Mode::Input(pull);
        Ok(())
    }

    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()> {
        *self.mode(pin)? = Mode::Output(level);
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        Ok(match *self.mode(pin)? {
            Mode::Input(pull) => pull.rest_level().unwrap_or(Level::Low),
            Mode::Output(level) => level,
        })
    }
}
