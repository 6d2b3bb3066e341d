//! The single RGB status pixel both boards carry

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::new(0, 0, 0);
    /// Fixture waiting for a DUT
    pub const IDLE: Color = Color::new(50, 50, 0);
    pub const FAIL: Color = Color::new(100, 0, 0);
    pub const PASS: Color = Color::new(0, 100, 0);

    /// DUT driving its pins high
    pub const SWEEP_HIGH: Color = Color::new(20, 0, 0);
    /// DUT driving its pins low
    pub const SWEEP_LOW: Color = Color::new(0, 20, 0);
    /// DUT waiting for the fixture to report
    pub const STOPPING: Color = Color::new(0, 0, 20);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub trait Indicator {
    /// Stage a color, shown on the next call to [`Indicator::show`]
    fn set(&mut self, color: Color);

    fn show(&mut self) -> anyhow::Result<()>;

    fn display(&mut self, color: Color) -> anyhow::Result<()> {
        self.set(color);
        self.show()
    }
}

impl<I: Indicator + ?Sized> Indicator for Box<I> {
    fn set(&mut self, color: Color) {
        (**self).set(color)
    }

    fn show(&mut self) -> anyhow::Result<()> {
        (**self).show()
    }
}

/// Cadence of the pass/fail signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorTiming {
    pub blink_on_ms: u64,
    pub blink_off_ms: u64,
    pub blink_count: u32,
    pub pass_hold_ms: u64,
}

impl Default for IndicatorTiming {
    fn default() -> Self {
        Self { blink_on_ms: 200, blink_off_ms: 200, blink_count: 5, pass_hold_ms: 1000 }
    }
}

impl IndicatorTiming {
    /// No waiting at all, for tests
    pub const IMMEDIATE: Self =
        Self { blink_on_ms: 0, blink_off_ms: 0, blink_count: 5, pass_hold_ms: 0 };

    pub fn blink_on(&self) -> Duration {
        Duration::from_millis(self.blink_on_ms)
    }

    pub fn blink_off(&self) -> Duration {
        Duration::from_millis(self.blink_off_ms)
    }

    pub fn pass_hold(&self) -> Duration {
        Duration::from_millis(self.pass_hold_ms)
    }
}

/// A WS2812 pixel on the SPI MOSI line. Every data bit becomes three SPI bits at 2.4 MHz, which
/// matches the pixel's 1.25 µs bit period.
pub struct NeoPixel {
    spi: Spi,
    color: Color,
}

impl NeoPixel {
    const CLOCK_SPEED: u32 = 2_400_000;
    /// Low time after the data that latches it, > 50 µs
    const RESET_BYTES: usize = 16;

    pub fn new(bus: u8) -> anyhow::Result<Self> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            b => anyhow::bail!("SPI bus {b} is not supported"),
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, Self::CLOCK_SPEED, Mode::Mode0)
            .context("Could not open SPI for the status pixel")?;
        Ok(Self { spi, color: Color::OFF })
    }

    /// Pixel wire format: green, red, blue, most significant bit first
    pub fn encode(color: Color) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + Self::RESET_BYTES);
        for byte in [color.g, color.r, color.b] {
            let mut bits: u32 = 0;
            for i in (0..8).rev() {
                bits = (bits << 3) | if byte & (1 << i) != 0 { 0b110 } else { 0b100 };
            }
            out.extend(&bits.to_be_bytes()[1..]);
        }
        out.extend([0; Self::RESET_BYTES]);
        out
    }
}

impl Indicator for NeoPixel {
    fn set(&mut self, color: Color) {
        self.color = color;
    }

    fn show(&mut self) -> anyhow::Result<()> {
        self.spi.write(&Self::encode(self.color)).context("Could not update status pixel")?;
        Ok(())
    }
}

/// Writes the shown color to a file. Stands in for the pixel on a development machine.
pub struct FileIndicator {
    path: PathBuf,
    color: Color,
}

impl FileIndicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), color: Color::OFF }
    }
}

impl Indicator for FileIndicator {
    fn set(&mut self, color: Color) {
        self.color = color;
    }

    fn show(&mut self) -> anyhow::Result<()> {
        let Color { r, g, b } = self.color;
        std::fs::write(&self.path, format!("{r},{g},{b}\n"))
            .with_context(|| format!("Could not write {}", self.path.display()))
    }
}
