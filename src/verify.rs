//! Continuity and short detection for a single driven pin
//!
//! All pins are biased with the pull resistor *opposite* to the level the DUT is driving. The
//! driven pin overrides its own pull if it is connected, every other pin settles to the pull's
//! rest level unless it is shorted to the driven trace, in which case it reads the driven level.

use std::fmt::Write;

use crate::pins::{Level, PinBank, PinId, PinSet, Pull};

/// Classification of one pin after sampling
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum PinVerdict {
    /// Driven pin reads the expected level
    #[strum(serialize = "V")]
    Driven,
    /// Driven pin does not read the expected level: open circuit or bad joint
    #[strum(serialize = "X")]
    Open,
    /// Undriven pin sits at the pull rest level
    #[strum(serialize = ".")]
    Floating,
    /// Undriven pin follows the driven pin
    #[strum(serialize = "S")]
    Shorted,
    /// Strapped pin that can't be checked at this level
    #[strum(serialize = "1")]
    Exempt,
}

impl PinVerdict {
    pub const fn is_error(self) -> bool {
        matches!(self, PinVerdict::Open | PinVerdict::Shorted)
    }
}

/// Observed level of every pin, in pin set order
pub type SampleVector = [Level; PinSet::LEN];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub symbols: [PinVerdict; PinSet::LEN],
    pub errors: u32,
}

impl Verdict {
    pub fn is_open(&self) -> bool {
        self.symbols.contains(&PinVerdict::Open)
    }

    pub fn shorts(&self) -> usize {
        self.symbols.iter().filter(|s| **s == PinVerdict::Shorted).count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{0} is not part of the pin set")]
    UnknownPin(PinId),
    #[error("GPIO access failed: {0:?}")]
    Hardware(#[from] anyhow::Error),
}

/// Pull resistor that biases undriven pins away from `expected`
pub const fn pull_for(expected: Level) -> Pull {
    match expected {
        Level::High => Pull::Down,
        Level::Low => Pull::Up,
    }
}

/// Applies `pull` to every pin, then reads each pin once
pub fn sample(bank: &mut impl PinBank, pins: &PinSet, pull: Pull) -> anyhow::Result<SampleVector> {
    for pin in pins.ids() {
        bank.set_input(pin, pull)?;
    }

    let mut samples = [Level::Low; PinSet::LEN];
    for (sample, pin) in samples.iter_mut().zip(pins.ids()) {
        *sample = bank.read(pin)?;
    }
    Ok(samples)
}

/// Compares `samples` against what a correctly soldered board shows while `driven` is at
/// `expected`. Rejects a `driven` pin outside `pins` on its own, [`verify`] checks it earlier
/// so that no pin is touched for it.
pub fn classify(
    pins: &PinSet,
    driven: PinId,
    expected: Level,
    samples: &SampleVector,
) -> Result<Verdict, VerifyError> {
    if !pins.contains(driven) {
        return Err(VerifyError::UnknownPin(driven));
    }

    let rest = expected.opposite();
    let mut symbols = [PinVerdict::Floating; PinSet::LEN];
    for ((symbol, pin), sample) in symbols.iter_mut().zip(pins.iter()).zip(samples) {
        *symbol = if pin.id == driven {
            if *sample == expected {
                PinVerdict::Driven
            } else {
                PinVerdict::Open
            }
        } else if pin.always_high && expected == Level::High {
            PinVerdict::Exempt
        } else if *sample == rest {
            PinVerdict::Floating
        } else {
            PinVerdict::Shorted
        };
    }

    let errors = symbols.iter().filter(|s| s.is_error()).count() as u32;
    Ok(Verdict { symbols, errors })
}

/// Checks `driven` at `expected` on the live pins and logs a diagnostic for any mismatch. The
/// pins are left floating afterwards.
pub fn verify(
    bank: &mut impl PinBank,
    pins: &PinSet,
    driven: PinId,
    expected: Level,
) -> Result<Verdict, VerifyError> {
    if !pins.contains(driven) {
        return Err(VerifyError::UnknownPin(driven));
    }

    let samples = sample(bank, pins, pull_for(expected));
    let floated = bank.float_all(pins);
    let samples = samples?;
    floated?;

    let verdict = classify(pins, driven, expected, &samples)?;
    if verdict.errors > 0 {
        report(pins, driven, expected, &verdict);
    }
    Ok(verdict)
}

fn report(pins: &PinSet, driven: PinId, expected: Level, verdict: &Verdict) {
    log::warn!("Error when setting pin {driven} {expected}");
    if verdict.shorts() > 0 {
        log::warn!(
            "One or more pins are short circuited (S=short, .=ok, X=not connected, V=ok, 1=always high)"
        );
    }
    for line in grid(pins, &verdict.symbols) {
        log::warn!("{line}");
    }
}

/// Renders the verdicts as two rows of eight, each pin label above its symbol
pub fn grid(pins: &PinSet, symbols: &[PinVerdict; PinSet::LEN]) -> Vec<String> {
    let mut lines = vec!["-".repeat(40)];
    for (specs, symbols) in pins.as_slice().chunks(8).zip(symbols.chunks(8)) {
        let mut labels = String::new();
        let mut cells = String::new();
        for (spec, symbol) in specs.iter().zip(symbols) {
            let _ = write!(labels, "{} ", spec.id);
            let _ = write!(cells, " [{symbol}] ");
        }
        lines.push(labels);
        lines.push(cells);
    }
    lines
}
