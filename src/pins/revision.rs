use std::path::Path;

use super::{BoardLayout, PinId, PinSet, PinSpec};

const V1_PINS: [PinSpec; PinSet::LEN] = [
    PinSpec::new(5),
    PinSpec::new(22),
    PinSpec::new(25),
    PinSpec::new(2),
    PinSpec::new(26),
    PinSpec::new(27),
    PinSpec::new(32),
    PinSpec::new(33),
    PinSpec::new(4),
    PinSpec::new(21),
    PinSpec::new(23),
    PinSpec::strapped(0),
    PinSpec::new(12),
    PinSpec::new(13),
    PinSpec::new(14),
    PinSpec::new(15),
];

const V2_PINS: [PinSpec; PinSet::LEN] = [
    PinSpec::new(5),
    PinSpec::new(22),
    PinSpec::new(20),
    PinSpec::strapped(0),
    PinSpec::new(32),
    PinSpec::new(26),
    PinSpec::new(14),
    PinSpec::new(13),
    PinSpec::new(4),
    PinSpec::new(21),
    PinSpec::new(19),
    PinSpec::new(2),
    PinSpec::new(33),
    PinSpec::new(27),
    PinSpec::new(12),
    PinSpec::new(15),
];

/// Hardware revision of the boards in the rig. Fixture and DUT are always the same revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    V1,
    V2,
}

impl Revision {
    /// Maps the chip name reported by the module to its board revision
    pub fn from_chip_name(name: &str) -> Option<Self> {
        match name.trim().trim_end_matches('\0') {
            "ESP32-PICO-V3-02" => Some(Revision::V2),
            "ESP32-D0WD" => Some(Revision::V1),
            _ => None,
        }
    }

    /// Reads the chip name from `path`. Boards that can't be identified are treated as the first
    /// revision.
    pub fn probe(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(name) => Self::from_chip_name(&name).unwrap_or_else(|| {
                log::warn!("Unknown chip {:?}, assuming revision 1", name.trim());
                Revision::V1
            }),
            Err(e) => {
                log::warn!("Could not read chip info from {}: {e}, assuming revision 1", path.display());
                Revision::V1
            }
        }
    }

    pub fn layout(self) -> BoardLayout {
        let (pins, uart_rx, uart_tx) = match self {
            Revision::V1 => (V1_PINS, 18, 19),
            Revision::V2 => (V2_PINS, 8, 7),
        };

        BoardLayout {
            // Distinctness of both tables is covered by the pin table tests
            pins: PinSet(pins),
            led: PinId(25),
            uart_rx: PinId(uart_rx),
            uart_tx: PinId(uart_tx),
        }
    }
}
