use std::{
    collections::{HashMap, VecDeque},
    fmt::Debug,
    io::{Read, Write},
    sync::{Arc, Mutex},
    time::Duration,
};

use gpio_test_jig::{
    communication::{
        rpc::{DeviceId, Request, Status},
        ComResult, CommunicationError, CommunicationHandle, Frame,
    },
    indicator::{Color, Indicator},
    pins::{BoardLayout, Level, PinBank, PinId, Pull},
};

pub enum ComEvent {
    /// The DUT sends the given frame
    DUT(Frame),
    /// The fixture sends the given frame
    FIXTURE(Frame),
    /// Makes the thread sleep for the given duration
    SLEEP(Duration),
    /// The next receive runs into its timeout
    TIMEOUT,
}

impl Debug for ComEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DUT(arg0) => f.debug_tuple("DUT").field(arg0).finish(),
            Self::FIXTURE(arg0) => f.debug_tuple("FIXTURE").field(arg0).finish(),
            Self::SLEEP(arg0) => f.debug_tuple("SLEEP").field(arg0).finish(),
            Self::TIMEOUT => write!(f, "TIMEOUT"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Fixture,
    Dut,
}

/// Plays one side of the link. Every send and receive is checked against the expected events,
/// frames of the other side are handed out as received.
pub struct TestCom {
    side: Side,
    expected_events: VecDeque<ComEvent>,
}

impl TestCom {
    pub fn new(side: Side, events: Vec<ComEvent>) -> Self {
        TestCom { side, expected_events: events.into() }
    }

    pub fn is_complete(&self) -> bool {
        self.expected_events.is_empty()
    }

    fn next_event(&mut self) -> ComEvent {
        match self.expected_events.pop_front() {
            Some(ComEvent::SLEEP(d)) => {
                std::thread::sleep(d);
                self.next_event()
            }
            Some(event) => event,
            None => panic!("{:?} went on after the last expected event", self.side),
        }
    }
}

impl CommunicationHandle for TestCom {
    const INTEGRITY_ACK_TIMEOUT: Duration = Duration::MAX;

    fn set_timeout(&mut self, _timeout: &Duration) {}

    fn send_packet(&mut self, frame: &Frame) -> ComResult<()> {
        println!("{:?} sent {frame:?}", self.side);
        match (self.side, self.next_event()) {
            (Side::Fixture, ComEvent::FIXTURE(f)) | (Side::Dut, ComEvent::DUT(f)) => {
                assert_eq!(&f, frame)
            }
            (_, event) => panic!("Expected {event:?} instead of send_packet({frame:?})"),
        }

        if matches!(frame, Frame::Data(_)) {
            self.await_ack(&Self::INTEGRITY_ACK_TIMEOUT)?;
        }
        Ok(())
    }

    fn receive_packet(&mut self) -> ComResult<Frame> {
        let frame = match (self.side, self.next_event()) {
            (Side::Fixture, ComEvent::DUT(f)) | (Side::Dut, ComEvent::FIXTURE(f)) => f,
            (_, ComEvent::TIMEOUT) => return Err(CommunicationError::TimedOut),
            (_, event) => panic!("Expected {event:?} instead of receive_packet"),
        };

        println!("{:?} received {frame:?}", self.side);
        if matches!(frame, Frame::Data(_)) {
            self.send_packet(&Frame::Ack)?;
        }
        Ok(frame)
    }
}

impl Read for TestCom {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }
}

impl Write for TestCom {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One request and its reply, as seen on the wire from either side
pub fn exchange(request: Vec<u8>, status: Status) -> Vec<ComEvent> {
    vec![
        ComEvent::DUT(Frame::Data(request)),
        ComEvent::FIXTURE(Frame::Ack),
        ComEvent::FIXTURE(Frame::from(status)),
        ComEvent::DUT(Frame::Ack),
    ]
}

pub fn start() -> Vec<u8> {
    Request::Start.to_bytes()
}

pub fn test_pin(pin: u8, level: Level) -> Vec<u8> {
    Request::TestPin { pin: PinId(pin), level }.to_bytes()
}

pub fn mac(id: DeviceId) -> Vec<u8> {
    Request::Mac(id).to_bytes()
}

pub fn stop() -> Vec<u8> {
    Request::Stop.to_bytes()
}

pub fn device_id() -> DeviceId {
    DeviceId::from_unique_id([0x24, 0x0a, 0xc4, 0x00, 0xfe, 0x01])
}

/// Sets up the per-thread log file. Call once at the start of every test.
pub fn prepare_logging() {
    let _ = std::fs::create_dir("tests/tmp");
    file_per_thread_logger::allow_uninitialized();
    file_per_thread_logger::initialize("tests/tmp/log-");
}

/// Keeps every color it was asked to show
#[derive(Default)]
pub struct RecordingIndicator {
    staged: Color,
    pub shown: Vec<Color>,
}

impl Indicator for RecordingIndicator {
    fn set(&mut self, color: Color) {
        self.staged = color;
    }

    fn show(&mut self) -> anyhow::Result<()> {
        self.shown.push(self.staged);
        Ok(())
    }
}

/// The fail signal: red and dark, five times
pub fn fail_blinks() -> Vec<Color> {
    [Color::FAIL, Color::OFF].repeat(5)
}

struct BenchState {
    /// Net `i` joins the DUT's and the fixture's `i`th pin under test
    nets: Vec<PinId>,
    strap: Vec<bool>,
    opens: Vec<usize>,
    shorts: Vec<(usize, usize)>,
    dut: HashMap<PinId, Option<Level>>,
    fixture: HashMap<PinId, Pull>,
    broken: bool,
}

impl BenchState {
    fn net(&self, pin: PinId) -> anyhow::Result<usize> {
        self.nets
            .iter()
            .position(|p| *p == pin)
            .ok_or_else(|| anyhow::anyhow!("{pin} is not wired on the bench"))
    }

    /// Nets electrically joined to `net` on the fixture side
    fn group(&self, net: usize) -> Vec<usize> {
        let mut group = vec![net];
        for (a, b) in &self.shorts {
            if *a == net {
                group.push(*b);
            } else if *b == net {
                group.push(*a);
            }
        }
        group
    }

    fn fixture_level(&self, pin: PinId) -> anyhow::Result<Level> {
        anyhow::ensure!(!self.broken, "GPIO controller does not respond");
        let net = self.net(pin)?;
        let group = self.group(net);

        let driven = group
            .iter()
            .filter(|n| !self.opens.contains(n))
            .find_map(|n| self.dut.get(&self.nets[*n]).copied().flatten());
        if let Some(level) = driven {
            return Ok(level);
        }
        if group.iter().any(|n| self.strap[*n]) {
            return Ok(Level::High);
        }

        let pull = self.fixture.get(&pin).copied().unwrap_or(Pull::None);
        Ok(pull.rest_level().unwrap_or(Level::Low))
    }
}

/// Two boards of the same revision wired pin to pin, with faults that can be soldered in
#[derive(Clone)]
pub struct Bench {
    state: Arc<Mutex<BenchState>>,
    dut_pins: Vec<PinId>,
}

impl Bench {
    pub fn new(layout: &BoardLayout) -> Self {
        let nets: Vec<PinId> = layout.pins.ids().collect();
        let state = BenchState {
            strap: layout.pins.iter().map(|p| p.always_high).collect(),
            opens: vec![],
            shorts: vec![],
            dut: layout.claimed_pins().into_iter().map(|p| (p, None)).collect(),
            fixture: nets.iter().map(|p| (*p, Pull::None)).collect(),
            nets,
            broken: false,
        };
        Self { state: Arc::new(Mutex::new(state)), dut_pins: layout.claimed_pins() }
    }

    /// Bridges the traces of the `a`th and `b`th pin
    pub fn short(self, a: usize, b: usize) -> Self {
        self.state.lock().unwrap().shorts.push((a, b));
        self
    }

    /// Lifts the `i`th pin of the DUT off its pad
    pub fn open(self, i: usize) -> Self {
        self.state.lock().unwrap().opens.push(i);
        self
    }

    pub fn break_gpio(&self) {
        self.state.lock().unwrap().broken = true;
    }

    pub fn fixture(&self) -> FixturePins {
        FixturePins(self.state.clone())
    }

    pub fn dut(&self) -> DutPins {
        DutPins(self.state.clone())
    }

    /// Whether the DUT left every pin it claimed floating
    pub fn dut_is_floating(&self) -> bool {
        let state = self.state.lock().unwrap();
        self.dut_pins.iter().all(|p| state.dut[p].is_none())
    }
}

pub struct FixturePins(Arc<Mutex<BenchState>>);

impl PinBank for FixturePins {
    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()> {
        let mut state = self.0.lock().unwrap();
        anyhow::ensure!(!state.broken, "GPIO controller does not respond");
        state.net(pin)?;
        state.fixture.insert(pin, pull);
        Ok(())
    }

    fn drive(&mut self, pin: PinId, _level: Level) -> anyhow::Result<()> {
        anyhow::bail!("The fixture never drives {pin}")
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        self.0.lock().unwrap().fixture_level(pin)
    }
}

pub struct DutPins(Arc<Mutex<BenchState>>);

impl DutPins {
    fn mode(&mut self, pin: PinId, level: Option<Level>) -> anyhow::Result<()> {
        let mut state = self.0.lock().unwrap();
        let mode = state.dut.get_mut(&pin).ok_or_else(|| anyhow::anyhow!("{pin} not claimed"))?;
        *mode = level;
        Ok(())
    }
}

impl PinBank for DutPins {
    fn set_input(&mut self, pin: PinId, _pull: Pull) -> anyhow::Result<()> {
        self.mode(pin, None)
    }

    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()> {
        self.mode(pin, Some(level))
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        let state = self.0.lock().unwrap();
        Ok(state.dut.get(&pin).copied().flatten().unwrap_or(Level::Low))
    }
}
