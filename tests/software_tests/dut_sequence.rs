use std::time::Duration;

use gpio_test_jig::{
    communication::{
        rpc::{CallError, Link, Request, Status},
        CommunicationError, Frame,
    },
    dut::{SequenceError, Sequencer},
    indicator::Color,
    pins::{BoardLayout, Level, PinBank, PinId, PinSet, Pull, Revision},
};
use test_case::test_case;

use crate::common::{self, ComEvent::*, *};

type TestSequencer = Sequencer<TestCom, DutPins, RecordingIndicator>;

fn prepare_sequencer(layout: BoardLayout, bench: &Bench, events: Vec<ComEvent>) -> TestSequencer {
    common::prepare_logging();
    let link = Link::new(TestCom::new(Side::Dut, events), Duration::from_millis(1000));
    Sequencer::new(link, bench.dut(), layout, RecordingIndicator::default(), device_id())
        .with_settle_time(Duration::ZERO)
}

/// Every request of one complete run, each answered with `Ok`
fn complete_run(layout: &BoardLayout) -> Vec<ComEvent> {
    let mut events = exchange(start(), Status::Ok);
    events.extend(exchange(mac(device_id()), Status::Ok));
    for level in [Level::High, Level::Low] {
        for pin in layout.pins.ids() {
            events.extend(exchange(test_pin(pin.0, level), Status::Ok));
        }
    }
    events.extend(exchange(stop(), Status::Ok));
    events
}

#[test_case(Revision::V1)]
#[test_case(Revision::V2)]
fn sweeps_every_pin_high_then_low(revision: Revision) {
    let layout = revision.layout();
    let bench = Bench::new(&layout);
    let events = complete_run(&layout);
    let mut sequencer = prepare_sequencer(layout, &bench, events);

    sequencer.run().unwrap();

    assert!(sequencer.link().get_ref().is_complete());
    assert!(bench.dut_is_floating());
    assert_eq!(
        sequencer.indicator().shown,
        vec![Color::SWEEP_HIGH, Color::SWEEP_LOW, Color::STOPPING, Color::OFF]
    );
}

#[test]
fn missing_fixture_is_reported() {
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut sequencer = prepare_sequencer(layout, &bench, vec![DUT(Frame::Data(start())), TIMEOUT]);

    assert!(matches!(
        sequencer.run(),
        Err(SequenceError::NoFixture(CallError::Transport(CommunicationError::TimedOut)))
    ));
    assert!(sequencer.link().get_ref().is_complete());
    assert!(sequencer.indicator().shown.is_empty());
}

#[test]
fn rejected_start_means_no_fixture() {
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut sequencer = prepare_sequencer(layout, &bench, exchange(start(), Status::Malformed));

    assert!(matches!(sequencer.run(), Err(SequenceError::NoFixture(CallError::Rejected))));
}

#[test]
fn failed_call_aborts_the_run() {
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut events = exchange(start(), Status::Ok);
    events.extend(exchange(mac(device_id()), Status::Ok));
    events.extend(exchange(test_pin(5, Level::High), Status::Ok));
    events.extend(exchange(test_pin(22, Level::High), Status::InvalidArgument));
    let mut sequencer = prepare_sequencer(layout, &bench, events);

    let result = sequencer.run();

    assert!(matches!(
        result,
        Err(SequenceError::Call {
            request: Request::TestPin { pin: PinId(22), level: Level::High },
            source: CallError::InvalidArgument,
        })
    ));
    assert!(sequencer.link().get_ref().is_complete());
    assert!(bench.dut_is_floating());
    assert_eq!(sequencer.indicator().shown, vec![Color::SWEEP_HIGH]);
}

#[test]
fn lost_reply_aborts_the_run() {
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut events = exchange(start(), Status::Ok);
    events.extend([DUT(Frame::Data(mac(device_id()))), TIMEOUT]);
    let mut sequencer = prepare_sequencer(layout, &bench, events);

    assert!(matches!(
        sequencer.run(),
        Err(SequenceError::Call {
            request: Request::Mac(_),
            source: CallError::Transport(CommunicationError::TimedOut),
        })
    ));
    assert!(sequencer.link().get_ref().is_complete());
}

#[test]
fn fixture_failure_on_stop() {
    let layout = Revision::V2.layout();
    let bench = Bench::new(&layout);
    let mut events = complete_run(&layout);
    let stop_reply = events.len() - 2;
    events[stop_reply] = FIXTURE(Frame::from(Status::Failed));
    let mut sequencer = prepare_sequencer(layout, &bench, events);

    assert!(matches!(
        sequencer.run(),
        Err(SequenceError::Call { request: Request::Stop, source: CallError::Failed })
    ));
    assert!(bench.dut_is_floating());
}

#[test]
fn run_can_be_repeated() {
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut events = complete_run(&layout);
    events.extend(complete_run(&layout));
    let mut sequencer = prepare_sequencer(layout, &bench, events);

    sequencer.run().unwrap();
    sequencer.run().unwrap();

    assert!(sequencer.link().get_ref().is_complete());
    assert_eq!(sequencer.indicator().shown.len(), 8);
}

/// DUT pins that stop responding to `set_input` after a number of calls
struct WornPins {
    inner: DutPins,
    remaining: usize,
}

impl PinBank for WornPins {
    fn set_input(&mut self, pin: PinId, pull: Pull) -> anyhow::Result<()> {
        anyhow::ensure!(self.remaining > 0, "{pin} does not respond");
        self.remaining -= 1;
        self.inner.set_input(pin, pull)
    }

    fn drive(&mut self, pin: PinId, level: Level) -> anyhow::Result<()> {
        self.inner.drive(pin, level)
    }

    fn read(&mut self, pin: PinId) -> anyhow::Result<Level> {
        self.inner.read(pin)
    }
}

#[test]
fn failed_release_keeps_the_abort_cause() {
    common::prepare_logging();
    let layout = Revision::V1.layout();
    let bench = Bench::new(&layout);
    let mut events = exchange(start(), Status::Ok);
    events.extend(exchange(mac(device_id()), Status::Ok));
    events.extend(exchange(test_pin(5, Level::High), Status::Ok));
    events.extend(exchange(test_pin(22, Level::High), Status::InvalidArgument));

    // Enough for floating the pins before each of the two drives, nothing for the cleanup
    let pins = WornPins { inner: bench.dut(), remaining: 2 * PinSet::LEN };
    let link = Link::new(TestCom::new(Side::Dut, events), Duration::from_millis(1000));
    let mut sequencer =
        Sequencer::new(link, pins, layout, RecordingIndicator::default(), device_id())
            .with_settle_time(Duration::ZERO);

    assert!(matches!(
        sequencer.run(),
        Err(SequenceError::Call {
            request: Request::TestPin { pin: PinId(22), level: Level::High },
            source: CallError::InvalidArgument,
        })
    ));
    assert!(sequencer.link().get_ref().is_complete());
}
