use crate::{
    indicator::{Color, Indicator},
    pins::PinBank,
};

use super::{CommandResult, Session, SessionState};

/// Ends the session: signals pass or fail on the pixel, then returns to idle. Blocks for the whole
/// signal.
pub fn stop<B: PinBank, I: Indicator>(session: &mut Session<B, I>) -> CommandResult {
    session.state = SessionState::Reporting;

    let errors = session.tally;
    match (errors, session.device_id) {
        (0, Some(id)) => log::info!("Test of {id} passed successfully"),
        (0, None) => log::info!("Test passed successfully"),
        (n, Some(id)) => log::error!("Test of {id} failed with {n} error(s)"),
        (n, None) => log::error!("Test failed with {n} error(s)"),
    }

    let signalled = signal_result(session, errors > 0);
    session.enter_idle()?;
    signalled?;
    Ok(())
}

fn signal_result<B: PinBank, I: Indicator>(
    session: &mut Session<B, I>,
    failed: bool,
) -> anyhow::Result<()> {
    let timing = session.timing;
    if failed {
        for _ in 0..timing.blink_count {
            session.indicator.display(Color::FAIL)?;
            std::thread::sleep(timing.blink_on());
            session.indicator.display(Color::OFF)?;
            std::thread::sleep(timing.blink_off());
        }
    } else {
        session.indicator.display(Color::PASS)?;
        std::thread::sleep(timing.pass_hold());
    }
    Ok(())
}
