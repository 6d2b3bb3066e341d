use crate::{
    indicator::Indicator,
    pins::{Level, PinBank, PinId},
    verify::verify,
};

use super::{CommandResult, Session, SessionState};

/// Checks the pin the DUT is currently driving and adds any mismatches to the tally. The DUT is
/// not told about the outcome.
pub fn test_pin<B: PinBank, I: Indicator>(
    session: &mut Session<B, I>,
    pin: PinId,
    level: Level,
) -> CommandResult {
    if session.state != SessionState::Active {
        log::warn!("Testing {pin} {level} outside of a session");
    }

    let verdict = verify(&mut session.bank, &session.layout.pins, pin, level)?;
    session.tally += verdict.errors;
    log::debug!("{pin} {level}: {} error(s), {} in total", verdict.errors, session.tally);
    Ok(())
}
