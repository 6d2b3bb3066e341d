use crate::{
    indicator::{Color, Indicator},
    pins::PinBank,
};

use super::{CommandResult, Session, SessionState};

/// Opens a new session. Calling it on an active session simply starts over.
pub fn start<B: PinBank, I: Indicator>(session: &mut Session<B, I>) -> CommandResult {
    if session.state == SessionState::Active {
        log::warn!("Restarting a session that was never stopped");
    }
    log::info!("Starting test");

    session.tally = 0;
    session.device_id = None;
    session.bank.float_all(&session.layout.pins)?;
    session.indicator.display(Color::OFF)?;
    session.state = SessionState::Active;
    Ok(())
}
