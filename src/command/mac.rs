use crate::{communication::rpc::DeviceId, indicator::Indicator, pins::PinBank};

use super::{Session, SessionState};

/// Records which board is in the rig, for traceability of the log
pub fn mac<B: PinBank, I: Indicator>(session: &mut Session<B, I>, id: DeviceId) {
    if session.state != SessionState::Active {
        log::warn!("Received device id outside of a session");
    }
    log::info!("Testing ID {id}");
    session.device_id = Some(id);
}
