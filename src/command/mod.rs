use crate::{
    communication::{
        rpc::{Request, Status},
        CommunicationError, CommunicationHandle, Frame,
    },
    indicator::Indicator,
    pins::PinBank,
};

mod error;
pub use error::CommandError;
mod session;
pub use session::{Session, SessionState};
mod start;
pub use start::start;
mod test_pin;
pub use test_pin::test_pin;
mod mac;
pub use mac::mac;
mod stop;
pub use stop::stop;

type CommandResult = Result<(), CommandError>;

/// Main routine of the fixture. Waits for a request from the DUT, executes it and answers with a
/// [`Status`]. Errors are answered as well where the DUT is still waiting for a reply.
pub fn handle_command<B: PinBank, I: Indicator>(
    com: &mut impl CommunicationHandle,
    session: &mut Session<B, I>,
) -> CommandResult {
    let ret = process_command(com, session);

    if let Err(ce) = &ret {
        let status = match ce {
            CommandError::ProtocolViolation(_) => Some(Status::Malformed),
            CommandError::InvalidArgument(_) => Some(Status::InvalidArgument),
            CommandError::NonRecoverable(_) => Some(Status::Failed),
            CommandError::Link(_) => None,
        };

        if let Some(status) = status {
            log::error!("Failed to process request: {ce}");
            respond(com, status)?;
        }
    }

    ret
}

pub fn process_command<B: PinBank, I: Indicator>(
    com: &mut impl CommunicationHandle,
    session: &mut Session<B, I>,
) -> CommandResult {
    let data = receive_request(com)?;
    let request = Request::try_from(data.as_slice())?;
    log::debug!("Received {request:?}");

    match request {
        Request::Start => start(session)?,
        Request::TestPin { pin, level } => test_pin(session, pin, level)?,
        Request::Mac(id) => mac(session, id),
        Request::Stop => stop(session)?,
    }

    respond(com, Status::Ok)
}

fn receive_request<C: CommunicationHandle>(com: &mut C) -> Result<Vec<u8>, CommandError> {
    com.set_timeout(&C::UNLIMITED_TIMEOUT);
    match com.receive_packet()? {
        Frame::Data(data) => Ok(data),
        frame => {
            log::error!("Received {frame:?} as request start, expected Data");
            Err(CommunicationError::PacketInvalidError.into())
        }
    }
}

fn respond<C: CommunicationHandle>(com: &mut C, status: Status) -> CommandResult {
    com.set_timeout(&C::INTEGRITY_ACK_TIMEOUT);
    com.send_packet(&status.into())?;
    Ok(())
}
