use crate::{
    communication::{rpc::RequestParseError, CommunicationError},
    verify::VerifyError,
};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The fixture's own hardware failed
    #[error("Non-recoverable: {0:?}")]
    NonRecoverable(anyhow::Error),
    /// Receiving the request or delivering the reply failed
    #[error("Link: {0}")]
    Link(#[from] CommunicationError),
    #[error("Protocol Violation: {0:?}")]
    ProtocolViolation(anyhow::Error),
    /// The request was well-formed but named something this board does not have
    #[error("Invalid Argument: {0:?}")]
    InvalidArgument(anyhow::Error),
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        CommandError::NonRecoverable(e)
    }
}

impl From<RequestParseError> for CommandError {
    fn from(e: RequestParseError) -> Self {
        CommandError::ProtocolViolation(e.into())
    }
}

impl From<VerifyError> for CommandError {
    fn from(e: VerifyError) -> Self {
        match e {
            e @ VerifyError::UnknownPin(_) => CommandError::InvalidArgument(e.into()),
            VerifyError::Hardware(e) => CommandError::NonRecoverable(e),
        }
    }
}
