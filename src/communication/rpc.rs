//! Request/response calls from the DUT into the fixture
//!
//! Every call is one data frame carrying a [`Request`], answered by one data frame carrying a
//! [`Status`]. Both frames go through the integrity handshake of [`CommunicationHandle`].

use std::{fmt::Display, time::Duration};

use super::{CommunicationError, CommunicationHandle, Frame};
use crate::pins::{Level, PinId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::FromRepr, strum::Display)]
#[repr(u8)]
pub enum CommandCode {
    Start = 0x01,
    TestPin = 0x02,
    Mac = 0x03,
    Stop = 0x04,
}

/// The four operations the fixture exposes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Start,
    TestPin { pin: PinId, level: Level },
    Mac(DeviceId),
    Stop,
}

impl Request {
    pub const fn code(&self) -> CommandCode {
        match self {
            Request::Start => CommandCode::Start,
            Request::TestPin { .. } => CommandCode::TestPin,
            Request::Mac(_) => CommandCode::Mac,
            Request::Stop => CommandCode::Stop,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut v = vec![self.code() as u8];
        match self {
            Request::TestPin { pin, level } => {
                v.push(pin.0);
                v.push(level.bit());
            }
            Request::Mac(id) => v.extend(id.as_bytes()),
            Request::Start | Request::Stop => (),
        }
        v
    }

    const fn expected_length(code: CommandCode) -> usize {
        match code {
            CommandCode::Start | CommandCode::Stop => 1,
            CommandCode::TestPin => 3,
            CommandCode::Mac => 1 + DeviceId::LENGTH,
        }
    }
}

impl TryFrom<&[u8]> for Request {
    type Error = RequestParseError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let first = *data.first().ok_or(RequestParseError::Empty)?;
        let code = CommandCode::from_repr(first).ok_or(RequestParseError::UnknownCommand(first))?;

        let expected = Self::expected_length(code);
        if data.len() != expected {
            return Err(RequestParseError::InvalidLength { code, actual: data.len(), expected });
        }

        let request = match code {
            CommandCode::Start => Request::Start,
            CommandCode::TestPin => Request::TestPin {
                pin: PinId(data[1]),
                level: Level::from_bit(data[2]).ok_or(RequestParseError::InvalidLevel(data[2]))?,
            },
            CommandCode::Mac => Request::Mac(DeviceId::try_from(&data[1..])?),
            CommandCode::Stop => Request::Stop,
        };

        Ok(request)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestParseError {
    #[error("empty request")]
    Empty,
    #[error("unknown command {0:#04x}")]
    UnknownCommand(u8),
    #[error("{code} request with {actual} bytes, expected {expected}")]
    InvalidLength { code: CommandCode, actual: usize, expected: usize },
    #[error("{0} is not a logic level")]
    InvalidLevel(u8),
    #[error("device id is not printable ascii")]
    InvalidDeviceId,
}

/// The fixture's answer to a request
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    /// The request named a pin that is not part of the board's pin set
    InvalidArgument = 0x01,
    /// The request could not be parsed
    Malformed = 0x02,
    /// The fixture could not carry out the request because of its own hardware
    Failed = 0x03,
}

impl From<Status> for Frame {
    fn from(status: Status) -> Self {
        Frame::Data(vec![status as u8])
    }
}

/// Unique hardware identifier of a DUT: the six byte id as twelve lowercase hex characters
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceId([u8; DeviceId::LENGTH]);

impl DeviceId {
    pub const LENGTH: usize = 12;

    pub fn from_unique_id(id: [u8; 6]) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut ascii = [0; Self::LENGTH];
        for (i, byte) in id.iter().enumerate() {
            ascii[2 * i] = HEX[(byte >> 4) as usize];
            ascii[2 * i + 1] = HEX[(byte & 0x0f) as usize];
        }
        DeviceId(ascii)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DeviceId {
    type Error = RequestParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let ascii: [u8; Self::LENGTH] =
            value.try_into().map_err(|_| RequestParseError::InvalidDeviceId)?;
        if !ascii.iter().all(u8::is_ascii_graphic) {
            return Err(RequestParseError::InvalidDeviceId);
        }
        Ok(DeviceId(ascii))
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only printable ascii is ever stored
        f.write_str(std::str::from_utf8(&self.0).map_err(|_| std::fmt::Error)?)
    }
}

impl std::fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceId({self})")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("link failure: {0}")]
    Transport(#[from] CommunicationError),
    #[error("fixture rejected an invalid argument")]
    InvalidArgument,
    #[error("fixture could not parse the request")]
    Rejected,
    #[error("fixture failed to carry out the request")]
    Failed,
}

/// The calling end of the link, used by the DUT
pub struct Link<C: CommunicationHandle> {
    com: C,
    default_timeout: Duration,
}

impl<C: CommunicationHandle> Link<C> {
    pub fn new(com: C, default_timeout: Duration) -> Self {
        Self { com, default_timeout }
    }

    pub fn call(&mut self, request: &Request) -> Result<(), CallError> {
        self.call_with_timeout(request, self.default_timeout)
    }

    /// Sends `request` and blocks for at most `timeout` per frame waiting for the reply
    pub fn call_with_timeout(
        &mut self,
        request: &Request,
        timeout: Duration,
    ) -> Result<(), CallError> {
        log::debug!("Calling {request:?}");
        self.com.set_timeout(&timeout);
        self.com.send_packet(&Frame::Data(request.to_bytes()))?;

        let reply = match self.com.receive_packet()? {
            Frame::Data(data) if data.len() == 1 => Status::from_repr(data[0]),
            _ => None,
        };

        match reply {
            Some(Status::Ok) => Ok(()),
            Some(Status::InvalidArgument) => Err(CallError::InvalidArgument),
            Some(Status::Malformed) => Err(CallError::Rejected),
            Some(Status::Failed) => Err(CallError::Failed),
            None => Err(CommunicationError::PacketInvalidError.into()),
        }
    }

    pub fn get_ref(&self) -> &C {
        &self.com
    }

    pub fn into_inner(self) -> C {
        self.com
    }
}
