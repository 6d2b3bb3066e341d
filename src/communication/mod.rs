mod frame;
pub use frame::{Frame, FrameParseError};

pub mod rpc;

use std::{
    io::{Read, Write},
    os::unix::net::UnixStream,
    time::Duration,
};

pub type ComResult<T> = Result<T, CommunicationError>;

/// A byte stream to the peer board, with the framing and integrity handshake layered on top
pub trait CommunicationHandle: Read + Write {
    const INTEGRITY_ACK_TIMEOUT: Duration;
    const UNLIMITED_TIMEOUT: Duration = Duration::MAX;

    const DATA_FRAME_RETRIES: usize = 4;

    fn set_timeout(&mut self, timeout: &Duration);

    /// Writes the frame. Data frames are only complete once the peer acknowledged them; a Nack
    /// triggers a retransmission.
    fn send_packet(&mut self, frame: &Frame) -> ComResult<()> {
        let bytes = Vec::from(frame);

        if !matches!(frame, Frame::Data(_)) {
            self.write_all(&bytes)?;
            self.flush()?;
            return Ok(());
        }

        // Every transmission is followed by a wait for its Ack
        for _ in 0..Self::DATA_FRAME_RETRIES {
            self.write_all(&bytes)?;
            self.flush()?;

            match Frame::try_from_read(self)? {
                Frame::Ack => return Ok(()),
                Frame::Nack => log::warn!("Received NACK after data frame; Retrying"),
                f => {
                    log::error!("Received {f:?} after data frame");
                    return Err(CommunicationError::PacketInvalidError);
                }
            }
        }

        log::error!("No ACK after {} retries, giving up", Self::DATA_FRAME_RETRIES);
        Err(CommunicationError::PacketInvalidError)
    }

    /// Reads the next frame. Data frames are acknowledged, corrupted ones are answered with a Nack
    /// so the peer retransmits.
    fn receive_packet(&mut self) -> ComResult<Frame> {
        for _ in 0..Self::DATA_FRAME_RETRIES {
            match Frame::try_from_read(self) {
                Ok(f @ Frame::Data(_)) => {
                    self.send_packet(&Frame::Ack)?;
                    return Ok(f);
                }
                Ok(f) => return Ok(f),
                Err(FrameParseError::InvalidCRC) => {
                    log::warn!("Received data frame with invalid CRC; Retrying");
                    self.send_packet(&Frame::Nack)?;
                }
                Err(e) => {
                    log::error!("Failed to read frame: {e:?}");
                    return Err(e.into());
                }
            }
        }

        log::error!("Gave up on corrupted data after {} retries", Self::DATA_FRAME_RETRIES);
        Err(CommunicationError::PacketInvalidError)
    }

    fn await_ack(&mut self, timeout: &Duration) -> ComResult<()> {
        self.set_timeout(timeout);
        match self.receive_packet()? {
            Frame::Ack => Ok(()),
            Frame::Nack => Err(CommunicationError::NotAcknowledged),
            _ => Err(CommunicationError::PacketInvalidError),
        }
    }
}

impl CommunicationHandle for Box<dyn serialport::SerialPort> {
    const INTEGRITY_ACK_TIMEOUT: Duration = Duration::from_millis(100);

    fn set_timeout(&mut self, timeout: &Duration) {
        if let Err(e) = serialport::SerialPort::set_timeout(self.as_mut(), *timeout) {
            log::error!("Could not set serial timeout: {e}");
        }
    }
}

/// Used to wire fixture and DUT together on a single machine
impl CommunicationHandle for UnixStream {
    const INTEGRITY_ACK_TIMEOUT: Duration = Duration::from_millis(100);

    fn set_timeout(&mut self, timeout: &Duration) {
        let timeout = if *timeout == Self::UNLIMITED_TIMEOUT || timeout.is_zero() {
            None
        } else {
            Some(*timeout)
        };

        if let Err(e) = self.set_read_timeout(timeout) {
            log::error!("Could not set socket timeout: {e}");
        }
    }
}

#[derive(Debug)]
pub enum CommunicationError {
    /// Signals that an unexpected or unusable frame was received
    PacketInvalidError,
    /// Relays an error from trying to parse a frame
    FrameParsing(FrameParseError),
    /// Signals that the underlying sending or receiving failed. Not recoverable on its own.
    Io(std::io::Error),
    /// Signals that a receive timed out
    TimedOut,
    /// Nack was received when Ack was expected
    NotAcknowledged,
}

impl std::fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<std::io::Error> for CommunicationError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                CommunicationError::TimedOut
            }
            std::io::ErrorKind::InvalidData => CommunicationError::PacketInvalidError,
            _ => CommunicationError::Io(value),
        }
    }
}

impl From<FrameParseError> for CommunicationError {
    fn from(value: FrameParseError) -> Self {
        match value {
            FrameParseError::Io(e) => e.into(),
            e => Self::FrameParsing(e),
        }
    }
}

impl std::error::Error for CommunicationError {}
