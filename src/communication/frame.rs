use std::io::Read;

use crc::{Crc, CRC_16_IBM_SDLC};

/// A single unit on the serial link between fixture and DUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Ack,
    Nack,
    Data(Vec<u8>),
}

#[derive(Clone, Copy, strum::FromRepr)]
#[repr(u8)]
pub enum FrameHeader {
    Ack = 0x6a,
    Nack = 0x95,
    Data = 0x3c,
}

impl Frame {
    /// Longest payload a data frame may carry. Requests and replies are a handful of bytes.
    pub const MAXIMUM_DATA_LENGTH: usize = 32;
    pub const MAXIMUM_FRAME_LENGTH: usize = 4 + Self::MAXIMUM_DATA_LENGTH;

    const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

    /// CRC-16 of the payload. For variants other than Self::Data, 0 is returned
    pub fn checksum(&self) -> u16 {
        if let Self::Data(data) = self {
            Self::CRC.checksum(data)
        } else {
            0
        }
    }

    pub fn crc_is_valid(data: &[u8], checksum: u16) -> bool {
        Frame::CRC.checksum(data) == checksum
    }

    pub const fn header(&self) -> u8 {
        let header = match self {
            Frame::Ack => FrameHeader::Ack,
            Frame::Nack => FrameHeader::Nack,
            Frame::Data(_) => FrameHeader::Data,
        };
        header as u8
    }

    pub fn try_from_read(reader: &mut (impl Read + ?Sized)) -> Result<Self, FrameParseError> {
        let mut header_buffer = [0; 1];
        reader.read_exact(&mut header_buffer)?;

        let header =
            FrameHeader::from_repr(header_buffer[0]).ok_or(FrameParseError::InvalidHeader)?;
        let frame = match header {
            FrameHeader::Ack => Frame::Ack,
            FrameHeader::Nack => Frame::Nack,
            FrameHeader::Data => {
                let mut length_buffer = [0; 1];
                reader.read_exact(&mut length_buffer)?;
                let length = length_buffer[0] as usize;

                if length > Self::MAXIMUM_DATA_LENGTH {
                    return Err(FrameParseError::InvalidLength);
                }

                let mut data_buffer = vec![0; length];
                reader.read_exact(&mut data_buffer)?;

                let mut crc_buffer = [0; 2];
                reader.read_exact(&mut crc_buffer)?;
                if !Frame::crc_is_valid(&data_buffer, u16::from_le_bytes(crc_buffer)) {
                    return Err(FrameParseError::InvalidCRC);
                }

                Frame::Data(data_buffer)
            }
        };

        Ok(frame)
    }
}

impl From<&Frame> for Vec<u8> {
    fn from(value: &Frame) -> Self {
        match value {
            Frame::Data(bytes) => {
                let mut v = Vec::with_capacity(4 + bytes.len());
                v.push(value.header());
                v.push(bytes.len() as u8);
                v.extend(bytes);
                v.extend(value.checksum().to_le_bytes());
                v
            }
            _ => vec![value.header()],
        }
    }
}

#[derive(Debug, strum::Display)]
pub enum FrameParseError {
    InvalidLength,
    InvalidHeader,
    InvalidCRC,
    Io(std::io::Error),
}

impl std::error::Error for FrameParseError {}

impl From<std::io::Error> for FrameParseError {
    fn from(value: std::io::Error) -> Self {
        FrameParseError::Io(value)
    }
}

impl TryFrom<Vec<u8>> for Frame {
    type Error = FrameParseError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from_read(&mut std::io::Cursor::new(value))
    }
}
