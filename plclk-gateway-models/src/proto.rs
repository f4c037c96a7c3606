//! Control protocol: fixed operation codes over length-prefixed frames.
//!
//! Request frame body: `u8` opcode followed by the opcode's payload; all
//! integers big-endian. Response frame body: `i32` status (0 ok, negative
//! wire error code) followed by the response payload. The opcode set is
//! closed: unknown codes are rejected, not ignored.

use bytes::{BufMut, BytesMut};
use plclk_gateway_error::protocol::ProtocolError;
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame body length accepted on either side.
pub const MAX_FRAME_LEN: u32 = 64;

/// Bound of the legacy read view's formatted text buffer.
pub const READ_TEXT_CAP: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Opcode {
    GetRate = 0x01,
    SetRate = 0x02,
    SetEnabled = 0x03,
    /// Legacy seek-based text view of the current rate.
    Read = 0x10,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Opcode::GetRate),
            0x02 => Ok(Opcode::SetRate),
            0x03 => Ok(Opcode::SetEnabled),
            0x10 => Ok(Opcode::Read),
            other => Err(ProtocolError::UnsupportedOperation(other)),
        }
    }
}

/// Unified wire encoding trait across protocol types.
pub trait WireEncode {
    fn encoded_len(&self) -> usize;
    fn encode_to<B: BufMut>(&self, dst: &mut B);

    fn to_bytes(&self) -> BytesMut {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut dst);
        dst
    }
}

/// Wire decoding trait; implementations must consume the input exactly.
pub trait WireDecode: Sized {
    fn parse(input: &[u8]) -> Result<Self, ProtocolError>;
}

/// One decoded control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    GetRate,
    SetRate(u64),
    SetEnabled(bool),
    Read { offset: u64, len: u32 },
}

impl ControlRequest {
    #[inline]
    pub const fn opcode(&self) -> Opcode {
        match self {
            ControlRequest::GetRate => Opcode::GetRate,
            ControlRequest::SetRate(_) => Opcode::SetRate,
            ControlRequest::SetEnabled(_) => Opcode::SetEnabled,
            ControlRequest::Read { .. } => Opcode::Read,
        }
    }
}

impl WireEncode for ControlRequest {
    fn encoded_len(&self) -> usize {
        1 + match self {
            ControlRequest::GetRate => 0,
            ControlRequest::SetRate(_) => 8,
            ControlRequest::SetEnabled(_) => 1,
            ControlRequest::Read { .. } => 12,
        }
    }

    fn encode_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(self.opcode() as u8);
        match self {
            ControlRequest::GetRate => {}
            ControlRequest::SetRate(rate) => dst.put_u64(*rate),
            ControlRequest::SetEnabled(on) => dst.put_u8(*on as u8),
            ControlRequest::Read { offset, len } => {
                dst.put_u64(*offset);
                dst.put_u32(*len);
            }
        }
    }
}

impl WireDecode for ControlRequest {
    fn parse(input: &[u8]) -> Result<Self, ProtocolError> {
        let (&op, payload) = input
            .split_first()
            .ok_or_else(|| ProtocolError::malformed("empty frame"))?;
        let opcode = Opcode::try_from(op)?;
        let expect = |n: usize| {
            if payload.len() == n {
                Ok(())
            } else {
                Err(ProtocolError::malformed(format!(
                    "opcode {op:#04x} expects {n}-byte payload, got {}",
                    payload.len()
                )))
            }
        };
        match opcode {
            Opcode::GetRate => {
                expect(0)?;
                Ok(ControlRequest::GetRate)
            }
            Opcode::SetRate => {
                expect(8)?;
                Ok(ControlRequest::SetRate(u64::from_be_bytes(
                    payload.try_into().expect("length checked"),
                )))
            }
            Opcode::SetEnabled => {
                expect(1)?;
                match payload[0] {
                    0 => Ok(ControlRequest::SetEnabled(false)),
                    1 => Ok(ControlRequest::SetEnabled(true)),
                    other => Err(ProtocolError::malformed(format!(
                        "enable flag must be 0 or 1, got {other}"
                    ))),
                }
            }
            Opcode::Read => {
                expect(12)?;
                Ok(ControlRequest::Read {
                    offset: u64::from_be_bytes(payload[..8].try_into().expect("length checked")),
                    len: u32::from_be_bytes(payload[8..].try_into().expect("length checked")),
                })
            }
        }
    }
}

/// One control response: status plus opcode-dependent payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub status: i32,
    pub payload: Vec<u8>,
}

impl ControlResponse {
    #[inline]
    pub fn ok() -> Self {
        ControlResponse {
            status: 0,
            payload: Vec::new(),
        }
    }

    #[inline]
    pub fn ok_rate(rate: u64) -> Self {
        ControlResponse {
            status: 0,
            payload: rate.to_be_bytes().to_vec(),
        }
    }

    #[inline]
    pub fn ok_bytes(bytes: Vec<u8>) -> Self {
        ControlResponse {
            status: 0,
            payload: bytes,
        }
    }

    #[inline]
    pub fn err(code: i32) -> Self {
        ControlResponse {
            status: code,
            payload: Vec::new(),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// Rate payload view, present on `GET_RATE`/`SET_RATE` success frames.
    pub fn rate(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.payload.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }
}

impl WireEncode for ControlResponse {
    fn encoded_len(&self) -> usize {
        4 + self.payload.len()
    }

    fn encode_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_i32(self.status);
        dst.put_slice(&self.payload);
    }
}

impl WireDecode for ControlResponse {
    fn parse(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() < 4 {
            return Err(ProtocolError::malformed("response shorter than status"));
        }
        Ok(ControlResponse {
            status: i32::from_be_bytes(input[..4].try_into().expect("length checked")),
            payload: input[4..].to_vec(),
        })
    }
}

/// Outcome of reading one frame from a stream.
#[derive(Debug)]
pub enum FrameRead {
    /// Peer closed cleanly between frames.
    Eof,
    /// One complete frame body.
    Frame(Vec<u8>),
    /// Length prefix exceeded [`MAX_FRAME_LEN`]; the body was not read.
    Oversized { len: u32 },
}

/// Write one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: WireEncode,
{
    let body = msg.to_bytes();
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

/// Read one length-prefixed frame body.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<FrameRead>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(FrameRead::Eof),
        Err(e) => return Err(e),
    };
    if len > MAX_FRAME_LEN {
        return Ok(FrameRead::Oversized { len });
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(FrameRead::Frame(body))
}
