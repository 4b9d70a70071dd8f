// Mon Oct 19 2026 - Alex

//! Little-endian framing shared by the service and its clients.
//!
//! Every frame starts with a 16-byte header laid out like a netlink message
//! header. A request body is fixed size; a reply body carries a status and
//! the bytes of a successful read.

use crate::service::{MemoryRequest, Operation, Reply, ServiceError, MAX_PAYLOAD};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 16;
pub const REQUEST_BODY_LEN: usize = 4 + 4 + 8 + 8 + MAX_PAYLOAD;
pub const REQUEST_FRAME_LEN: usize = HEADER_LEN + REQUEST_BODY_LEN;
pub const REPLY_BODY_MIN: usize = 8;
pub const MAX_FRAME_LEN: usize = REQUEST_FRAME_LEN;

pub const KIND_REQUEST: u16 = 0x10;
pub const KIND_REPLY: u16 = 0x03;

/// Legacy protocol number, sent as the default header flags.
pub const PROTOCOL_ID: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub len: u32,
    pub kind: u16,
    pub flags: u16,
    pub seq: u32,
    pub endpoint: u32,
}

impl FrameHeader {
    pub fn new(kind: u16, body_len: usize, seq: u32, endpoint: u32) -> Self {
        Self {
            len: (HEADER_LEN + body_len) as u32,
            kind,
            flags: PROTOCOL_ID,
            seq,
            endpoint,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.len);
        buf.put_u16_le(self.kind);
        buf.put_u16_le(self.flags);
        buf.put_u32_le(self.seq);
        buf.put_u32_le(self.endpoint);
    }

    /// Parses the header and checks its length field against the frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ServiceError> {
        if frame.len() < HEADER_LEN {
            return Err(ServiceError::Malformed(format!(
                "{} bytes is shorter than a header",
                frame.len()
            )));
        }
        let mut buf = frame;
        let header = Self {
            len: buf.get_u32_le(),
            kind: buf.get_u16_le(),
            flags: buf.get_u16_le(),
            seq: buf.get_u32_le(),
            endpoint: buf.get_u32_le(),
        };
        if header.len as usize != frame.len() {
            return Err(ServiceError::Malformed(format!(
                "header length {} but frame has {} bytes",
                header.len,
                frame.len()
            )));
        }
        Ok(header)
    }

    pub fn body_len(&self) -> usize {
        (self.len as usize).saturating_sub(HEADER_LEN)
    }
}

pub fn encode_request(seq: u32, endpoint: u32, request: &MemoryRequest) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_FRAME_LEN);
    FrameHeader::new(KIND_REQUEST, REQUEST_BODY_LEN, seq, endpoint).encode(&mut buf);
    buf.put_u32_le(request.op as u32);
    buf.put_u32_le(0);
    buf.put_u64_le(request.address);
    buf.put_u64_le(request.length);
    buf.put_slice(&request.payload);
    buf.freeze()
}

pub fn decode_request(frame: &[u8]) -> Result<(FrameHeader, MemoryRequest), ServiceError> {
    let header = FrameHeader::decode(frame)?;
    if header.kind != KIND_REQUEST {
        return Err(ServiceError::Malformed(format!("unexpected frame kind 0x{:x}", header.kind)));
    }
    if header.body_len() != REQUEST_BODY_LEN {
        return Err(ServiceError::Malformed(format!(
            "request body is {} bytes, expected {}",
            header.body_len(),
            REQUEST_BODY_LEN
        )));
    }

    let mut body = &frame[HEADER_LEN..];
    let op = Operation::try_from(body.get_u32_le())?;
    body.advance(4);
    let address = body.get_u64_le();
    let length = body.get_u64_le();
    let mut request = MemoryRequest::new(op, address, length);
    body.copy_to_slice(&mut request.payload);
    Ok((header, request))
}

pub fn encode_reply(seq: u32, endpoint: u32, reply: &Reply) -> Bytes {
    let body_len = REPLY_BODY_MIN + reply.data.len();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);
    FrameHeader::new(KIND_REPLY, body_len, seq, endpoint).encode(&mut buf);
    buf.put_i32_le(reply.status);
    buf.put_u32_le(reply.data.len() as u32);
    buf.put_slice(&reply.data);
    buf.freeze()
}

pub fn decode_reply(frame: &[u8]) -> Result<(FrameHeader, Reply), ServiceError> {
    let header = FrameHeader::decode(frame)?;
    if header.kind != KIND_REPLY {
        return Err(ServiceError::Malformed(format!("unexpected frame kind 0x{:x}", header.kind)));
    }
    let mut body = &frame[HEADER_LEN..];
    if body.len() < REPLY_BODY_MIN {
        return Err(ServiceError::Malformed("reply body truncated".to_string()));
    }
    let status = body.get_i32_le();
    let data_len = body.get_u32_le() as usize;
    if data_len != body.remaining() || data_len > MAX_PAYLOAD {
        return Err(ServiceError::Malformed(format!(
            "reply declares {} data bytes, carries {}",
            data_len,
            body.remaining()
        )));
    }
    Ok((
        header,
        Reply {
            status,
            data: body.to_vec(),
        },
    ))
}
