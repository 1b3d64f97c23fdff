//! Attribute codec: the one structured payload field on the wire.
//!
//! Requests and replies carry a netlink-style attribute stream: each
//! attribute is a `u16` total length (header plus payload, native endian),
//! a `u16` tag, the payload bytes, and zero padding up to a 4-byte boundary.
//! Exactly one tag is recognized, [`AttrTag::Msg`]. In a request it holds a
//! non-empty, null-terminated path string; in a reply it holds either the
//! one-byte result code or a null-terminated descriptive message.
//!
//! This module is the only place wire payloads are decoded or encoded.

use crate::command::ResultCode;

/// Attribute header size: length field plus tag field.
const ATTR_HEADER_LEN: usize = 4;

/// Attribute alignment on the wire.
const ATTR_ALIGN: usize = 4;

/// Attribute tags understood by the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum AttrTag {
    /// Unspecified; never emitted, skipped on decode.
    Unspec = 0,
    /// The single recognized field.
    Msg = 1,
}

/// Decode failures for attribute payloads.
///
/// `MissingPath` and `EmptyPath` classify as "no path" to the caller; the
/// remaining variants are protocol-level corruption.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AttrError {
    /// The payload carries no `Msg` attribute.
    #[error("request carries no path attribute")]
    MissingPath,
    /// The `Msg` attribute holds an empty or bare-NUL string.
    #[error("path attribute is empty")]
    EmptyPath,
    /// An attribute header or payload runs past the end of the buffer.
    #[error("truncated attribute at offset {offset}")]
    Truncated {
        /// Byte offset of the offending attribute header.
        offset: usize,
    },
    /// The `Msg` payload is not a null-terminated UTF-8 string.
    #[error("path attribute is not a null-terminated string")]
    BadString,
    /// A reply carried a result byte outside the known code range.
    #[error("unknown result code {0}")]
    BadResult(u8),
}

fn align(len: usize) -> usize {
    (len + ATTR_ALIGN - 1) & !(ATTR_ALIGN - 1)
}

/// Walk the attribute stream and return the payload of the first `Msg`
/// attribute, or `None` if the stream holds no recognized attribute.
fn find_msg(raw: &[u8]) -> Result<Option<&[u8]>, AttrError> {
    let mut offset = 0;
    while offset + ATTR_HEADER_LEN <= raw.len() {
        let len = u16::from_ne_bytes([raw[offset], raw[offset + 1]]) as usize;
        let tag = u16::from_ne_bytes([raw[offset + 2], raw[offset + 3]]);
        if len < ATTR_HEADER_LEN || offset + len > raw.len() {
            return Err(AttrError::Truncated { offset });
        }
        let payload = &raw[offset + ATTR_HEADER_LEN..offset + len];
        if tag == AttrTag::Msg as u16 {
            return Ok(Some(payload));
        }
        offset += align(len);
    }
    if offset < raw.len() {
        // Trailing bytes too short to be an attribute header.
        return Err(AttrError::Truncated { offset });
    }
    Ok(None)
}

/// Extract the request path: the `Msg` attribute as a non-empty,
/// null-terminated UTF-8 string.
pub fn decode_path(raw: &[u8]) -> Result<String, AttrError> {
    let payload = find_msg(raw)?.ok_or(AttrError::MissingPath)?;
    let (last, body) = payload.split_last().ok_or(AttrError::EmptyPath)?;
    if *last != 0 {
        return Err(AttrError::BadString);
    }
    if body.is_empty() {
        return Err(AttrError::EmptyPath);
    }
    let path = std::str::from_utf8(body).map_err(|_| AttrError::BadString)?;
    Ok(path.to_owned())
}

fn put_attr(buf: &mut Vec<u8>, tag: AttrTag, payload: &[u8]) {
    let len = ATTR_HEADER_LEN + payload.len();
    buf.extend_from_slice(&(len as u16).to_ne_bytes());
    buf.extend_from_slice(&(tag as u16).to_ne_bytes());
    buf.extend_from_slice(payload);
    buf.resize(buf.len() + (align(len) - len), 0);
}

/// Encode a request path under the `Msg` tag (controller side).
pub fn encode_path(path: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(path.len() + 1);
    payload.extend_from_slice(path.as_bytes());
    payload.push(0);
    let mut buf = Vec::new();
    put_attr(&mut buf, AttrTag::Msg, &payload);
    buf
}

/// Encode a reply payload carrying the one-byte result code.
pub fn encode_result(code: ResultCode) -> Vec<u8> {
    let mut buf = Vec::new();
    put_attr(&mut buf, AttrTag::Msg, &[code.as_u8()]);
    buf
}

/// Encode a reply payload carrying a null-terminated descriptive message.
/// The string variant of the reply contract; the dispatcher itself only
/// emits result codes (see [`crate::reply`]).
pub fn encode_message(text: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text.as_bytes());
    payload.push(0);
    let mut buf = Vec::new();
    put_attr(&mut buf, AttrTag::Msg, &payload);
    buf
}

/// Decoded form of a reply's `Msg` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyPayload {
    /// One-byte result code.
    Code(ResultCode),
    /// Descriptive message string.
    Message(String),
}

/// Decode a reply payload: a single result byte or a null-terminated string
/// under the `Msg` tag.
pub fn decode_reply(raw: &[u8]) -> Result<ReplyPayload, AttrError> {
    let payload = find_msg(raw)?.ok_or(AttrError::MissingPath)?;
    match payload {
        [] => Err(AttrError::EmptyPath),
        [code] => match ResultCode::from_u8(*code) {
            Some(result) => Ok(ReplyPayload::Code(result)),
            None => Err(AttrError::BadResult(*code)),
        },
        [body @ .., 0] => {
            let text = std::str::from_utf8(body).map_err(|_| AttrError::BadString)?;
            Ok(ReplyPayload::Message(text.to_owned()))
        }
        _ => Err(AttrError::BadString),
    }
}
