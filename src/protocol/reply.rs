//! Reply definitions
//!
//! RESP2 replies: encoding for the server, decoding for the CLI.

use std::fmt;
use std::io::{BufRead, Read, Write};

use bytes::Bytes;

use crate::error::{Result, StoreError};

use super::MAX_LINE_SIZE;

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+text`
    Simple(String),

    /// `-message`
    Error(String),

    /// `:n`
    Integer(i64),

    /// `$len payload`, or `$-1` for `None`
    Bulk(Option<Bytes>),

    /// `*count` followed by the elements
    Array(Vec<Reply>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Null bulk string
    pub fn null() -> Self {
        Reply::Bulk(None)
    }

    /// `-ERR message`
    pub fn error(message: impl fmt::Display) -> Self {
        Reply::Error(format!("ERR {}", message))
    }

    /// Bulk string from anything byte-like
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(data.into()))
    }

    /// Integer from a count
    pub fn count(n: usize) -> Self {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }

    /// Append the wire form to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(text) => {
                out.push(b'+');
                out.extend_from_slice(single_line(text).as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Error(message) => {
                out.push(b'-');
                out.extend_from_slice(single_line(message).as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Integer(n) => {
                out.extend_from_slice(format!(":{}\r\n", n).as_bytes());
            }
            Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
            Reply::Bulk(Some(data)) => {
                out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            Reply::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    /// Wire form as a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// Write the wire form to `writer` (not flushed)
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}

/// Read one reply from `reader`
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?;
    let (kind, body) = match line.split_first() {
        Some((kind, body)) => (*kind, body),
        None => return Err(StoreError::Protocol("empty reply line".to_string())),
    };
    let text = std::str::from_utf8(body)
        .map_err(|_| StoreError::Protocol("reply header is not UTF-8".to_string()))?;

    match kind {
        b'+' => Ok(Reply::Simple(text.to_string())),
        b'-' => Ok(Reply::Error(text.to_string())),
        b':' => Ok(Reply::Integer(parse_header(text)?)),
        b'$' => {
            let len: i64 = parse_header(text)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = checked_len(len)?;
            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data)?;
            if &data[len..] != b"\r\n" {
                return Err(StoreError::Protocol("bulk string not terminated by CRLF".to_string()));
            }
            data.truncate(len);
            Ok(Reply::Bulk(Some(Bytes::from(data))))
        }
        b'*' => {
            let count: i64 = parse_header(text)?;
            if count < 0 {
                return Ok(Reply::Array(Vec::new()));
            }
            let count = checked_len(count)?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(read_reply(reader)?);
            }
            Ok(Reply::Array(items))
        }
        other => Err(StoreError::Protocol(format!(
            "unknown reply type byte {:#04x}",
            other
        ))),
    }
}

/// Read up to and including CRLF, returning the line without it
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_SIZE as u64 + 2)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed",
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(StoreError::Protocol("reply line not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_header(text: &str) -> Result<i64> {
    text.parse()
        .map_err(|_| StoreError::Protocol(format!("invalid length or integer '{}'", text)))
}

fn checked_len(len: i64) -> Result<usize> {
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_LINE_SIZE)
        .ok_or_else(|| StoreError::Protocol(format!("length {} too large", len)))
}

/// Simple strings and errors cannot carry line breaks
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Human-readable form, in the style of interactive clients
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(text) => write!(f, "{}", text),
            Reply::Error(message) => write!(f, "(error) {}", message),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(None) => write!(f, "(nil)"),
            Reply::Bulk(Some(data)) => write!(f, "\"{}\"", data.escape_ascii()),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
