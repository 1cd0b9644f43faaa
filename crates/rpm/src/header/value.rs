//! Typed header values.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;

pub(crate) const TYPE_NULL: u32 = 0;
pub(crate) const TYPE_CHAR: u32 = 1;
pub(crate) const TYPE_INT8: u32 = 2;
pub(crate) const TYPE_INT16: u32 = 3;
pub(crate) const TYPE_INT32: u32 = 4;
pub(crate) const TYPE_INT64: u32 = 5;
pub(crate) const TYPE_STRING: u32 = 6;
pub(crate) const TYPE_BIN: u32 = 7;
pub(crate) const TYPE_STRING_ARRAY: u32 = 8;
pub(crate) const TYPE_I18NSTRING: u32 = 9;

/// A decoded header value.
///
/// Strings are decoded lossily: a header full of Latin-1 changelog entries is
/// still a valid package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Char(Vec<u8>),
    Int8(Vec<u8>),
    Int16(Vec<u16>),
    Int32(Vec<u32>),
    Int64(Vec<u64>),
    String(String),
    Binary(Vec<u8>),
    StringArray(Vec<String>),
    /// One string per locale; the first is the default locale.
    I18nString(Vec<String>),
    /// A value type this parser doesn't know. Kept, never interpreted.
    Unknown { kind: u32, count: u32 },
}

impl Value {
    /// Decode `count` items of type `kind` starting at `offset` within the
    /// header data store.
    pub(crate) fn decode(kind: u32, store: &[u8], offset: usize, count: usize) -> Result<Self> {
        if offset > store.len() {
            exn::bail!(ErrorKind::OutOfRange("index entry offset"));
        }
        let data = &store[offset..];
        Ok(match kind {
            TYPE_NULL => Value::Null,
            TYPE_CHAR => Value::Char(fixed(data, count, 1)?.to_vec()),
            TYPE_INT8 => Value::Int8(fixed(data, count, 1)?.to_vec()),
            TYPE_INT16 => {
                Value::Int16(fixed(data, count, 2)?.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
            },
            TYPE_INT32 => Value::Int32(
                fixed(data, count, 4)?.chunks_exact(4).map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]])).collect(),
            ),
            TYPE_INT64 => Value::Int64(
                fixed(data, count, 8)?
                    .chunks_exact(8)
                    .map(|c| u64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            TYPE_STRING => Value::String(strings(data, 1)?.swap_remove(0)),
            TYPE_BIN => Value::Binary(fixed(data, count, 1)?.to_vec()),
            TYPE_STRING_ARRAY => Value::StringArray(strings(data, count)?),
            TYPE_I18NSTRING => Value::I18nString(strings(data, count)?),
            kind => Value::Unknown {
                kind,
                count: count as u32,
            },
        })
    }

    /// First string of a string-like value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::StringArray(v) | Value::I18nString(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// All strings of a string-like value.
    pub fn as_strings(&self) -> Vec<&str> {
        match self {
            Value::String(s) => vec![s.as_str()],
            Value::StringArray(v) | Value::I18nString(v) => v.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Integer array widened to `u64`.
    pub fn as_integers(&self) -> Vec<u64> {
        match self {
            Value::Char(v) | Value::Int8(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int16(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int32(v) => v.iter().map(|&i| u64::from(i)).collect(),
            Value::Int64(v) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// First integer of an integer value.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Char(v) | Value::Int8(v) => v.first().map(|&i| u64::from(i)),
            Value::Int16(v) => v.first().map(|&i| u64::from(i)),
            Value::Int32(v) => v.first().map(|&i| u64::from(i)),
            Value::Int64(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }
}

fn fixed(data: &[u8], count: usize, width: usize) -> Result<&[u8]> {
    let len = count.checked_mul(width).ok_or_raise(|| ErrorKind::OutOfRange("index entry count"))?;
    data.get(..len).ok_or_raise(|| ErrorKind::OutOfRange("index entry data"))
}

/// Read `count` consecutive NUL-terminated strings.
fn strings(mut data: &[u8], count: usize) -> Result<Vec<String>> {
    // Every string takes at least its terminator, so a count larger than the
    // remaining bytes can't be honest. Checked before allocating.
    if count > data.len() {
        exn::bail!(ErrorKind::OutOfRange("string count"));
    }
    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        let end = memchr::memchr(0, data).ok_or_raise(|| ErrorKind::OutOfRange("unterminated string"))?;
        strings.push(String::from_utf8_lossy(&data[..end]).into_owned());
        data = &data[end + 1..];
    }
    Ok(strings)
}
