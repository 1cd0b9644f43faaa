//! Tag-indexed RPM header structures.
//!
//! Layout of a header section:
//!
//! ```text
//! 8e ad e8 01 | 4 reserved | index count (u32 BE) | data size (u32 BE)
//! index count × { tag: u32, type: u32, offset: u32, count: u32 }
//! data store (data size bytes)
//! ```

mod tag;
mod value;

pub use self::tag::{SignatureTag, Tag};
pub use self::value::Value;
#[cfg(any(test, feature = "fixtures"))]
pub(crate) use self::value::{TYPE_BIN, TYPE_I18NSTRING, TYPE_INT16, TYPE_INT32, TYPE_STRING, TYPE_STRING_ARRAY};

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

pub(crate) const HEADER_MAGIC: [u8; 4] = [0x8e, 0xad, 0xe8, 0x01];
const PREAMBLE_SIZE: usize = 16;
const INDEX_ENTRY_SIZE: usize = 16;

/// A parsed header: tag → value, plus where it sat in the file.
#[derive(Debug, Clone)]
pub struct Header<T> {
    entries: HashMap<T, Value>,
    range: Range<usize>,
}

impl<T: From<u32> + Eq + Hash> Header<T> {
    /// Parse the header starting at `offset`.
    ///
    /// Every length is checked against the input before anything is
    /// allocated, so hostile counts fail instead of exhausting memory.
    pub(crate) fn parse(bytes: &[u8], offset: usize, section: &'static str) -> Result<Self> {
        let available = bytes.len().saturating_sub(offset);
        let preamble = bytes.get(offset..offset + PREAMBLE_SIZE).ok_or_raise(|| ErrorKind::Truncated {
            section,
            needed: PREAMBLE_SIZE,
            available,
        })?;
        if preamble[..4] != HEADER_MAGIC {
            exn::bail!(ErrorKind::BadMagic(section));
        }
        let index_count = be_u32(&preamble[8..12]) as usize;
        let data_size = be_u32(&preamble[12..16]) as usize;

        let needed = index_count
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|index_len| index_len.checked_add(PREAMBLE_SIZE))
            .and_then(|len| len.checked_add(data_size))
            .ok_or_raise(|| ErrorKind::OutOfRange("header size"))?;
        if needed > available {
            exn::bail!(ErrorKind::Truncated {
                section,
                needed,
                available
            });
        }
        let index_start = offset + PREAMBLE_SIZE;
        let store_start = index_start + index_count * INDEX_ENTRY_SIZE;
        let store = &bytes[store_start..store_start + data_size];

        let mut entries = HashMap::with_capacity(index_count);
        for entry in bytes[index_start..store_start].chunks_exact(INDEX_ENTRY_SIZE) {
            let tag = be_u32(&entry[0..4]);
            let kind = be_u32(&entry[4..8]);
            let data_offset = be_u32(&entry[8..12]) as usize;
            let count = be_u32(&entry[12..16]) as usize;
            let value = Value::decode(kind, store, data_offset, count)?;
            // First occurrence wins; rpm itself never emits duplicates.
            entries.entry(T::from(tag)).or_insert(value);
        }
        Ok(Self {
            entries,
            range: offset..offset + needed,
        })
    }
}

impl<T: Eq + Hash> Header<T> {
    /// Byte range `[start, end)` of this header within the package file.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tag: T) -> Option<&Value> {
        self.entries.get(&tag)
    }

    pub fn string(&self, tag: T) -> Option<&str> {
        self.get(tag).and_then(Value::as_str)
    }

    /// String value, or the empty string when absent.
    pub fn string_or_empty(&self, tag: T) -> String {
        self.string(tag).unwrap_or_default().to_string()
    }

    pub fn strings(&self, tag: T) -> Vec<&str> {
        self.get(tag).map(Value::as_strings).unwrap_or_default()
    }

    pub fn integer(&self, tag: T) -> Option<u64> {
        self.get(tag).and_then(Value::as_integer)
    }

    pub fn integers(&self, tag: T) -> Vec<u64> {
        self.get(tag).map(Value::as_integers).unwrap_or_default()
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
