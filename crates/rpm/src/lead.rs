//! The fixed-size lead at the start of every RPM file.

use crate::error::{ErrorKind, Result};

pub(crate) const LEAD_SIZE: usize = 96;
pub(crate) const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];
/// "Signature is a header structure", the only format in use since rpm 3.
pub(crate) const SIGNATURE_TYPE_HEADER: i16 = 5;
const SIGNATURE_TYPE_OFFSET: usize = 78;

/// Binary (`0`) or source (`1`) package, as declared by the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lead {
    pub major: u8,
    pub minor: u8,
    pub kind: i16,
}

impl Lead {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        let Some(lead) = bytes.get(..LEAD_SIZE) else {
            exn::bail!(ErrorKind::Truncated {
                section: "lead",
                needed: LEAD_SIZE,
                available: bytes.len(),
            });
        };
        if lead[..4] != LEAD_MAGIC {
            exn::bail!(ErrorKind::BadMagic("lead"));
        }
        let signature_type = i16::from_be_bytes([lead[SIGNATURE_TYPE_OFFSET], lead[SIGNATURE_TYPE_OFFSET + 1]]);
        if signature_type != SIGNATURE_TYPE_HEADER {
            exn::bail!(ErrorKind::UnsupportedSignature(signature_type));
        }
        Ok(Self {
            major: lead[4],
            minor: lead[5],
            kind: i16::from_be_bytes([lead[6], lead[7]]),
        })
    }
}

/// Cheap sniff: does this look like the start of an RPM?
pub fn is_rpm(bytes: &[u8]) -> bool {
    bytes.starts_with(&LEAD_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(signature_type: i16) -> Vec<u8> {
        let mut bytes = vec![0u8; LEAD_SIZE];
        bytes[..4].copy_from_slice(&LEAD_MAGIC);
        bytes[4] = 3;
        bytes[SIGNATURE_TYPE_OFFSET..SIGNATURE_TYPE_OFFSET + 2].copy_from_slice(&signature_type.to_be_bytes());
        bytes
    }

    #[test]
    fn test_parse_lead() {
        let parsed = Lead::parse(&lead(SIGNATURE_TYPE_HEADER)).unwrap();
        assert_eq!(parsed.major, 3);
        assert_eq!(parsed.kind, 0);
    }

    #[test]
    fn test_truncated_lead() {
        let bytes = lead(SIGNATURE_TYPE_HEADER);
        let err = Lead::parse(&bytes[..40]).unwrap_err();
        assert_eq!(
            *err,
            ErrorKind::Truncated {
                section: "lead",
                needed: LEAD_SIZE,
                available: 40
            }
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = lead(SIGNATURE_TYPE_HEADER);
        bytes[0] = 0x7f;
        assert_eq!(*Lead::parse(&bytes).unwrap_err(), ErrorKind::BadMagic("lead"));
        assert!(!is_rpm(&bytes));
    }

    #[test]
    fn test_old_signature_type() {
        let err = Lead::parse(&lead(1)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedSignature(1));
    }
}
