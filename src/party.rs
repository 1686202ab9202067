//! The three computing parties and the half of a share tuple each of them receives.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{codec::bytes_from_hex, error::FieldError};

/// One of the three computing parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The first party, receiving `(t1, s1)`.
    P1,
    /// The second party, receiving `(t2, s2)`.
    P2,
    /// The third party, receiving `(t3, s3)`.
    P3,
}

impl Party {
    /// All parties in order.
    pub const ALL: [Party; 3] = [Party::P1, Party::P2, Party::P3];

    /// The zero-based index of the party.
    pub fn index(self) -> usize {
        match self {
            Party::P1 => 0,
            Party::P2 => 1,
            Party::P3 => 2,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.index() + 1)
    }
}

/// The half of a share tuple held by a single party: its redundant value `t_i` and its own
/// component `s_i`, both hex encoded.
///
/// Renders as `"<t_i-hex> <s_i-hex>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyShare {
    /// The pairwise combination of two components.
    pub t: String,
    /// The party's own component.
    pub s: String,
}

impl PartyShare {
    /// Number of bytes encoded by both halves together.
    pub fn byte_len(&self) -> usize {
        (self.t.len() + self.s.len()) / 2
    }

    /// The raw bytes of both halves, `t` followed by `s`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FieldError> {
        let mut bytes = bytes_from_hex(&self.t)?;
        bytes.extend(bytes_from_hex(&self.s)?);
        Ok(bytes)
    }
}

impl fmt::Display for PartyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.t, self.s)
    }
}

impl FromStr for PartyShare {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((t, s)) = value.split_once(' ') else {
            return Err(FieldError::InvalidShare {
                reason: "expected two space separated hex values".into(),
            });
        };
        if t.is_empty() || t.len() != s.len() {
            return Err(FieldError::InvalidShare {
                reason: format!("halves of unequal length {} and {}", t.len(), s.len()),
            });
        }
        if !value.bytes().filter(|b| *b != b' ').all(|b| b.is_ascii_hexdigit()) {
            return Err(FieldError::InvalidShare {
                reason: "halves must be hex encoded".into(),
            });
        }
        if t.len() % 2 != 0 {
            return Err(FieldError::InvalidShare {
                reason: format!("hex value of odd length {}", t.len()),
            });
        }
        Ok(PartyShare {
            t: t.to_string(),
            s: s.to_string(),
        })
    }
}

/// Three components `s1, s2, s3` plus the redundant pairwise combinations `t1, t2, t3`.
///
/// Party `i` receives `(t_i, s_i)`, i.e. two of the three components, so that any two parties
/// together can reconstruct the value but no single party can.
pub trait ShareTuple {
    /// Hex encoding of the component `s` of the given party.
    fn s_hex(&self, party: Party) -> String;

    /// Hex encoding of the redundant value `t` of the given party.
    fn t_hex(&self, party: Party) -> String;

    /// The half of the tuple sent to `party`.
    fn party_share(&self, party: Party) -> PartyShare {
        PartyShare {
            t: self.t_hex(party),
            s: self.s_hex(party),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_share_roundtrip() {
        let share: PartyShare = "0a0b ffee".parse().unwrap();
        assert_eq!(share.t, "0a0b");
        assert_eq!(share.s, "ffee");
        assert_eq!(share.byte_len(), 4);
        assert_eq!(share.to_bytes().unwrap(), vec![0x0a, 0x0b, 0xff, 0xee]);
        assert_eq!(share.to_string(), "0a0b ffee");
    }

    #[test]
    fn malformed_shares_are_rejected() {
        for bad in ["", "0a0b", "0a0b ff", "0g0b ffee", "0a0 ffe", " ", "0a 0b 0c"] {
            assert!(bad.parse::<PartyShare>().is_err(), "{bad:?} was accepted");
        }
    }

    #[test]
    fn party_names() {
        let names: Vec<String> = Party::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, ["p1", "p2", "p3"]);
    }
}
