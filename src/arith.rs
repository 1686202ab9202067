//! Additive replicated sharing of fixed-point numbers over the ring of integers mod 2^64.
//!
//! A decimal value `v` is encoded as `trunc(v * 2^precision)` in two's complement and split
//! into `s1 + s2 + s3 = num (mod 2^64)` with `s1` and `s2` drawn uniformly from the field.
//! All arithmetic wraps explicitly, so shares are bit-exact across implementations.
use rand::{CryptoRng, Rng};

use crate::{
    error::FieldError,
    party::{Party, ShareTuple},
};

/// Digits beyond this many leading zeros of a fraction are below the finest fixed-point step.
const MAX_FRACTION_ZEROS: usize = 64;
/// Integer parts longer than this many digits never fit into the field.
const MAX_INTEGER_DIGITS: usize = 39;

/// Encodes a decimal string as a fixed-point integer with `precision_bits` fractional bits.
///
/// Accepts an optional sign, integer and fractional digits and an optional exponent
/// (`"-12.5"`, `".25"`, `"3e2"`). The scaled value is truncated toward zero and must lie in
/// `[-2^63, 2^64)`; negative values are returned in two's complement.
pub fn encode_fixed_point(text: &str, precision_bits: u32) -> Result<u64, FieldError> {
    let invalid = || FieldError::SchemaMismatch {
        reason: format!("'{text}' is not a decimal number"),
    };
    let overflow = || FieldError::EncodingOverflow {
        value: text.to_string(),
    };

    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (number, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let (int_digits, frac_digits) = number.split_once('.').unwrap_or((number, ""));
    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(invalid());
    }
    let digits: Vec<u8> = int_digits.bytes().chain(frac_digits.bytes()).collect();
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let digits: Vec<u8> = digits.into_iter().map(|b| b - b'0').collect();
    if digits.iter().all(|d| *d == 0) {
        return match exponent {
            Some(e) if !is_signed_digits(e) => Err(invalid()),
            _ => Ok(0),
        };
    }

    // position of the decimal point within `digits`, after applying the exponent
    let mut point = int_digits.len() as i128;
    if let Some(exponent) = exponent {
        if !is_signed_digits(exponent) {
            return Err(invalid());
        }
        let shift: i128 = match exponent.parse::<i64>() {
            Ok(e) => e.into(),
            Err(_) if exponent.starts_with('-') => i64::MIN.into(),
            Err(_) => i64::MAX.into(),
        };
        point += shift;
    }

    let len = digits.len() as i128;
    let (int_part, frac_part): (Vec<u8>, Vec<u8>) = if point <= 0 {
        if -point > MAX_FRACTION_ZEROS as i128 {
            (vec![], vec![])
        } else {
            let zeros = vec![0; (-point) as usize];
            (vec![], zeros.into_iter().chain(digits).collect())
        }
    } else if point >= len {
        if point - len > MAX_INTEGER_DIGITS as i128 {
            return Err(overflow());
        }
        let zeros = vec![0; (point - len) as usize];
        (digits.into_iter().chain(zeros).collect(), vec![])
    } else {
        let (int_part, frac_part) = digits.split_at(point as usize);
        (int_part.to_vec(), frac_part.to_vec())
    };

    let int_part: Vec<u8> = int_part.into_iter().skip_while(|d| *d == 0).collect();
    if int_part.len() > MAX_INTEGER_DIGITS {
        return Err(overflow());
    }
    let mut integer: u128 = 0;
    for d in int_part {
        integer = integer
            .checked_mul(10)
            .and_then(|i| i.checked_add(u128::from(d)))
            .ok_or_else(overflow)?;
    }
    let magnitude = integer
        .checked_mul(1u128 << precision_bits)
        .and_then(|i| i.checked_add(u128::from(fraction_bits(frac_part, precision_bits))))
        .ok_or_else(overflow)?;

    if negative {
        if magnitude > 1u128 << 63 {
            return Err(overflow());
        }
        Ok((magnitude as u64).wrapping_neg())
    } else {
        u64::try_from(magnitude).map_err(|_| overflow())
    }
}

/// `floor(0.d1 d2 d3... * 2^bits)`, computed by repeatedly doubling the decimal fraction and
/// collecting the carried-out integer bit.
fn fraction_bits(mut digits: Vec<u8>, bits: u32) -> u64 {
    let mut out = 0u64;
    for _ in 0..bits {
        let mut carry = 0;
        for d in digits.iter_mut().rev() {
            let doubled = *d * 2 + carry;
            *d = doubled % 10;
            carry = doubled / 10;
        }
        out = (out << 1) | u64::from(carry);
    }
    out
}

fn is_signed_digits(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Interprets a field element as a two's complement fixed-point number.
pub fn decode_fixed_point(num: u64, precision_bits: u32) -> f64 {
    (num as i64) as f64 / (1u64 << precision_bits) as f64
}

/// An additive replicated sharing of a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithShares {
    s: [u64; 3],
    t: [u64; 3],
}

impl ArithShares {
    /// Shares `num`, drawing `s1` and `s2` uniformly from `[0, 2^64)`.
    pub fn new<R: CryptoRng + ?Sized>(num: u64, rng: &mut R) -> Self {
        let s1 = rng.random();
        let s2 = rng.random();
        Self::from_components(num, s1, s2)
    }

    /// Shares `num` with the given random components `s1` and `s2`.
    pub fn from_components(num: u64, s1: u64, s2: u64) -> Self {
        let s3 = num.wrapping_sub(s1).wrapping_sub(s2);
        Self {
            s: [s1, s2, s3],
            t: [s1.wrapping_add(s3), s1.wrapping_add(s2), s2.wrapping_add(s3)],
        }
    }

    /// The components `[s1, s2, s3]`.
    pub fn components(&self) -> [u64; 3] {
        self.s
    }

    /// The redundant values `[t1, t2, t3]` with `t1 = s1 + s3`, `t2 = s1 + s2`, `t3 = s2 + s3`.
    pub fn redundant(&self) -> [u64; 3] {
        self.t
    }

    /// The shared value `s1 + s2 + s3 (mod 2^64)`.
    pub fn reconstruct(&self) -> u64 {
        self.s.iter().fold(0, |acc, s| acc.wrapping_add(*s))
    }
}

impl ShareTuple for ArithShares {
    fn s_hex(&self, party: Party) -> String {
        format!("{:016x}", self.s[party.index()])
    }

    fn t_hex(&self, party: Party) -> String {
        format!("{:016x}", self.t[party.index()])
    }
}
