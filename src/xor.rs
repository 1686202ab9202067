//! Byte-wise replicated XOR sharing of arbitrary byte strings.
use rand::{CryptoRng, RngCore};

use crate::{
    codec::hex_of,
    party::{Party, ShareTuple},
    utils::xor_inplace,
};

/// A replicated XOR sharing of a byte string.
///
/// All six components have the length of the shared bytes, except for the empty string, which
/// is shared as a single zero byte in every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteShares {
    s: [Vec<u8>; 3],
    t: [Vec<u8>; 3],
}

impl ByteShares {
    /// Shares `plaintext`, drawing `s1` and `s2` as uniformly random byte strings.
    pub fn new<R: CryptoRng + ?Sized>(plaintext: &[u8], rng: &mut R) -> Self {
        if plaintext.is_empty() {
            return Self::empty();
        }
        let mut s1 = vec![0; plaintext.len()];
        let mut s2 = vec![0; plaintext.len()];
        rng.fill_bytes(&mut s1);
        rng.fill_bytes(&mut s2);
        Self::from_components(plaintext, s1, s2)
    }

    /// Shares `plaintext` with the given random components, which must have its length.
    pub(crate) fn from_components(plaintext: &[u8], s1: Vec<u8>, s2: Vec<u8>) -> Self {
        debug_assert_eq!(plaintext.len(), s1.len());
        debug_assert_eq!(plaintext.len(), s2.len());
        let mut s3 = plaintext.to_vec();
        xor_inplace(&mut s3, &s1);
        xor_inplace(&mut s3, &s2);
        let t1 = xor(&s1, &s3);
        let t2 = xor(&s1, &s2);
        let t3 = xor(&s2, &s3);
        Self {
            s: [s1, s2, s3],
            t: [t1, t2, t3],
        }
    }

    /// The degenerate sharing of the empty string: `00` everywhere.
    pub fn empty() -> Self {
        let zero = vec![0u8];
        Self {
            s: [zero.clone(), zero.clone(), zero.clone()],
            t: [zero.clone(), zero.clone(), zero],
        }
    }

    /// The components `[s1, s2, s3]`.
    pub fn components(&self) -> &[Vec<u8>; 3] {
        &self.s
    }

    /// The redundant values `[t1, t2, t3]` with `t1 = s1 ^ s3`, `t2 = s1 ^ s2`, `t3 = s2 ^ s3`.
    pub fn redundant(&self) -> &[Vec<u8>; 3] {
        &self.t
    }

    /// The shared bytes `s1 ^ s2 ^ s3`.
    pub fn reconstruct(&self) -> Vec<u8> {
        let [s1, s2, s3] = &self.s;
        let mut plaintext = s1.clone();
        xor_inplace(&mut plaintext, s2);
        xor_inplace(&mut plaintext, s3);
        plaintext
    }
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = a.to_vec();
    xor_inplace(&mut out, b);
    out
}

impl ShareTuple for ByteShares {
    fn s_hex(&self, party: Party) -> String {
        hex_of(&self.s[party.index()])
    }

    fn t_hex(&self, party: Party) -> String {
        hex_of(&self.t[party.index()])
    }
}
