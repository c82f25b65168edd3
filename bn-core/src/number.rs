//! Host numbers and their exact conversion into big integers.
//!
//! A host number of width `W` is read as the `W`-bit two's-complement pattern of its
//! integral part, accumulated 32 bits at a time, and corrected by `2^W` when negative.
//! No step goes through text.
use crate::{
    error::{BnError, Reason},
    prim,
};
use derive_more::Display;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// The native unsigned width of the primitive layer.
pub type Word = u64;
pub const WORD_BITS: u32 = Word::BITS;

const LIMB_BITS: u32 = 32;
const LIMB_MASK: u128 = 0xffff_ffff;
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const MANTISSA_BITS: u32 = 52;
const EXPONENT_BIAS: i32 = 1023;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    #[display(fmt = "i32")]
    I32,
    #[display(fmt = "i64")]
    I64,
    #[display(fmt = "i128")]
    I128,
    #[default]
    #[display(fmt = "f64")]
    F64,
}

impl NumberKind {
    /// Bits of the two's-complement pattern the conversion reads.
    pub fn width(self) -> u32 {
        match self {
            NumberKind::I32 => 32,
            NumberKind::I64 | NumberKind::F64 => 64,
            NumberKind::I128 => 128,
        }
    }
}

impl FromStr for NumberKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i32" => Ok(NumberKind::I32),
            "i64" => Ok(NumberKind::I64),
            "i128" => Ok(NumberKind::I128),
            "f64" => Ok(NumberKind::F64),
            _ => anyhow::bail!("unknown number kind `{}` (expected i32, i64, i128 or f64)", s),
        }
    }
}

/// A number as the host hands it over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    I32(i32),
    I64(i64),
    I128(i128),
    F64(f64),
}

impl Number {
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::I32(_) => NumberKind::I32,
            Number::I64(_) => NumberKind::I64,
            Number::I128(_) => NumberKind::I128,
            Number::F64(_) => NumberKind::F64,
        }
    }

    pub fn width(&self) -> u32 {
        self.kind().width()
    }

    pub fn is_negative(&self) -> bool {
        match *self {
            Number::I32(n) => n < 0,
            Number::I64(n) => n < 0,
            Number::I128(n) => n < 0,
            Number::F64(d) => d < 0.0,
        }
    }

    pub fn is_positive(&self) -> bool {
        match *self {
            Number::I32(n) => n > 0,
            Number::I64(n) => n > 0,
            Number::I128(n) => n > 0,
            Number::F64(d) => d > 0.0,
        }
    }

    /// The absolute value if it fits a [`Word`] exactly.
    pub fn try_small(&self) -> Option<Word> {
        match *self {
            Number::I32(n) => Some(n.unsigned_abs().into()),
            Number::I64(n) => Some(n.unsigned_abs()),
            Number::I128(n) => Word::try_from(n.unsigned_abs()).ok(),
            Number::F64(d) => {
                let abs = d.abs();
                if abs.is_finite() && abs.fract() == 0.0 && abs < TWO_POW_64 {
                    Some(abs as Word)
                } else {
                    None
                }
            }
        }
    }

    /// The `W`-bit two's-complement pattern of the integral part.
    ///
    /// `None` for floats outside the signed 64-bit range, which take the
    /// mantissa/exponent route instead.
    fn bit_pattern(&self) -> Option<u128> {
        match *self {
            Number::I32(n) => Some(n as u32 as u128),
            Number::I64(n) => Some(n as u64 as u128),
            Number::I128(n) => Some(n as u128),
            Number::F64(d) if d.trunc().abs() < TWO_POW_63 => Some(d.trunc() as i64 as u64 as u128),
            Number::F64(_) => None,
        }
    }

    /// Exact conversion; `wide_modulus` is `2^128` as cached by the context.
    pub(crate) fn to_bigint(&self, wide_modulus: &BigInt) -> Result<BigInt, BnError> {
        if let Number::F64(d) = *self {
            if !d.is_finite() {
                return Err(BnError::arithmetic("bn.number", Reason::NotFinite));
            }
        }
        let width = self.width();
        let bits = match self.bit_pattern() {
            Some(bits) => bits,
            None => return Ok(self.float_to_bigint()),
        };
        let mut acc = accumulate_limbs(bits, width);
        if (bits >> (width - 1)) & 1 == 1 {
            match width.cmp(&WORD_BITS) {
                Ordering::Less => prim::sub_word(&mut acc, 1 << width),
                Ordering::Equal => {
                    prim::sub_word(&mut acc, 1);
                    prim::sub_word(&mut acc, Word::MAX);
                }
                Ordering::Greater => {
                    debug_assert_eq!(wide_modulus.bits(), u64::from(width) + 1);
                    acc -= wide_modulus;
                }
            }
        }
        Ok(acc)
    }

    /// Floats of magnitude `2^63` and above, from the binary decomposition.
    fn float_to_bigint(&self) -> BigInt {
        let d = match *self {
            Number::F64(d) => d,
            _ => return BigInt::zero(),
        };
        let raw = d.to_bits();
        let exponent = ((raw >> MANTISSA_BITS) & 0x7ff) as i32;
        let mantissa = (raw & ((1 << MANTISSA_BITS) - 1)) | (1 << MANTISSA_BITS);
        // always at least 11 here, the value is an integer
        let shift = exponent - EXPONENT_BIAS - MANTISSA_BITS as i32;
        let mut acc = accumulate_limbs(mantissa.into(), WORD_BITS);
        acc <<= shift as usize;
        if d < 0.0 {
            -acc
        } else {
            acc
        }
    }

    /// The host number of `kind` equal to `n`, if there is one.
    pub fn from_bigint(n: &BigInt, kind: NumberKind) -> Option<Number> {
        match kind {
            NumberKind::I32 => n.to_i32().map(Number::I32),
            NumberKind::I64 => n.to_i64().map(Number::I64),
            NumberKind::I128 => n.to_i128().map(Number::I128),
            NumberKind::F64 => n
                .to_f64()
                .filter(|d| d.is_finite() && BigInt::from_f64(*d).as_ref() == Some(n))
                .map(Number::F64),
        }
    }

    /// Read a host numeric literal; text that does not look numeric is not a number.
    pub fn parse(text: &str, kind: NumberKind) -> Option<Number> {
        let numeric = text.bytes().any(|c| c.is_ascii_digit())
            && text
                .bytes()
                .all(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E'));
        if !numeric {
            return None;
        }
        match kind {
            NumberKind::I32 => text.parse().ok().map(Number::I32),
            NumberKind::I64 => text.parse().ok().map(Number::I64),
            NumberKind::I128 => text.parse().ok().map(Number::I128),
            NumberKind::F64 => text.parse().ok().map(Number::F64),
        }
    }
}

fn accumulate_limbs(bits: u128, width: u32) -> BigInt {
    let mut acc = BigInt::zero();
    for i in (0..(width + LIMB_BITS - 1) / LIMB_BITS).rev() {
        let limb = ((bits >> (LIMB_BITS * i)) & LIMB_MASK) as u32;
        if !acc.is_zero() {
            acc <<= LIMB_BITS as usize;
            acc += limb;
        } else if limb != 0 {
            acc = BigInt::from(limb);
        }
    }
    acc
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I32(n) => write!(f, "{}", n),
            Number::I64(n) => write!(f, "{}", n),
            Number::I128(n) => write!(f, "{}", n),
            Number::F64(d) => write!(f, "{}", d),
        }
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::I32(n)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::I64(n)
    }
}

impl From<i128> for Number {
    fn from(n: i128) -> Self {
        Number::I128(n)
    }
}

impl From<f64> for Number {
    fn from(d: f64) -> Self {
        Number::F64(d)
    }
}
