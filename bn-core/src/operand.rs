//! Operands as a dynamically typed caller passes them, and their coercion into
//! big-integer values.
use crate::{
    context::Context,
    error::{BnError, BN_TYPE},
    number::Number,
    value::Bn,
};
use num_bigint::{BigInt, BigUint, Sign};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Number(Number),
    Str(&'a str),
    Bn(&'a Bn),
    /// A host value of a type that cannot become a big integer, by type name.
    Other(&'static str),
}

impl<'a> Operand<'a> {
    pub fn type_name(&self) -> &'static str {
        match *self {
            Operand::Number(_) => "number",
            Operand::Str(_) => "string",
            Operand::Bn(_) => BN_TYPE,
            Operand::Other(name) => name,
        }
    }

    /// The big integer behind this operand if no conversion is needed.
    pub fn view(&self) -> Option<&'a Bn> {
        match *self {
            Operand::Bn(bn) => Some(bn),
            _ => None,
        }
    }

    /// Resolve to a big integer: borrowed for [`Operand::Bn`], freshly built otherwise.
    ///
    /// `arg` is the 1-based argument position reported in type errors.
    pub fn coerce(self, cx: &Context, arg: usize) -> Result<Cow<'a, Bn>, BnError> {
        match self {
            Operand::Bn(bn) => Ok(Cow::Borrowed(bn)),
            Operand::Number(n) => Ok(Cow::Owned(Bn::from(n.to_bigint(cx.wide_modulus())?))),
            Operand::Str(s) => Ok(Cow::Owned(Bn::from(parse_numeral(s)?))),
            Operand::Other(got) => Err(BnError::type_error(arg, got)),
        }
    }

    /// Like [`coerce`](Self::coerce), always producing a value the caller owns.
    pub fn materialize(self, cx: &Context, arg: usize) -> Result<Bn, BnError> {
        self.coerce(cx, arg).map(Cow::into_owned)
    }
}

/// Parse a decimal or hexadecimal numeral.
///
/// A leading `0` is skipped; if `x` or `X` follows, the rest is an unsigned hexadecimal
/// magnitude. Anything else is an optionally negative decimal. A sign is only accepted
/// on decimals, so `-0x10` is rejected while `-16` is not.
pub fn parse_numeral(text: &str) -> Result<BigInt, BnError> {
    let bytes = text.as_bytes();
    let skip = usize::from(bytes.first() == Some(&b'0'));
    let parsed = match bytes.get(skip) {
        Some(b'x') | Some(b'X') => digits(&bytes[skip + 1..], 16).map(|m| BigInt::from_biguint(Sign::Plus, m)),
        _ => {
            let (negative, rest) = match bytes.split_first() {
                Some((b'-', rest)) => (true, rest),
                _ => (false, bytes),
            };
            digits(rest, 10).map(|m| {
                let n = BigInt::from(m);
                if negative {
                    -n
                } else {
                    n
                }
            })
        }
    };
    parsed.ok_or_else(|| BnError::Parse(text.to_owned()))
}

fn digits(digits: &[u8], radix: u32) -> Option<BigUint> {
    if digits.is_empty() || !digits.iter().all(|d| char::from(*d).is_digit(radix)) {
        return None;
    }
    BigUint::parse_bytes(digits, radix)
}

impl From<Number> for Operand<'_> {
    fn from(n: Number) -> Self {
        Operand::Number(n)
    }
}

impl From<i32> for Operand<'_> {
    fn from(n: i32) -> Self {
        Operand::Number(Number::I32(n))
    }
}

impl From<i64> for Operand<'_> {
    fn from(n: i64) -> Self {
        Operand::Number(Number::I64(n))
    }
}

impl From<i128> for Operand<'_> {
    fn from(n: i128) -> Self {
        Operand::Number(Number::I128(n))
    }
}

impl From<f64> for Operand<'_> {
    fn from(d: f64) -> Self {
        Operand::Number(Number::F64(d))
    }
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(s: &'a str) -> Self {
        Operand::Str(s)
    }
}

impl<'a> From<&'a Bn> for Operand<'a> {
    fn from(bn: &'a Bn) -> Self {
        Operand::Bn(bn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Option<String> {
        parse_numeral(s).ok().map(|n| n.to_string())
    }

    #[test]
    fn decimals() {
        assert_eq!(parse("0"), Some("0".to_owned()));
        assert_eq!(parse("-0"), Some("0".to_owned()));
        assert_eq!(parse("007"), Some("7".to_owned()));
        assert_eq!(parse("-123456789012345678901234567890"), Some("-123456789012345678901234567890".to_owned()));
        assert_eq!(parse(""), None);
        assert_eq!(parse("-"), None);
        assert_eq!(parse("+5"), None);
        assert_eq!(parse("1_000"), None);
        assert_eq!(parse("12a"), None);
        assert_eq!(parse(" 12"), None);
    }

    #[test]
    fn hexadecimals() {
        assert_eq!(parse("0xFF"), Some("255".to_owned()));
        assert_eq!(parse("0XfF"), Some("255".to_owned()));
        assert_eq!(parse("xff"), Some("255".to_owned()));
        assert_eq!(parse("0x"), None);
        assert_eq!(parse("0xFG"), None);
        assert_eq!(parse("00xFF"), None);
    }

    #[test]
    fn hexadecimals_are_unsigned() {
        assert_eq!(parse("-0xFF"), None);
        assert_eq!(parse("0x-FF"), None);
        assert_eq!(parse("-255"), Some("-255".to_owned()));
    }

    #[test]
    fn coercion() {
        let cx = Context::new().unwrap();
        let bn = Bn::from(5);
        assert!(matches!(Operand::from(&bn).coerce(&cx, 1), Ok(Cow::Borrowed(_))));
        assert!(matches!(Operand::from(5i64).coerce(&cx, 1), Ok(Cow::Owned(_))));
        assert_eq!(Operand::from("0x10").materialize(&cx, 1).unwrap(), Bn::from(16));
        assert_eq!(
            Operand::Other("boolean").coerce(&cx, 3).unwrap_err(),
            BnError::Type {
                arg: 3,
                expected: "number, string or bn.number",
                got: "boolean"
            }
        );
        assert_eq!(
            Operand::from("1.5").coerce(&cx, 1).unwrap_err(),
            BnError::Parse("1.5".to_owned())
        );
    }
}
