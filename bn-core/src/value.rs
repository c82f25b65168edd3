use crate::{
    error::BnError,
    number::{Number, NumberKind},
    operand::parse_numeral,
};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use smallvec::SmallVec;
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    mem,
    str::FromStr,
};

/// Size of the local encoding buffer. Encodings below the `tobin` threshold but longer
/// than this still take the local path; the buffer then spills to the heap.
const INLINE_CAPACITY: usize = 64;

/// An arbitrary-precision signed integer.
///
/// Besides the number it carries a slot for a rendered representation that is being
/// handed to the host. The slot is only ever filled for the duration of a hand-off.
#[derive(Debug, Default)]
pub struct Bn {
    num: BigInt,
    pending: Option<Pending>,
}

#[derive(Debug)]
enum Pending {
    Text(String),
    Bytes(Vec<u8>),
}

/// Empties the pending slot when the hand-off is over, however it ends.
struct PendingGuard<'a> {
    slot: &'a mut Option<Pending>,
}

impl<'a> PendingGuard<'a> {
    fn hold(slot: &'a mut Option<Pending>, pending: Pending) -> Self {
        *slot = Some(pending);
        Self { slot }
    }

    fn text(&self) -> &str {
        match self.slot.as_ref() {
            Some(Pending::Text(s)) => s,
            _ => "",
        }
    }

    fn bytes(&self) -> &[u8] {
        match self.slot.as_ref() {
            Some(Pending::Bytes(b)) => b,
            _ => &[],
        }
    }
}

impl<'a> Drop for PendingGuard<'a> {
    fn drop(&mut self) {
        self.slot.take();
    }
}

impl Bn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bigint(&self) -> &BigInt {
        &self.num
    }

    pub fn into_bigint(mut self) -> BigInt {
        mem::take(&mut self.num)
    }

    pub fn is_negative(&self) -> bool {
        self.num.is_negative()
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.num.is_one()
    }

    pub fn is_even(&self) -> bool {
        self.num.is_even()
    }

    pub fn is_odd(&self) -> bool {
        self.num.is_odd()
    }

    pub fn negated(&self) -> Bn {
        Bn::from(-&self.num)
    }

    /// Exchange the numbers of two values; each keeps its identity.
    pub fn swap(&mut self, other: &mut Bn) {
        mem::swap(&mut self.num, &mut other.num);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hand the decimal representation to `sink`.
    pub fn tostring_with<R, E>(&mut self, sink: impl FnOnce(&str) -> Result<R, E>) -> Result<R, E> {
        let text = self.num.to_str_radix(10);
        let guard = PendingGuard::hold(&mut self.pending, Pending::Text(text));
        sink(guard.text())
    }

    /// Hand the big-endian magnitude to `sink`.
    ///
    /// Encodings longer than `inline_limit` bytes are held in the pending slot during
    /// the hand-off, shorter ones in a local buffer.
    pub fn tobin_with<R, E>(
        &mut self,
        inline_limit: usize,
        sink: impl FnOnce(&[u8]) -> Result<R, E>,
    ) -> Result<R, E> {
        let len = self.num_bytes();
        if len <= inline_limit {
            let mut buf = SmallVec::<[u8; INLINE_CAPACITY]>::new();
            for digit in self.num.iter_u64_digits().rev() {
                buf.extend_from_slice(&digit.to_be_bytes());
            }
            // drop the leading zero bytes of the top digit
            sink(&buf[buf.len() - len..])
        } else {
            let bytes = self.num.magnitude().to_bytes_be();
            let guard = PendingGuard::hold(&mut self.pending, Pending::Bytes(bytes));
            sink(guard.bytes())
        }
    }

    /// Big-endian magnitude; the sign is not encoded and zero has no bytes.
    pub fn to_bin(&self) -> Vec<u8> {
        if self.num.is_zero() {
            vec![]
        } else {
            self.num.magnitude().to_bytes_be()
        }
    }

    pub fn num_bytes(&self) -> usize {
        ((self.num.bits() + 7) / 8) as usize
    }

    /// The host number of `kind` equal to this value, if there is one.
    pub fn to_number(&self, kind: NumberKind) -> Option<Number> {
        Number::from_bigint(&self.num, kind)
    }
}

impl Clone for Bn {
    fn clone(&self) -> Self {
        Bn::from(self.num.clone())
    }
}

impl Drop for Bn {
    fn drop(&mut self) {
        if self.pending.take().is_some() {
            tracing::warn!("bn.number dropped during a hand-off");
        }
    }
}

impl From<BigInt> for Bn {
    fn from(num: BigInt) -> Self {
        Self { num, pending: None }
    }
}

macro_rules! from_primitive {
    ($($t:ty),*) => {
        $(impl From<$t> for Bn {
            fn from(n: $t) -> Self {
                Bn::from(BigInt::from(n))
            }
        })*
    };
}

from_primitive!(i32, i64, u64, i128);

impl FromStr for Bn {
    type Err = BnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeral(s).map(Bn::from)
    }
}

impl PartialEq for Bn {
    fn eq(&self, other: &Self) -> bool {
        self.num == other.num
    }
}

impl Eq for Bn {}

impl PartialOrd for Bn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num.cmp(&other.num)
    }
}

impl Display for Bn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spectral::prelude::*;

    #[test]
    fn tostring_clears_the_slot() {
        let mut bn = Bn::from(-1234);
        let s = bn.tostring_with(|s| Ok::<_, ()>(s.to_owned()));
        assert_eq!(s, Ok("-1234".to_owned()));
        assert_that(&bn.has_pending()).is_false();
    }

    #[test]
    fn failing_sink_clears_the_slot() {
        let mut bn: Bn = "123456789012345678901234567890".parse().unwrap();
        let res: Result<(), &str> = bn.tostring_with(|_| Err("host refused"));
        assert_eq!(res, Err("host refused"));
        assert_that(&bn.has_pending()).is_false();

        let res: Result<(), &str> = bn.tobin_with(0, |bytes| {
            assert_that(&bytes.len()).is_equal_to(13);
            Err("host refused")
        });
        assert_eq!(res, Err("host refused"));
        assert_that(&bn.has_pending()).is_false();
    }

    #[test]
    fn panicking_sink_clears_the_slot() {
        let mut bn = Bn::from(99);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = bn.tostring_with(|_| -> Result<(), ()> { panic!("sink blew up") });
        }));
        assert!(res.is_err());
        assert_that(&bn.has_pending()).is_false();
    }

    #[test]
    fn binary_encoding() {
        assert_eq!(Bn::from(0).to_bin(), Vec::<u8>::new());
        assert_eq!(Bn::from(-255).to_bin(), vec![0xff]);
        assert_eq!(Bn::from(0x1234).to_bin(), vec![0x12, 0x34]);
        let mut zero = Bn::new();
        let len = zero.tobin_with(16, |b| Ok::<_, ()>(b.len()));
        assert_eq!(len, Ok(0));
        let big: Bn = "0x0102030405060708090a".parse().unwrap();
        for limit in [0, 4, 1024] {
            let mut big = big.clone();
            let bytes = big.tobin_with(limit, |b| Ok::<_, ()>(b.to_vec())).unwrap();
            assert_eq!(bytes, (1..=10).collect::<Vec<u8>>());
        }
    }

    #[test]
    fn local_encodings_past_the_inline_capacity() {
        for len in [INLINE_CAPACITY - 1, INLINE_CAPACITY, INLINE_CAPACITY + 1, 100] {
            let expected = (0..len).map(|i| (i % 251 + 1) as u8).collect::<Vec<u8>>();
            let mut bn = Bn::from(BigInt::from_bytes_be(num_bigint::Sign::Minus, &expected));
            let bytes = bn.tobin_with(1024, |b| Ok::<_, ()>(b.to_vec())).unwrap();
            assert_eq!(bytes, expected);
            assert_that(&bn.has_pending()).is_false();
        }
    }

    #[test]
    fn swap_keeps_identity() {
        let mut a = Bn::from(1);
        let mut b = Bn::from(-2);
        a.swap(&mut b);
        assert_eq!((a.to_string(), b.to_string()), ("-2".to_owned(), "1".to_owned()));
    }

    #[test]
    fn predicates() {
        let n = Bn::from(-3);
        assert_that(&n.is_negative()).is_true();
        assert_that(&n.is_odd()).is_true();
        assert_that(&n.is_even()).is_false();
        assert_that(&Bn::new().is_zero()).is_true();
        assert_that(&Bn::new().is_negative()).is_false();
        assert_that(&Bn::from(1).is_one()).is_true();
        assert_that(&Bn::from(-1).is_one()).is_false();
        assert_that(&Bn::from(0).negated().is_negative()).is_false();
    }

    #[test]
    fn to_number() {
        assert_eq!(Bn::from(i64::MIN).to_number(NumberKind::I64), Some(Number::I64(i64::MIN)));
        assert_eq!(Bn::from(i64::MIN).to_number(NumberKind::I32), None);
    }
}
