//! The primitives the dispatch layer needs from `num-bigint`.
//!
//! Every operation that can fail reports the reason on the thread's error queue and
//! returns [`Failed`]; the caller turns that into an error with [`raise`](crate::error::raise).
//! Multi-precision operations compute into frames of the [`Scratch`] workspace.
use crate::{
    error::{queue, Reason},
    number::Word,
    scratch::Scratch,
};
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::{borrow::Cow, cmp::Ordering, mem};

/// Marker for a failure whose reason is on the error queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Failed;

pub(crate) type Status<T> = Result<T, Failed>;

fn fail<T>(reason: Reason, origin: &'static str) -> Status<T> {
    queue::push(reason, origin);
    Err(Failed)
}

/// An argument of a primitive: borrowed from the caller, or owned by the call and
/// therefore available as storage for the result.
#[derive(Debug)]
pub(crate) enum Arg<'a> {
    Ref(&'a BigInt),
    Own(BigInt),
}

impl<'a> Arg<'a> {
    pub(crate) fn get(&self) -> &BigInt {
        match self {
            Arg::Ref(n) => *n,
            Arg::Own(n) => n,
        }
    }

    /// Storage for a result: the first owned argument, if any.
    fn target(a: Arg<'_>, b: Option<Arg<'_>>) -> Option<BigInt> {
        match (a, b) {
            (Arg::Own(n), _) | (_, Some(Arg::Own(n))) => Some(n),
            _ => None,
        }
    }
}

impl<'a> From<Cow<'a, crate::value::Bn>> for Arg<'a> {
    fn from(bn: Cow<'a, crate::value::Bn>) -> Self {
        match bn {
            Cow::Borrowed(bn) => Arg::Ref(bn.bigint()),
            Cow::Owned(bn) => Arg::Own(bn.into_bigint()),
        }
    }
}

/// Copy the result in a workspace slot into the allocation of `target`, or move it
/// out of the slot when there is no target.
fn deliver(target: Option<BigInt>, slot: &mut BigInt) -> BigInt {
    match target {
        Some(mut target) => {
            target.clone_from(slot);
            target
        }
        None => mem::take(slot),
    }
}

pub(crate) fn add_word(r: &mut BigInt, w: Word) {
    *r += w;
}

pub(crate) fn sub_word(r: &mut BigInt, w: Word) {
    *r -= w;
}

pub(crate) fn mul_word(r: &mut BigInt, w: Word) {
    *r *= w;
}

/// Divide the magnitude of `r` by `w` in place, keeping its sign; returns the
/// remainder of the magnitude.
pub(crate) fn div_word(r: &mut BigInt, w: Word) -> Status<Word> {
    if w == 0 {
        return fail(Reason::DivByZero, "div_word");
    }
    let (q, rem) = r.magnitude().div_rem(&w.into());
    *r = BigInt::from_biguint(r.sign(), q);
    Ok(rem.to_u64().unwrap_or_default())
}

/// Remainder of the magnitude of `a` divided by `w`.
pub(crate) fn mod_word(a: &BigInt, w: Word) -> Status<Word> {
    if w == 0 {
        return fail(Reason::DivByZero, "mod_word");
    }
    Ok((a.magnitude() % w).to_u64().unwrap_or_default())
}

/// Whether the magnitude of `a` equals `w`.
pub(crate) fn is_word(a: &BigInt, w: Word) -> bool {
    a.magnitude().to_u64() == Some(w)
}

pub(crate) fn add(a: Arg<'_>, b: Arg<'_>) -> BigInt {
    match (a, b) {
        (Arg::Own(x), Arg::Own(y)) => x + y,
        (Arg::Own(x), Arg::Ref(y)) => x + y,
        (Arg::Ref(x), Arg::Own(y)) => x + y,
        (Arg::Ref(x), Arg::Ref(y)) => x + y,
    }
}

pub(crate) fn sub(a: Arg<'_>, b: Arg<'_>) -> BigInt {
    match (a, b) {
        (Arg::Own(x), Arg::Own(y)) => x - y,
        (Arg::Own(x), Arg::Ref(y)) => x - y,
        (Arg::Ref(x), Arg::Own(y)) => x - y,
        (Arg::Ref(x), Arg::Ref(y)) => x - y,
    }
}

pub(crate) fn mul(a: Arg<'_>, b: Arg<'_>, scratch: &mut Scratch) -> BigInt {
    scratch.frame(1, |t| {
        t[0] = a.get() * b.get();
        deliver(Arg::target(a, Some(b)), &mut t[0])
    })
}

pub(crate) fn sqr(a: Arg<'_>, scratch: &mut Scratch) -> BigInt {
    scratch.frame(1, |t| {
        t[0] = BigInt::from_biguint(Sign::Plus, a.get().magnitude() * a.get().magnitude());
        deliver(Arg::target(a, None), &mut t[0])
    })
}

/// Non-negative greatest common divisor.
pub(crate) fn gcd(a: Arg<'_>, b: Arg<'_>, scratch: &mut Scratch) -> BigInt {
    scratch.frame(1, |t| {
        t[0] = a.get().gcd(b.get());
        deliver(Arg::target(a, Some(b)), &mut t[0])
    })
}

/// Truncating quotient.
pub(crate) fn div(a: &BigInt, b: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    if b.is_zero() {
        return fail(Reason::DivByZero, "div");
    }
    scratch.frame(2, |t| {
        let (q, r) = a.div_rem(b);
        t[0] = q;
        t[1] = r;
        Ok(mem::take(&mut t[0]))
    })
}

/// Remainder of truncating division, signed like `a`.
pub(crate) fn rem(a: &BigInt, b: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    if b.is_zero() {
        return fail(Reason::DivByZero, "rem");
    }
    scratch.frame(2, |t| {
        let (q, r) = a.div_rem(b);
        t[0] = q;
        t[1] = r;
        Ok(mem::take(&mut t[1]))
    })
}

fn check_modulus(m: &BigInt, origin: &'static str) -> Status<()> {
    if m.is_zero() {
        fail(Reason::DivByZero, origin)
    } else if m.is_negative() {
        fail(Reason::InvalidModulus, origin)
    } else {
        Ok(())
    }
}

/// `a mod m` in `[0, m)`.
pub(crate) fn nnmod(a: &BigInt, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "nnmod")?;
    scratch.frame(1, |t| {
        t[0] = a.mod_floor(m);
        Ok(mem::take(&mut t[0]))
    })
}

pub(crate) fn mod_add(a: &BigInt, b: &BigInt, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "mod_add")?;
    scratch.frame(2, |t| {
        t[0].clone_from(a);
        t[0] += b;
        t[1] = t[0].mod_floor(m);
        Ok(mem::take(&mut t[1]))
    })
}

pub(crate) fn mod_sub(a: &BigInt, b: &BigInt, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "mod_sub")?;
    scratch.frame(2, |t| {
        t[0].clone_from(a);
        t[0] -= b;
        t[1] = t[0].mod_floor(m);
        Ok(mem::take(&mut t[1]))
    })
}

pub(crate) fn mod_mul(a: Arg<'_>, b: Arg<'_>, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "mod_mul")?;
    scratch.frame(2, |t| {
        t[0] = a.get() * b.get();
        t[1] = t[0].mod_floor(m);
        Ok(deliver(Arg::target(a, Some(b)), &mut t[1]))
    })
}

pub(crate) fn mod_sqr(a: &BigInt, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "mod_sqr")?;
    scratch.frame(2, |t| {
        t[0] = BigInt::from_biguint(Sign::Plus, a.magnitude() * a.magnitude());
        t[1] = t[0].mod_floor(m);
        Ok(mem::take(&mut t[1]))
    })
}

/// `a^e mod m` in `[0, m)`.
pub(crate) fn mod_exp(a: &BigInt, e: &BigInt, m: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    check_modulus(m, "mod_exp")?;
    if e.is_negative() {
        return fail(Reason::NegativeExponent, "mod_exp");
    }
    scratch.frame(2, |t| {
        t[0] = a.mod_floor(m);
        t[1] = t[0].modpow(e, m);
        Ok(mem::take(&mut t[1]))
    })
}

/// `a^e` for a non-negative exponent.
pub(crate) fn exp(a: &BigInt, e: &BigInt, scratch: &mut Scratch) -> Status<BigInt> {
    if e.is_negative() {
        return fail(Reason::NegativeExponent, "exp");
    }
    scratch.frame(1, |t| {
        t[0] = match e.to_u32() {
            Some(e) => a.pow(e),
            // only 0, 1 and -1 have powers this large that fit in memory
            None if a.is_zero() || a.magnitude().is_one() => {
                if a.is_negative() && e.is_odd() {
                    a.clone()
                } else {
                    a.abs()
                }
            }
            None => return fail(Reason::BignumTooLong, "exp"),
        };
        Ok(mem::take(&mut t[0]))
    })
}

pub(crate) fn cmp(a: &BigInt, b: &BigInt) -> Ordering {
    a.cmp(b)
}

pub(crate) fn ucmp(a: &BigInt, b: &BigInt) -> Ordering {
    a.magnitude().cmp(b.magnitude())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{raise, Messages};
    use pretty_assertions::assert_eq;

    fn n(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn word_division_keeps_the_sign() {
        let mut r = n(-17);
        assert_eq!(div_word(&mut r, 5), Ok(2));
        assert_eq!(r, n(-3));
        assert_eq!(mod_word(&n(-17), 5), Ok(2));
    }

    #[test]
    fn division_by_zero_is_queued() {
        queue::clear();
        let mut scratch = Scratch::new(1).unwrap();
        assert_eq!(div(&n(1), &n(0), &mut scratch), Err(Failed));
        assert_eq!(raise("bn.div", Messages::Strings).to_string(), "bn.div: division by zero");
        assert_eq!(div_word(&mut n(1), 0), Err(Failed));
        assert_eq!(queue::len(), 1);
    }

    #[test]
    fn results_reuse_owned_arguments() {
        let mut scratch = Scratch::new(1).unwrap();
        let big = n(i64::MAX) * n(i64::MAX);
        let product = mul(Arg::Own(big.clone()), Arg::Ref(&n(3)), &mut scratch);
        assert_eq!(product, &big * 3);
        assert_eq!(mul(Arg::Ref(&n(3)), Arg::Own(-big.clone()), &mut scratch), &big * -3);
        // a longer target shrinks to the result and takes its sign
        assert_eq!(mul(Arg::Own(-big.clone()), Arg::Ref(&n(0)), &mut scratch), n(0));
        assert_eq!(sqr(Arg::Own(-big.clone()), &mut scratch), &big * &big);
        assert_eq!(sqr(Arg::Ref(&n(-12)), &mut scratch), n(144));
        assert_eq!(gcd(Arg::Ref(&n(-12)), Arg::Own(n(18)), &mut scratch), n(6));
        assert_eq!(gcd(Arg::Own(-big.clone()), Arg::Own(n(-7)), &mut scratch), n(7));
        assert_eq!(mod_mul(Arg::Own(-big), Arg::Ref(&n(1)), &n(10), &mut scratch), Ok(n(1)));
    }

    #[test]
    fn moduli_must_be_positive() {
        let mut scratch = Scratch::new(1).unwrap();
        queue::clear();
        assert_eq!(nnmod(&n(5), &n(-3), &mut scratch), Err(Failed));
        assert_eq!(queue::take_last().map(|r| r.reason), Some(Reason::InvalidModulus));
        assert_eq!(mod_exp(&n(5), &n(2), &n(0), &mut scratch), Err(Failed));
        assert_eq!(queue::take_last().map(|r| r.reason), Some(Reason::DivByZero));
        assert_eq!(nnmod(&n(-5), &n(3), &mut scratch), Ok(n(1)));
        assert_eq!(mod_sub(&n(2), &n(5), &n(7), &mut scratch), Ok(n(4)));
        assert_eq!(mod_exp(&n(-2), &n(3), &n(7), &mut scratch), Ok(n(6)));
    }

    #[test]
    fn huge_exponents() {
        let mut scratch = Scratch::new(1).unwrap();
        let e = n(1) << 40usize;
        let odd = &e + 1;
        assert_eq!(exp(&n(-1), &odd, &mut scratch), Ok(n(-1)));
        assert_eq!(exp(&n(-1), &e, &mut scratch), Ok(n(1)));
        assert_eq!(exp(&n(0), &e, &mut scratch), Ok(n(0)));
        queue::clear();
        assert_eq!(exp(&n(2), &e, &mut scratch), Err(Failed));
        assert_eq!(queue::take_last().map(|r| r.reason), Some(Reason::BignumTooLong));
        assert_eq!(exp(&n(2), &n(-1), &mut scratch), Err(Failed));
        assert_eq!(exp(&n(-3), &n(3), &mut scratch), Ok(n(-27)));
    }

    #[test]
    fn unsigned_compare() {
        assert_eq!(ucmp(&n(-5), &n(3)), Ordering::Greater);
        assert_eq!(cmp(&n(-5), &n(3)), Ordering::Less);
    }
}
