//! Operator dispatch.
//!
//! Each operation resolves its operands once. A big-integer operand paired with a host
//! number that fits a [`Word`] takes the word path; everything else is coerced and goes
//! through the generic multi-precision primitive. Coercion allocates only for operands
//! that are not already big integers, and such transient values may become the storage
//! of the result.
use crate::{
    context::Context,
    error::BnError,
    number::{Number, Word},
    operand::Operand,
    prim::{self, Arg},
    value::Bn,
};
use num_bigint::BigInt;
use std::{borrow::Cow, cmp::Ordering};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddSub {
    Add,
    Sub,
}

/// A host number eligible for the word path, with its magnitude.
fn word_operand(op: Operand<'_>) -> Option<(Number, Word)> {
    match op {
        Operand::Number(d) => d.try_small().map(|n| (d, n)),
        _ => None,
    }
}

fn add_sub_word(x: &Bn, d: Number, n: Word, op: AddSub, number_first: bool) -> Bn {
    let mut r = x.bigint().clone();
    let adds = match op {
        AddSub::Add => d.is_positive(),
        AddSub::Sub => d.is_negative(),
    };
    if adds {
        prim::add_word(&mut r, n);
    } else {
        prim::sub_word(&mut r, n);
    }
    if op == AddSub::Sub && number_first {
        r = -r;
    }
    Bn::from(r)
}

fn mul_word(x: &Bn, d: Number, n: Word) -> Bn {
    let mut r = x.bigint().clone();
    if d.is_negative() {
        r = -r;
    }
    prim::mul_word(&mut r, n);
    Bn::from(r)
}

fn eq_word(x: &Bn, d: Number, n: Word) -> bool {
    x.is_negative() == d.is_negative() && prim::is_word(x.bigint(), n)
}

/// The host number of a big integer paired with one, in either position.
fn mixed<'a>(a: Operand<'a>, b: Operand<'a>) -> Option<(&'a Bn, Number, Word, bool)> {
    match (a.view(), b.view()) {
        (Some(x), None) => word_operand(b).map(|(d, n)| (x, d, n, false)),
        (None, Some(y)) => word_operand(a).map(|(d, n)| (y, d, n, true)),
        _ => None,
    }
}

impl Context {
    /// Coerce any operand into a big integer; big integers come back as they are.
    pub fn number<'a>(&self, a: Operand<'a>) -> Result<Cow<'a, Bn>, BnError> {
        a.coerce(self, 1)
    }

    fn operands<'a>(&self, a: Operand<'a>, b: Operand<'a>) -> Result<(Cow<'a, Bn>, Cow<'a, Bn>), BnError> {
        Ok((a.coerce(self, 1)?, b.coerce(self, 2)?))
    }

    fn operands3<'a>(
        &self,
        a: Operand<'a>,
        b: Operand<'a>,
        m: Operand<'a>,
    ) -> Result<(Cow<'a, Bn>, Cow<'a, Bn>, Cow<'a, Bn>), BnError> {
        Ok((a.coerce(self, 1)?, b.coerce(self, 2)?, m.coerce(self, 3)?))
    }

    pub fn add(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        self.add_sub(a, b, AddSub::Add)
    }

    pub fn sub(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        self.add_sub(a, b, AddSub::Sub)
    }

    fn add_sub(&mut self, a: Operand<'_>, b: Operand<'_>, op: AddSub) -> Result<Bn, BnError> {
        if let Some((x, d, n, number_first)) = mixed(a, b) {
            trace!(?op, "word path");
            return Ok(add_sub_word(x, d, n, op, number_first));
        }
        let (x, y) = self.operands(a, b)?;
        let reuse = matches!(x, Cow::Owned(_)) || matches!(y, Cow::Owned(_));
        trace!(?op, reuse, "generic path");
        let r = match op {
            AddSub::Add => prim::add(x.into(), y.into()),
            AddSub::Sub => prim::sub(x.into(), y.into()),
        };
        Ok(Bn::from(r))
    }

    pub fn mul(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        if let Some((x, d, n, _)) = mixed(a, b) {
            trace!("mul: word path");
            return Ok(mul_word(x, d, n));
        }
        let (x, y) = self.operands(a, b)?;
        trace!("mul: generic path");
        Ok(Bn::from(self.with_scratch(|s| prim::mul(x.into(), y.into(), s))))
    }

    /// Truncating division.
    pub fn div(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        let x = a.coerce(self, 1)?;
        if let Some((d, n)) = word_operand(b) {
            trace!("div: word path");
            let mut q = x.into_owned().into_bigint();
            if d.is_negative() {
                q = -q;
            }
            prim::div_word(&mut q, n).map_err(|_| self.raise("bn.div"))?;
            return Ok(Bn::from(q));
        }
        let y = b.coerce(self, 2)?;
        trace!("div: generic path");
        let q = self
            .with_scratch(|s| prim::div(x.bigint(), y.bigint(), s))
            .map_err(|_| self.raise("bn.div"))?;
        Ok(Bn::from(q))
    }

    /// Remainder of truncating division; its sign follows the dividend.
    pub fn modulo(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        let x = a.coerce(self, 1)?;
        if let Some((_, n)) = word_operand(b) {
            trace!("mod: word path");
            let rem = prim::mod_word(x.bigint(), n).map_err(|_| self.raise("bn.mod"))?;
            debug_assert!(rem < n);
            let rem = BigInt::from(rem);
            return Ok(Bn::from(if x.is_negative() { -rem } else { rem }));
        }
        let y = b.coerce(self, 2)?;
        trace!("mod: generic path");
        let r = self
            .with_scratch(|s| prim::rem(x.bigint(), y.bigint(), s))
            .map_err(|_| self.raise("bn.mod"))?;
        Ok(Bn::from(r))
    }

    pub fn gcd(&mut self, a: Operand<'_>, b: Operand<'_>) -> Result<Bn, BnError> {
        let (x, y) = self.operands(a, b)?;
        Ok(Bn::from(self.with_scratch(|s| prim::gcd(x.into(), y.into(), s))))
    }

    pub fn cmp(&self, a: Operand<'_>, b: Operand<'_>) -> Result<Ordering, BnError> {
        let (x, y) = self.operands(a, b)?;
        Ok(prim::cmp(x.bigint(), y.bigint()))
    }

    /// Compare magnitudes.
    pub fn ucmp(&self, a: Operand<'_>, b: Operand<'_>) -> Result<Ordering, BnError> {
        let (x, y) = self.operands(a, b)?;
        Ok(prim::ucmp(x.bigint(), y.bigint()))
    }

    pub fn eq(&self, a: Operand<'_>, b: Operand<'_>) -> Result<bool, BnError> {
        if let Some((x, d, n, _)) = mixed(a, b) {
            return Ok(eq_word(x, d, n));
        }
        Ok(self.cmp(a, b)? == Ordering::Equal)
    }

    pub fn lt(&self, a: Operand<'_>, b: Operand<'_>) -> Result<bool, BnError> {
        Ok(self.cmp(a, b)? == Ordering::Less)
    }

    pub fn le(&self, a: Operand<'_>, b: Operand<'_>) -> Result<bool, BnError> {
        Ok(self.cmp(a, b)? != Ordering::Greater)
    }

    pub fn is_neg(&self, a: Operand<'_>) -> Result<bool, BnError> {
        Ok(a.coerce(self, 1)?.is_negative())
    }

    pub fn is_even(&self, a: Operand<'_>) -> Result<bool, BnError> {
        Ok(a.coerce(self, 1)?.is_even())
    }

    pub fn is_odd(&self, a: Operand<'_>) -> Result<bool, BnError> {
        Ok(a.coerce(self, 1)?.is_odd())
    }

    pub fn is_one(&self, a: Operand<'_>) -> Result<bool, BnError> {
        Ok(a.coerce(self, 1)?.is_one())
    }

    pub fn is_zero(&self, a: Operand<'_>) -> Result<bool, BnError> {
        Ok(a.coerce(self, 1)?.is_zero())
    }

    pub fn neg(&self, a: Operand<'_>) -> Result<Bn, BnError> {
        Ok(match a.coerce(self, 1)? {
            Cow::Borrowed(x) => x.negated(),
            Cow::Owned(x) => Bn::from(-x.into_bigint()),
        })
    }

    pub fn sqr(&mut self, a: Operand<'_>) -> Result<Bn, BnError> {
        let x = a.coerce(self, 1)?;
        Ok(Bn::from(self.with_scratch(|s| prim::sqr(x.into(), s))))
    }

    /// `a^e`, reduced modulo `m` when one is given.
    pub fn pow(&mut self, a: Operand<'_>, e: Operand<'_>, m: Option<Operand<'_>>) -> Result<Bn, BnError> {
        if let Some(m) = m {
            return self.modpow(a, e, m);
        }
        let (x, e) = self.operands(a, e)?;
        let r = self
            .with_scratch(|s| prim::exp(x.bigint(), e.bigint(), s))
            .map_err(|_| self.raise("bn.pow"))?;
        Ok(Bn::from(r))
    }

    pub fn modpow(&mut self, a: Operand<'_>, e: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, e, m) = self.operands3(a, e, m)?;
        let r = self
            .with_scratch(|s| prim::mod_exp(x.bigint(), e.bigint(), m.bigint(), s))
            .map_err(|_| self.raise("bn.modpow"))?;
        Ok(Bn::from(r))
    }

    pub fn modadd(&mut self, a: Operand<'_>, b: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, y, m) = self.operands3(a, b, m)?;
        let r = self
            .with_scratch(|s| prim::mod_add(x.bigint(), y.bigint(), m.bigint(), s))
            .map_err(|_| self.raise("bn.modadd"))?;
        Ok(Bn::from(r))
    }

    pub fn modsub(&mut self, a: Operand<'_>, b: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, y, m) = self.operands3(a, b, m)?;
        let r = self
            .with_scratch(|s| prim::mod_sub(x.bigint(), y.bigint(), m.bigint(), s))
            .map_err(|_| self.raise("bn.modsub"))?;
        Ok(Bn::from(r))
    }

    pub fn modmul(&mut self, a: Operand<'_>, b: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, y, m) = self.operands3(a, b, m)?;
        let r = self
            .with_scratch(|s| prim::mod_mul(Arg::from(x), Arg::from(y), m.bigint(), s))
            .map_err(|_| self.raise("bn.modmul"))?;
        Ok(Bn::from(r))
    }

    pub fn modsqr(&mut self, a: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, m) = self.operands(a, m)?;
        let r = self
            .with_scratch(|s| prim::mod_sqr(x.bigint(), m.bigint(), s))
            .map_err(|_| self.raise("bn.modsqr"))?;
        Ok(Bn::from(r))
    }

    /// `a mod m` in `[0, m)`.
    pub fn nnmod(&mut self, a: Operand<'_>, m: Operand<'_>) -> Result<Bn, BnError> {
        let (x, m) = self.operands(a, m)?;
        let r = self
            .with_scratch(|s| prim::nnmod(x.bigint(), m.bigint(), s))
            .map_err(|_| self.raise("bn.nnmod"))?;
        Ok(Bn::from(r))
    }

    /// Hand the binary encoding of `bn` to `sink`, inline or through its pending buffer
    /// depending on the configured threshold.
    pub fn tobin<R, E>(&self, bn: &mut Bn, sink: impl FnOnce(&[u8]) -> Result<R, E>) -> Result<R, E> {
        bn.tobin_with(self.config().inline_bin_bytes, sink)
    }
}
