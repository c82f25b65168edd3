use crate::{
    config::Config,
    error::{self, BnError, Messages},
    operand::parse_numeral,
    prim,
    scratch::{Scratch, ScratchStats},
};
use num_bigint::BigInt;
use parking_lot::Mutex;
use std::{cell::RefCell, sync::Arc};
use tracing::debug;

/// An engine context: the scratch workspace plus the constants it caches.
///
/// A context is used by one thread at a time. Hosts with several threads either wrap
/// it in [`Shared`] or keep one per thread with [`Context::with_thread_local`].
#[derive(Debug)]
pub struct Context {
    scratch: Scratch,
    wide_modulus: BigInt,
    config: Config,
}

impl Context {
    pub fn new() -> Result<Self, BnError> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, BnError> {
        let messages = Messages::new(config.load_error_strings);
        let scratch = Scratch::new(config.scratch_slots)
            .map_err(|_| error::raise_resource("bn: scratch workspace", messages))?;
        let wide_modulus = wide_modulus()?;
        debug!(
            scratch_slots = config.scratch_slots,
            number_kind = %config.number_kind,
            "bn context initialised"
        );
        Ok(Self {
            scratch,
            wide_modulus,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lend the scratch workspace to `f`.
    pub fn with_scratch<R>(&mut self, f: impl FnOnce(&mut Scratch) -> R) -> R {
        f(&mut self.scratch)
    }

    pub fn scratch_stats(&self) -> ScratchStats {
        self.scratch.stats()
    }

    /// The last queued primitive failure as an error, worded as configured. The
    /// wording follows the context, whichever thread it runs on.
    pub(crate) fn raise(&self, context: &str) -> BnError {
        error::raise(context, Messages::new(self.config.load_error_strings))
    }

    /// `2^128`, the correction for negative 128-bit host numbers.
    pub(crate) fn wide_modulus(&self) -> &BigInt {
        &self.wide_modulus
    }

    pub fn into_shared(self) -> Shared {
        Shared(Arc::new(Mutex::new(self)))
    }

    /// Run `f` with this thread's context, creating it with the default
    /// configuration on first use. Not reentrant.
    pub fn with_thread_local<R>(f: impl FnOnce(&mut Context) -> R) -> Result<R, BnError> {
        thread_local! {
            static LOCAL: RefCell<Option<Context>> = RefCell::new(None);
        }
        LOCAL.with(|cell| {
            let mut slot = cell.borrow_mut();
            let cx = match slot.take() {
                Some(cx) => cx,
                None => Context::new()?,
            };
            Ok(f(slot.insert(cx)))
        })
    }
}

/// 2^128 does not fit a word, so it is built from the decimal text of 2^128 - 1.
fn wide_modulus() -> Result<BigInt, BnError> {
    let mut m = parse_numeral(&u128::MAX.to_string()).map_err(|_| BnError::Resource {
        message: "bn: cannot build the 128-bit modulus".to_owned(),
        reason: None,
    })?;
    prim::add_word(&mut m, 1);
    Ok(m)
}

/// A context behind a mutex, for hosts that call in from several threads.
#[derive(Debug, Clone)]
pub struct Shared(Arc<Mutex<Context>>);

impl Shared {
    pub fn with<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        f(&mut self.0.lock())
    }
}
