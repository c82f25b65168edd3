use crate::module::Arity;
use derive_more::{Display, Error};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt::{self, Formatter},
};

/// Host type name of a big-integer value.
pub const BN_TYPE: &str = "bn.number";
/// What an operand position accepts.
pub const OPERAND_KINDS: &str = "number, string or bn.number";

/// Records kept per thread before the oldest is dropped.
const QUEUE_DEPTH: usize = 16;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum BnError {
    #[display(fmt = "bad argument #{} ({} expected, got {})", arg, expected, got)]
    Type {
        arg: usize,
        expected: &'static str,
        got: &'static str,
    },
    #[display(fmt = "cannot parse `{}` as {}", _0, BN_TYPE)]
    Parse(#[error(ignore)] String),
    #[display(fmt = "{}", message)]
    Arithmetic {
        message: String,
        reason: Option<Reason>,
    },
    #[display(fmt = "{}", message)]
    Resource {
        message: String,
        reason: Option<Reason>,
    },
    #[display(
        fmt = "wrong number of arguments: '{}' takes {} but {} were provided",
        name,
        expected,
        got
    )]
    Arity {
        name: String,
        expected: Arity,
        got: usize,
    },
    #[display(fmt = "undefined function '{}'", _0)]
    Undefined(#[error(ignore)] String),
}

impl BnError {
    pub(crate) fn type_error(arg: usize, got: &'static str) -> Self {
        Self::Type {
            arg,
            expected: OPERAND_KINDS,
            got,
        }
    }

    /// Raise an arithmetic failure that did not go through the queue.
    pub(crate) fn arithmetic(context: &str, reason: Reason) -> Self {
        Self::Arithmetic {
            message: format!("{}: {}", context, reason.as_str()),
            reason: Some(reason),
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            Self::Arithmetic { reason, .. } | Self::Resource { reason, .. } => *reason,
            _ => None,
        }
    }
}

/// Failure reasons reported by the primitive layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    MallocFailure,
    DivByZero,
    InvalidModulus,
    NegativeExponent,
    BignumTooLong,
    NotFinite,
}

impl Reason {
    pub fn code(self) -> u32 {
        match self {
            Reason::MallocFailure => 65,
            Reason::DivByZero => 103,
            Reason::InvalidModulus => 106,
            Reason::NegativeExponent => 109,
            Reason::BignumTooLong => 114,
            Reason::NotFinite => 117,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reason::MallocFailure => "malloc failure",
            Reason::DivByZero => "division by zero",
            Reason::InvalidModulus => "invalid modulus",
            Reason::NegativeExponent => "negative exponent",
            Reason::BignumTooLong => "bignum too long",
            Reason::NotFinite => "number is not finite",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the error queue: the reason and the primitive that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    pub reason: Reason,
    pub origin: &'static str,
}

thread_local! {
    static QUEUE: RefCell<VecDeque<ErrorRecord>> = RefCell::new(VecDeque::with_capacity(QUEUE_DEPTH));
}

/// The per-thread error queue of the primitive layer.
pub mod queue {
    use super::*;

    pub fn push(reason: Reason, origin: &'static str) {
        QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            if q.len() == QUEUE_DEPTH {
                q.pop_front();
            }
            q.push_back(ErrorRecord { reason, origin });
        })
    }

    /// Most recent record; the queue is empty afterwards.
    pub fn take_last() -> Option<ErrorRecord> {
        QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            let last = q.pop_back();
            q.clear();
            last
        })
    }

    pub fn clear() {
        QUEUE.with(|q| q.borrow_mut().clear())
    }

    pub fn len() -> usize {
        QUEUE.with(|q| q.borrow().len())
    }

    pub fn is_empty() -> bool {
        len() == 0
    }
}

/// How queued reasons are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Messages {
    /// "bn.div: division by zero"
    Strings,
    /// "bn.div: error code 103"
    Codes,
}

impl Messages {
    pub fn new(load_strings: bool) -> Self {
        if load_strings {
            Messages::Strings
        } else {
            Messages::Codes
        }
    }
}

fn describe(context: &str, messages: Messages) -> (String, Option<Reason>) {
    match (queue::take_last(), messages) {
        (Some(record), Messages::Strings) => (format!("{}: {}", context, record.reason), Some(record.reason)),
        (Some(record), Messages::Codes) => (
            format!("{}: error code {}", context, record.reason.code()),
            Some(record.reason),
        ),
        (None, _) => (context.to_owned(), None),
    }
}

/// Turn the last queued primitive failure into an [`BnError::Arithmetic`].
pub fn raise(context: &str, messages: Messages) -> BnError {
    let (message, reason) = describe(context, messages);
    BnError::Arithmetic { message, reason }
}

/// Like [`raise`], for failures to acquire memory or workspace.
pub fn raise_resource(context: &str, messages: Messages) -> BnError {
    let (message, reason) = describe(context, messages);
    BnError::Resource { message, reason }
}
