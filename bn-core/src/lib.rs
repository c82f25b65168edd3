//! Arbitrary-precision integers for dynamically typed callers.
//!
//! Operands arrive as host numbers, numeric strings or existing [`Bn`] values. A
//! [`Context`] coerces them, picks a word-sized fast path where one operand allows it,
//! and lends its scratch workspace to the multi-precision primitives otherwise.
//!
//! ```
//! use bn_core::{Context, Operand};
//!
//! let mut cx = Context::new()?;
//! let ff = cx.number(Operand::from("0xFF"))?;
//! let r = cx.add(Operand::Bn(&ff), Operand::from(-1i64))?;
//! assert_eq!(r.to_string(), "254");
//! # Ok::<(), bn_core::BnError>(())
//! ```
pub mod config;
pub mod context;
pub mod error;
mod eval;
pub mod module;
pub mod number;
pub mod operand;
mod prim;
pub mod scratch;
pub mod value;

pub use config::Config;
pub use context::{Context, Shared};
pub use error::{BnError, Reason};
pub use module::{Module, Value};
pub use number::{Number, NumberKind, Word};
pub use operand::Operand;
pub use value::Bn;
