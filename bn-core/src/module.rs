//! A small dynamically typed host around the engine.
//!
//! Values are passed by handle, big integers are shared with reference identity, and
//! operations are looked up by name in a function, method or metamethod table, the way
//! a scripting language binding exposes them.
use crate::{
    config::Config,
    context::Context,
    error::{BnError, BN_TYPE},
    number::{Number, NumberKind},
    operand::Operand,
    value::Bn,
};
use std::{
    cell::{Ref, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

/// A shared handle to a big integer.
#[derive(Debug, Clone)]
pub struct BnRef(Rc<RefCell<Bn>>);

impl BnRef {
    pub fn new(bn: Bn) -> Self {
        Self(Rc::new(RefCell::new(bn)))
    }

    pub fn borrow(&self) -> Ref<'_, Bn> {
        self.0.borrow()
    }

    pub fn ptr_eq(&self, other: &BnRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(Number),
    Str(String),
    Bytes(Vec<u8>),
    Bn(BnRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Bn(_) => BN_TYPE,
        }
    }

    pub fn as_bn(&self) -> Option<&BnRef> {
        match self {
            Value::Bn(bn) => Some(bn),
            _ => None,
        }
    }

    /// A host literal: a number of `kind` if it reads as one, text otherwise.
    pub fn from_literal(text: &str, kind: NumberKind) -> Value {
        match Number::parse(text, kind) {
            Some(n) => Value::Number(n),
            None => Value::Str(text.to_owned()),
        }
    }
}

impl From<Bn> for Value {
    fn from(bn: Bn) -> Self {
        Value::Bn(BnRef::new(bn))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<Ordering> for Value {
    fn from(o: Ordering) -> Self {
        Value::Number(Number::I64(o as i64))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => b.iter().try_for_each(|byte| write!(f, "{:02x}", byte)),
            Value::Bn(bn) => write!(f, "{}", bn.borrow()),
        }
    }
}

/// How many arguments a function takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(1) => f.write_str("1 argument"),
            Arity::Exactly(n) => write!(f, "{} arguments", n),
            Arity::Between(lo, hi) => write!(f, "{} or {} arguments", lo, hi),
        }
    }
}

impl Arity {
    fn check(self, name: &str, got: usize) -> Result<(), BnError> {
        let ok = match self {
            Arity::Exactly(n) => got == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&got),
        };
        if ok {
            Ok(())
        } else {
            Err(BnError::Arity {
                name: name.to_owned(),
                expected: self,
                got,
            })
        }
    }
}

type OperandFn = fn(&mut Context, &[Operand<'_>]) -> Result<Value, BnError>;
type ValueFn = fn(&mut Context, &[Value]) -> Result<Value, BnError>;

#[derive(Clone, Copy)]
enum Call {
    /// Works on coerced operands.
    Operands(OperandFn),
    /// Needs the handles themselves.
    Values(ValueFn),
}

#[derive(Clone, Copy)]
struct Builtin {
    arity: Arity,
    call: Call,
}

macro_rules! table {
    ($($name:literal => $arity:expr, $kind:ident($f:expr);)*) => {
        BTreeMap::from([
            $(($name, Builtin { arity: $arity, call: Call::$kind($f) }),)*
        ])
    };
}

fn functions() -> BTreeMap<&'static str, Builtin> {
    use Arity::*;
    table! {
        "add" => Exactly(2), Operands(|cx, a| cx.add(a[0], a[1]).map(Value::from));
        "sub" => Exactly(2), Operands(|cx, a| cx.sub(a[0], a[1]).map(Value::from));
        "mul" => Exactly(2), Operands(|cx, a| cx.mul(a[0], a[1]).map(Value::from));
        "div" => Exactly(2), Operands(|cx, a| cx.div(a[0], a[1]).map(Value::from));
        "mod" => Exactly(2), Operands(|cx, a| cx.modulo(a[0], a[1]).map(Value::from));
        "gcd" => Exactly(2), Operands(|cx, a| cx.gcd(a[0], a[1]).map(Value::from));
        "cmp" => Exactly(2), Operands(|cx, a| cx.cmp(a[0], a[1]).map(Value::from));
        "ucmp" => Exactly(2), Operands(|cx, a| cx.ucmp(a[0], a[1]).map(Value::from));
        "eq" => Exactly(2), Operands(|cx, a| cx.eq(a[0], a[1]).map(Value::from));
        "lt" => Exactly(2), Operands(|cx, a| cx.lt(a[0], a[1]).map(Value::from));
        "le" => Exactly(2), Operands(|cx, a| cx.le(a[0], a[1]).map(Value::from));
        "isneg" => Exactly(1), Operands(|cx, a| cx.is_neg(a[0]).map(Value::from));
        "iseven" => Exactly(1), Operands(|cx, a| cx.is_even(a[0]).map(Value::from));
        "isodd" => Exactly(1), Operands(|cx, a| cx.is_odd(a[0]).map(Value::from));
        "isone" => Exactly(1), Operands(|cx, a| cx.is_one(a[0]).map(Value::from));
        "iszero" => Exactly(1), Operands(|cx, a| cx.is_zero(a[0]).map(Value::from));
        "modadd" => Exactly(3), Operands(|cx, a| cx.modadd(a[0], a[1], a[2]).map(Value::from));
        "modsub" => Exactly(3), Operands(|cx, a| cx.modsub(a[0], a[1], a[2]).map(Value::from));
        "modmul" => Exactly(3), Operands(|cx, a| cx.modmul(a[0], a[1], a[2]).map(Value::from));
        "modpow" => Exactly(3), Operands(|cx, a| cx.modpow(a[0], a[1], a[2]).map(Value::from));
        "modsqr" => Exactly(2), Operands(|cx, a| cx.modsqr(a[0], a[1]).map(Value::from));
        "nnmod" => Exactly(2), Operands(|cx, a| cx.nnmod(a[0], a[1]).map(Value::from));
        "pow" => Between(2, 3), Operands(|cx, a| cx.pow(a[0], a[1], a.get(2).copied()).map(Value::from));
        "sqr" => Exactly(1), Operands(|cx, a| cx.sqr(a[0]).map(Value::from));
        "neg" => Exactly(1), Operands(|cx, a| cx.neg(a[0]).map(Value::from));
        "number" => Exactly(1), Values(number);
        "swap" => Exactly(2), Values(swap);
        "tostring" => Exactly(1), Values(tostring);
        "tobin" => Exactly(1), Values(tobin);
    }
}

fn metamethods() -> BTreeMap<&'static str, Builtin> {
    use Arity::*;
    table! {
        "__add" => Exactly(2), Operands(|cx, a| cx.add(a[0], a[1]).map(Value::from));
        "__sub" => Exactly(2), Operands(|cx, a| cx.sub(a[0], a[1]).map(Value::from));
        "__mul" => Exactly(2), Operands(|cx, a| cx.mul(a[0], a[1]).map(Value::from));
        "__div" => Exactly(2), Operands(|cx, a| cx.div(a[0], a[1]).map(Value::from));
        "__mod" => Exactly(2), Operands(|cx, a| cx.modulo(a[0], a[1]).map(Value::from));
        "__pow" => Exactly(2), Operands(|cx, a| cx.pow(a[0], a[1], None).map(Value::from));
        "__unm" => Exactly(1), Operands(|cx, a| cx.neg(a[0]).map(Value::from));
        "__eq" => Exactly(2), Values(|cx, v| compare_bns(v, |x, y| cx.eq(x, y)));
        "__lt" => Exactly(2), Values(|cx, v| compare_bns(v, |x, y| cx.lt(x, y)));
        "__le" => Exactly(2), Values(|cx, v| compare_bns(v, |x, y| cx.le(x, y)));
        "__tostring" => Exactly(1), Values(tostring);
    }
}

fn check_bn(v: &Value, arg: usize) -> Result<&BnRef, BnError> {
    v.as_bn().ok_or(BnError::Type {
        arg,
        expected: BN_TYPE,
        got: v.type_name(),
    })
}

fn compare_bns(
    v: &[Value],
    f: impl FnOnce(Operand<'_>, Operand<'_>) -> Result<bool, BnError>,
) -> Result<Value, BnError> {
    let (x, y) = (check_bn(&v[0], 1)?.borrow(), check_bn(&v[1], 2)?.borrow());
    f(Operand::Bn(&x), Operand::Bn(&y)).map(Value::from)
}

fn number(cx: &mut Context, v: &[Value]) -> Result<Value, BnError> {
    if let Value::Bn(bn) = &v[0] {
        return Ok(Value::Bn(bn.clone()));
    }
    with_operands(v, |ops| ops[0].materialize(cx, 1)).map(Value::from)
}

/// Exchange the contents of two values; aliases of either see the exchange.
fn swap(_: &mut Context, v: &[Value]) -> Result<Value, BnError> {
    let (a, b) = (check_bn(&v[0], 1)?, check_bn(&v[1], 2)?);
    if !a.ptr_eq(b) {
        a.0.borrow_mut().swap(&mut b.0.borrow_mut());
    }
    Ok(Value::Nil)
}

fn tostring(_: &mut Context, v: &[Value]) -> Result<Value, BnError> {
    let bn = check_bn(&v[0], 1)?;
    let text = bn.0.borrow_mut().tostring_with(|s| Ok::<_, BnError>(s.to_owned()))?;
    Ok(Value::Str(text))
}

fn tobin(cx: &mut Context, v: &[Value]) -> Result<Value, BnError> {
    let bn = check_bn(&v[0], 1)?;
    let bytes = cx.tobin(&mut bn.0.borrow_mut(), |b| Ok::<_, BnError>(b.to_vec()))?;
    Ok(Value::Bytes(bytes))
}

/// Present `values` as operands to `f`, holding shared borrows of the big integers
/// among them for the duration of the call.
fn with_operands<R>(values: &[Value], f: impl FnOnce(&[Operand<'_>]) -> R) -> R {
    let guards = values
        .iter()
        .map(|v| v.as_bn().map(BnRef::borrow))
        .collect::<Vec<_>>();
    let ops = values
        .iter()
        .zip(&guards)
        .map(|(v, guard)| match (v, guard) {
            (_, Some(bn)) => Operand::Bn(&**bn),
            (Value::Number(n), None) => Operand::Number(*n),
            (Value::Str(s), None) => Operand::Str(s),
            (other, None) => Operand::Other(other.type_name()),
        })
        .collect::<Vec<_>>();
    f(&ops)
}

fn invoke(cx: &mut Context, name: &str, builtin: Builtin, args: &[Value]) -> Result<Value, BnError> {
    builtin.arity.check(name, args.len())?;
    match builtin.call {
        Call::Operands(f) => with_operands(args, |ops| f(cx, ops)),
        Call::Values(f) => f(cx, args),
    }
}

/// The engine as a host sees it: a context and the tables of callable names.
pub struct Module {
    cx: Context,
    functions: BTreeMap<&'static str, Builtin>,
    metamethods: BTreeMap<&'static str, Builtin>,
}

impl Module {
    pub fn new(config: Config) -> Result<Self, BnError> {
        Ok(Self {
            cx: Context::with_config(config)?,
            functions: functions(),
            metamethods: metamethods(),
        })
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.cx
    }

    pub fn function_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    /// Turn a host literal into a value, as configured by `number_kind`.
    pub fn literal(&self, text: &str) -> Value {
        Value::from_literal(text, self.cx.config().number_kind)
    }

    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, BnError> {
        let builtin = *self
            .functions
            .get(name)
            .ok_or_else(|| BnError::Undefined(name.to_owned()))?;
        invoke(&mut self.cx, name, builtin, args)
    }

    /// Call `name` with `receiver` as its first argument; `number` is not a method.
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> Result<Value, BnError> {
        check_bn(receiver, 1)?;
        let builtin = match self.functions.get(name) {
            Some(builtin) if name != "number" => *builtin,
            _ => return Err(BnError::Undefined(name.to_owned())),
        };
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(receiver.clone());
        all.extend_from_slice(args);
        invoke(&mut self.cx, name, builtin, &all)
    }

    pub fn call_meta(&mut self, name: &str, args: &[Value]) -> Result<Value, BnError> {
        let builtin = *self
            .metamethods
            .get(name)
            .ok_or_else(|| BnError::Undefined(name.to_owned()))?;
        invoke(&mut self.cx, name, builtin, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spectral::prelude::*;

    fn module() -> Module {
        Module::new(Config::default()).unwrap()
    }

    fn bn(m: &mut Module, s: &str) -> Value {
        m.call("number", &[Value::from(s)]).unwrap()
    }

    #[test]
    fn hex_round_trip() {
        let mut m = module();
        let x = bn(&mut m, "0xFF");
        let y = m.call("add", &[x.clone(), m.literal("-1")]).unwrap();
        assert_eq!(m.call("tostring", &[y]).unwrap().to_string(), "254");
        assert_eq!(x.to_string(), "255");
    }

    #[test]
    fn number_returns_the_same_handle() {
        let mut m = module();
        let x = bn(&mut m, "42");
        let y = m.call("number", &[x.clone()]).unwrap();
        assert!(x.as_bn().unwrap().ptr_eq(y.as_bn().unwrap()));
    }

    #[test]
    fn swap_is_seen_through_aliases() {
        let mut m = module();
        let a = bn(&mut m, "1");
        let b = bn(&mut m, "2");
        let alias = a.clone();
        assert!(matches!(m.call("swap", &[a.clone(), b.clone()]), Ok(Value::Nil)));
        assert_eq!(alias.to_string(), "2");
        assert_eq!(b.to_string(), "1");
        m.call("swap", &[a.clone(), alias]).unwrap();
        assert_eq!(a.to_string(), "2");
    }

    #[test]
    fn same_value_on_both_sides() {
        let mut m = module();
        let a = bn(&mut m, "-7");
        assert_eq!(m.call("mul", &[a.clone(), a.clone()]).unwrap().to_string(), "49");
        assert_eq!(m.call("sub", &[a.clone(), a.clone()]).unwrap().to_string(), "0");
    }

    #[test]
    fn tobin_drops_the_sign() {
        let mut m = module();
        let a = bn(&mut m, "-4660");
        assert!(matches!(m.call("tobin", &[a.clone()]), Ok(Value::Bytes(b)) if b == vec![0x12, 0x34]));
        let zero = bn(&mut m, "0");
        assert_eq!(m.call("tobin", &[zero]).unwrap().to_string(), "");
        assert_eq!(a.to_string(), "-4660");
    }

    #[test]
    fn arity_and_names() {
        let mut m = module();
        assert_eq!(
            m.call("add", &[Value::from("1")]).unwrap_err().to_string(),
            "wrong number of arguments: 'add' takes 2 arguments but 1 were provided"
        );
        assert_eq!(
            m.call("pow", &[Value::from("1")]).unwrap_err().to_string(),
            "wrong number of arguments: 'pow' takes 2 or 3 arguments but 1 were provided"
        );
        assert_eq!(
            m.call("frobnicate", &[]).unwrap_err(),
            BnError::Undefined("frobnicate".to_owned())
        );
        assert_that(&m.function_names().count()).is_equal_to(29);
    }

    #[test]
    fn methods_take_the_receiver_first() {
        let mut m = module();
        let a = bn(&mut m, "10");
        let r = m.call_method(&a, "sub", &[Value::Number(Number::I64(3))]).unwrap();
        assert_eq!(r.to_string(), "7");
        assert_eq!(
            m.call_method(&Value::from("10"), "sub", &[]).unwrap_err().to_string(),
            "bad argument #1 (bn.number expected, got string)"
        );
        assert!(matches!(m.call_method(&a, "number", &[]), Err(BnError::Undefined(_))));
    }

    #[test]
    fn metamethod_table() {
        let mut m = module();
        let a = bn(&mut m, "5");
        let b = bn(&mut m, "7");
        assert_eq!(m.call_meta("__lt", &[a.clone(), b.clone()]).unwrap().to_string(), "true");
        assert_eq!(m.call_meta("__le", &[b.clone(), a.clone()]).unwrap().to_string(), "false");
        assert_eq!(m.call_meta("__eq", &[a.clone(), a.clone()]).unwrap().to_string(), "true");
        assert_eq!(m.call_meta("__unm", &[a.clone()]).unwrap().to_string(), "-5");
        assert_eq!(m.call_meta("__pow", &[a.clone(), Value::from("3")]).unwrap().to_string(), "125");
        assert_eq!(m.call_meta("__tostring", &[b.clone()]).unwrap().to_string(), "7");
        let err = m.call_meta("__eq", &[a, Value::from("5")]).unwrap_err();
        assert_eq!(
            err,
            BnError::Type {
                arg: 2,
                expected: BN_TYPE,
                got: "string"
            }
        );
    }

    #[test]
    fn results_of_each_kind() {
        let mut m = module();
        let x = bn(&mut m, "-4660");
        assert_eq!(m.call("tobin", &[x.clone()]).unwrap().to_string(), "1234");
        assert_eq!(m.call("cmp", &[x.clone(), Value::from("0")]).unwrap().to_string(), "-1");
        assert_eq!(m.call("isneg", &[x]).unwrap().to_string(), "true");
        assert!(matches!(m.call("tostring", &[Value::Bool(true)]), Err(BnError::Type { arg: 1, .. })));
        assert!(matches!(
            m.call("add", &[Value::Nil, Value::from("1")]),
            Err(BnError::Type { arg: 1, got: "nil", .. })
        ));
        assert!(matches!(m.call("number", &[Value::from("-0x10")]), Err(BnError::Parse(_))));
    }
}
