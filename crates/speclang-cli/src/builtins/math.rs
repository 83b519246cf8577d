//! `std.math`: integer arithmetic is checked; mixing in a float yields a
//! float.

use std::cmp::Ordering;

use super::{int, list, one, three, two, Handler};
use crate::error::EvalError;
use crate::eval::Interp;
use crate::value::{compare_values, Value};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("std.math.add", add),
    ("std.math.sub", sub),
    ("std.math.mul", mul),
    ("std.math.div", div),
    ("std.math.mod", modulo),
    ("std.math.pow", pow),
    ("std.math.abs", abs),
    ("std.math.negate", negate),
    ("std.math.inc", inc),
    ("std.math.dec", dec),
    ("std.math.clamp", clamp),
    ("std.math.round", round),
    ("std.math.floor", floor),
    ("std.math.ceil", ceil),
    ("std.math.compare", compare),
    ("std.math.between", between),
    ("std.math.sum", sum),
    ("std.math.min", min),
    ("std.math.max", max),
];

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn num(op: &str, v: &Value) -> Result<Num, EvalError> {
    match v {
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Float(f) => Ok(Num::Float(*f)),
        _ => Err(EvalError::schema(format!("spec_lang {op} expects numeric args"))),
    }
}

fn overflow(op: &str) -> EvalError {
    EvalError::schema(format!("spec_lang {op} integer overflow"))
}

fn arith(
    op: &str,
    args: &[Value],
    ints: fn(i64, i64) -> Option<i64>,
    floats: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let (a, b) = two(op, args)?;
    match (num(op, a)?, num(op, b)?) {
        (Num::Int(x), Num::Int(y)) => ints(x, y).map(Value::Int).ok_or_else(|| overflow(op)),
        (x, y) => Ok(Value::Float(floats(x.as_f64(), y.as_f64()))),
    }
}

fn add(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    arith("add", args, i64::checked_add, |x, y| x + y)
}

fn sub(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    arith("sub", args, i64::checked_sub, |x, y| x - y)
}

fn mul(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    arith("mul", args, i64::checked_mul, |x, y| x * y)
}

fn div(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("div", args)?;
    let (x, y) = (num("div", a)?.as_f64(), num("div", b)?.as_f64());
    if y == 0.0 {
        return Err(EvalError::schema("spec_lang div expects non-zero divisor"));
    }
    Ok(Value::Float(x / y))
}

/// Integer modulo; the result takes the sign of the divisor.
fn modulo(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("mod", args)?;
    let (x, y) = (int("mod", a)?, int("mod", b)?);
    if y == 0 {
        return Err(EvalError::schema("spec_lang mod expects non-zero divisor"));
    }
    let r = x.checked_rem(y).ok_or_else(|| overflow("mod"))?;
    Ok(Value::Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
}

fn pow(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("pow", args)?;
    match (num("pow", a)?, num("pow", b)?) {
        (Num::Int(base), Num::Int(exp)) if exp >= 0 => u32::try_from(exp)
            .ok()
            .and_then(|e| base.checked_pow(e))
            .map(Value::Int)
            .ok_or_else(|| overflow("pow")),
        (base, exp) => {
            if base.as_f64() == 0.0 && exp.as_f64() < 0.0 {
                return Err(EvalError::schema("spec_lang pow expects non-zero base for negative exponent"));
            }
            Ok(Value::Float(base.as_f64().powf(exp.as_f64())))
        }
    }
}

fn unary(op: &str, args: &[Value], ints: fn(i64) -> Option<i64>, floats: fn(f64) -> f64) -> Result<Value, EvalError> {
    match num(op, one(op, args)?)? {
        Num::Int(i) => ints(i).map(Value::Int).ok_or_else(|| overflow(op)),
        Num::Float(f) => Ok(Value::Float(floats(f))),
    }
}

fn abs(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    unary("abs", args, i64::checked_abs, f64::abs)
}

fn negate(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    unary("negate", args, i64::checked_neg, |f| -f)
}

fn inc(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    unary("inc", args, |i| i.checked_add(1), |f| f + 1.0)
}

fn dec(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    unary("dec", args, |i| i.checked_sub(1), |f| f - 1.0)
}

fn bounds(op: &str, args: &[Value]) -> Result<(Num, Num, Num), EvalError> {
    let (low, high, v) = three(op, args)?;
    let (low, high, v) = (num(op, low)?, num(op, high)?, num(op, v)?);
    if low.as_f64() > high.as_f64() {
        return Err(EvalError::schema(format!("spec_lang {op} expects low <= high")));
    }
    Ok((low, high, v))
}

fn clamp(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (low, high, v) = bounds("clamp", args)?;
    let picked = if v.as_f64() < low.as_f64() {
        low
    } else if v.as_f64() > high.as_f64() {
        high
    } else {
        v
    };
    Ok(picked.into_value())
}

fn between(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (low, high, v) = bounds("between", args)?;
    Ok(Value::Bool(low.as_f64() <= v.as_f64() && v.as_f64() <= high.as_f64()))
}

fn to_int(op: &str, f: f64) -> Result<Value, EvalError> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::Int(f as i64))
    } else {
        Err(EvalError::schema(format!("spec_lang {op} result out of integer range")))
    }
}

fn integral(op: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvalError> {
    match num(op, one(op, args)?)? {
        Num::Int(i) => Ok(Value::Int(i)),
        Num::Float(x) => to_int(op, f(x)),
    }
}

/// Half away from zero: `round(2.5) == 3`, `round(-2.5) == -3`.
fn round(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    integral("round", args, f64::round)
}

fn floor(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    integral("floor", args, f64::floor)
}

fn ceil(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    integral("ceil", args, f64::ceil)
}

fn compare(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let (a, b) = two("compare", args)?;
    let comparable = matches!(
        (a, b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) | (Value::Str(_), Value::Str(_))
    );
    let ord = compare_values(a, b).filter(|_| comparable).ok_or_else(|| {
        EvalError::schema("spec_lang compare expects both args to be numbers or strings")
    })?;
    Ok(Value::Int(match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

fn sum(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let seq = list("sum", one("sum", args)?)?;
    let mut ints: i64 = 0;
    let mut floats: f64 = 0.0;
    let mut saw_float = false;
    for item in seq {
        match item {
            Value::Int(i) => ints = ints.checked_add(*i).ok_or_else(|| overflow("sum"))?,
            Value::Float(f) => {
                saw_float = true;
                floats += f;
            }
            _ => return Err(EvalError::schema("spec_lang sum expects numeric list values")),
        }
    }
    Ok(if saw_float {
        Value::Float(floats + ints as f64)
    } else {
        Value::Int(ints)
    })
}

fn extreme(op: &str, args: &[Value], keep: Ordering) -> Result<Value, EvalError> {
    let seq = list(op, one(op, args)?)?;
    let Some((first, rest)) = seq.split_first() else {
        return Err(EvalError::schema(format!("spec_lang {op} expects non-empty list")));
    };
    let mut best = first;
    for item in rest {
        let ord = compare_values(item, best).ok_or_else(|| {
            EvalError::schema(format!("spec_lang {op} expects comparable list values"))
        })?;
        if ord == keep {
            best = item;
        }
    }
    Ok(best.clone())
}

fn min(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    extreme("min", args, Ordering::Less)
}

fn max(_: &mut Interp<'_>, args: &[Value]) -> Result<Value, EvalError> {
    extreme("max", args, Ordering::Greater)
}
