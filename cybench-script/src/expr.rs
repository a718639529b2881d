use std::f64::consts::PI;
use std::fmt;
use std::io::Write as _;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::EvalError;
use crate::script::ScriptContext;
use crate::value::Value;

/// Expression AST for `\set` and `\sleep` arguments. Operators are calls
/// with the operator rune as the function name.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Var(String),
    Call { name: String, args: Vec<Expr> },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Var(name) => write!(f, ":{name}"),
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Numeric coercion helper. Integer values fill both fields, float values
/// only `fval`.
#[derive(Debug, Clone, Copy)]
struct Number {
    is_float: bool,
    fval: f64,
    ival: i64,
}

impl Number {
    fn int(value: i64) -> Self {
        Self {
            is_float: false,
            fval: value as f64,
            ival: value,
        }
    }

    fn float(value: f64) -> Self {
        Self {
            is_float: true,
            fval: value,
            ival: 0,
        }
    }

    fn to_value(self) -> Value {
        if self.is_float {
            Value::Float(self.fval)
        } else {
            Value::Int(self.ival)
        }
    }
}

impl Expr {
    pub fn eval(&self, ctx: &mut ScriptContext<'_>) -> Result<Value, EvalError> {
        match self {
            Self::Int(value) => Ok(Value::Int(*value)),
            Self::Float(value) => Ok(Value::Float(*value)),
            Self::Var(name) => ctx
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Self::Call { name, args } => self.eval_call(name, args, ctx),
        }
    }

    fn arg_as_number(
        &self,
        args: &[Expr],
        index: usize,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Number, EvalError> {
        let Some(arg) = args.get(index) else {
            return Err(EvalError::Arity {
                call: self.to_string(),
                want: index + 1,
                got: args.len(),
            });
        };
        match arg.eval(ctx)? {
            Value::Int(value) => Ok(Number::int(value)),
            Value::Float(value) => Ok(Number::float(value)),
            Value::String(_) => Err(EvalError::NotANumber {
                call: self.to_string(),
                value: arg.to_string(),
            }),
        }
    }

    fn eval_call(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, EvalError> {
        match name {
            "+" | "-" | "*" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                let b = self.arg_as_number(args, 1, ctx)?;
                let value = if a.is_float || b.is_float {
                    match name {
                        "+" => Value::Float(a.fval + b.fval),
                        "-" => Value::Float(a.fval - b.fval),
                        _ => Value::Float(a.fval * b.fval),
                    }
                } else {
                    match name {
                        "+" => Value::Int(a.ival + b.ival),
                        "-" => Value::Int(a.ival - b.ival),
                        _ => Value::Int(a.ival * b.ival),
                    }
                };
                Ok(value)
            }
            // Division always produces a float, even on integer inputs.
            "/" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                let b = self.arg_as_number(args, 1, ctx)?;
                Ok(Value::Float(a.fval / b.fval))
            }
            "abs" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                let value = if a.is_float {
                    Value::Float(a.fval.abs())
                } else {
                    Value::Int(a.ival.abs())
                };
                Ok(value)
            }
            "double" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                Ok(Value::Float(a.fval))
            }
            "int" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                let value = if a.is_float {
                    a.fval.trunc() as i64
                } else {
                    a.ival
                };
                Ok(Value::Int(value))
            }
            "greatest" => self.fold_numbers(args, ctx, f64::max, i64::max),
            "least" => self.fold_numbers(args, ctx, f64::min, i64::min),
            "pi" => Ok(Value::Float(PI)),
            "sqrt" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                Ok(Value::Float(a.fval.sqrt()))
            }
            "random" => {
                let a = self.arg_as_number(args, 0, ctx)?;
                let b = self.arg_as_number(args, 1, ctx)?;
                self.random(a, b, ctx)
            }
            "random_gaussian" => {
                let lo = self.arg_as_number(args, 0, ctx)?;
                let hi = self.arg_as_number(args, 1, ctx)?;
                let dev = self.arg_as_number(args, 2, ctx)?;
                self.random_gaussian(lo, hi, dev, ctx)
            }
            "random_exponential" => {
                let lo = self.arg_as_number(args, 0, ctx)?;
                let hi = self.arg_as_number(args, 1, ctx)?;
                let rate = self.arg_as_number(args, 2, ctx)?;
                self.random_exponential(lo, hi, rate, ctx)
            }
            "debug" => {
                let Some(arg) = args.first() else {
                    return Err(EvalError::Arity {
                        call: self.to_string(),
                        want: 1,
                        got: 0,
                    });
                };
                let value = arg.eval(ctx)?;
                let _ = writeln!(ctx.stderr, "{value}");
                Ok(value)
            }
            _ => Err(EvalError::UnknownFunction(self.to_string())),
        }
    }

    fn fold_numbers(
        &self,
        args: &[Expr],
        ctx: &mut ScriptContext<'_>,
        ffold: fn(f64, f64) -> f64,
        ifold: fn(i64, i64) -> i64,
    ) -> Result<Value, EvalError> {
        let mut acc = self.arg_as_number(args, 0, ctx)?;
        for index in 1..args.len() {
            let next = self.arg_as_number(args, index, ctx)?;
            acc = if acc.is_float || next.is_float {
                Number::float(ffold(acc.fval, next.fval))
            } else {
                Number::int(ifold(acc.ival, next.ival))
            };
        }
        Ok(acc.to_value())
    }

    /// Uniform draw in `[lo, hi)`; `lo` when the bounds are equal. Any float
    /// bound switches the result to a float.
    fn random(
        &self,
        lo: Number,
        hi: Number,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, EvalError> {
        if lo.fval == hi.fval {
            return Ok(lo.to_value());
        }
        if lo.fval > hi.fval {
            return Err(EvalError::InvalidArgument {
                call: self.to_string(),
                message: "lower bound is greater than upper bound".to_string(),
            });
        }
        let mut rng = &mut *ctx.rng;
        if lo.is_float || hi.is_float {
            Ok(Value::Float(rng.gen_range(lo.fval..hi.fval)))
        } else {
            Ok(Value::Int(rng.gen_range(lo.ival..hi.ival)))
        }
    }

    /// Gaussian with mean `(lo+hi)/2` and deviation parameter `dev`
    /// (stddev = `(hi-lo)/(2*dev)`), clamped to `[lo, hi]`.
    fn random_gaussian(
        &self,
        lo: Number,
        hi: Number,
        dev: Number,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, EvalError> {
        if dev.fval <= 0.0 {
            return Err(EvalError::InvalidArgument {
                call: self.to_string(),
                message: "deviation parameter must be greater than zero".to_string(),
            });
        }
        if lo.fval >= hi.fval {
            return Ok(lo.to_value());
        }
        let mean = (lo.fval + hi.fval) / 2.0;
        let stddev = (hi.fval - lo.fval) / (2.0 * dev.fval);
        let normal = Normal::new(mean, stddev).map_err(|err| EvalError::InvalidArgument {
            call: self.to_string(),
            message: err.to_string(),
        })?;
        let sample: f64 = normal.sample(&mut *ctx.rng);
        Ok(clamped_sample(sample, lo, hi))
    }

    /// Exponential truncated to `[lo, hi]`, derived from a single uniform
    /// draw: `lo + (hi-lo) * (-ln(1 - u*(1 - e^-rate)) / rate)`.
    fn random_exponential(
        &self,
        lo: Number,
        hi: Number,
        rate: Number,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Value, EvalError> {
        if rate.fval <= 0.0 {
            return Err(EvalError::InvalidArgument {
                call: self.to_string(),
                message: "rate parameter must be greater than zero".to_string(),
            });
        }
        if lo.fval >= hi.fval {
            return Ok(lo.to_value());
        }
        let uniform: f64 = (&mut *ctx.rng).gen_range(0.0..1.0);
        let unit = -(1.0 - uniform * (1.0 - (-rate.fval).exp())).ln() / rate.fval;
        let sample = lo.fval + (hi.fval - lo.fval) * unit;
        Ok(clamped_sample(sample, lo, hi))
    }
}

fn clamped_sample(sample: f64, lo: Number, hi: Number) -> Value {
    let clamped = sample.clamp(lo.fval, hi.fval);
    if lo.is_float || hi.is_float {
        Value::Float(clamped)
    } else {
        Value::Int((clamped.round() as i64).clamp(lo.ival, hi.ival))
    }
}
