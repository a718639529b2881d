use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use rand::RngCore;

use crate::error::EvalError;
use crate::expr::Expr;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepUnit {
    Us,
    Ms,
    S,
}

impl SleepUnit {
    #[must_use]
    pub fn duration(self, amount: i64) -> Duration {
        let amount = amount.max(0) as u64;
        match self {
            Self::Us => Duration::from_micros(amount),
            Self::Ms => Duration::from_millis(amount),
            Self::S => Duration::from_secs(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Raw Cypher text; parameters are snapshotted at execution time.
    Query(String),
    Set { var: String, expr: Expr },
    Sleep { duration: Expr, unit: SleepUnit },
}

/// A parsed workload script. Constructed once at startup and shared across
/// workers; evaluation never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub weight: u32,
    pub readonly: bool,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub query: String,
    pub params: BTreeMap<String, Value>,
}

/// The ordered sequence of parameterized queries constituting one
/// transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOfWork {
    pub readonly: bool,
    pub statements: Vec<Statement>,
}

/// Mutable state for one script evaluation. Built fresh per unit of work;
/// `\set` writes land here and nowhere else.
pub struct ScriptContext<'a> {
    pub vars: BTreeMap<String, Value>,
    pub rng: &'a mut (dyn RngCore + Send),
    pub stderr: &'a mut (dyn Write + Send),
}

impl Script {
    /// Runs the command sequence against `ctx`, producing a unit of work.
    /// `\sleep` suspends the calling task; callers that need cancellation
    /// race this future against their shutdown signal.
    pub async fn eval(&self, ctx: &mut ScriptContext<'_>) -> Result<UnitOfWork, EvalError> {
        let mut unit = UnitOfWork {
            readonly: self.readonly,
            statements: Vec::new(),
        };

        for command in &self.commands {
            match command {
                Command::Query(text) => {
                    // Snapshot, not a live reference: later \set commands must
                    // not mutate the params of earlier statements.
                    unit.statements.push(Statement {
                        query: text.clone(),
                        params: ctx.vars.clone(),
                    });
                }
                Command::Set { var, expr } => {
                    let value = expr.eval(ctx)?;
                    ctx.vars.insert(var.clone(), value);
                }
                Command::Sleep {
                    duration,
                    unit: sleep_unit,
                } => {
                    let amount = match duration.eval(ctx)? {
                        Value::Int(v) => v,
                        Value::Float(v) => v as i64,
                        Value::String(text) => {
                            return Err(EvalError::NotANumber {
                                call: duration.to_string(),
                                value: text,
                            });
                        }
                    };
                    tokio::time::sleep(sleep_unit.duration(amount)).await;
                }
            }
        }

        Ok(unit)
    }
}
