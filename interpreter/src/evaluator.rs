use std::io::Write;

use crate::environment::Environment;
use crate::fragment::{EvaluationError, Evaluator, Flow, Fragment};
use crate::runtime_value::RuntimeValue;
use crate::script::ast::{BinaryOperator, Expr, Position, Statement, UnaryOperator};
use crate::script::{FragmentError, ScriptError, parse_fragment};

/// Name that always reads the composed text of the fragment's frame.
pub const FRAME_TEXT: &str = "text";

/// The built-in evaluator: runs fragments written in the statement language,
/// printing to `output` and keeping one variable scope across fragments.
#[derive(Debug)]
pub struct ScriptEvaluator<W: Write> {
    env: Environment,
    output: W,
}

/// What one fragment can reach besides the shared scope.
struct Context<'a> {
    frame_text: &'a str,
    emitted: &'a mut String,
    restart: bool,
}

impl<W: Write> ScriptEvaluator<W> {
    pub fn new(output: W) -> Self {
        ScriptEvaluator {
            env: Environment::new(),
            output,
        }
    }

    /// Start from an existing scope instead of an empty one. Every attempt
    /// of a restarted run builds a fresh evaluator, so this is how a driver
    /// tells an attempt what earlier attempts did.
    pub fn with_env(output: W, env: Environment) -> Self {
        ScriptEvaluator { env, output }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn execute(&mut self, statement: &Statement, cx: &mut Context<'_>) -> Result<(), FragmentError> {
        match statement {
            Statement::Assignment {
                variable,
                value,
                position,
            } => {
                if variable == FRAME_TEXT {
                    return Err(FragmentError::syntax(
                        format!("cannot assign to '{}'", FRAME_TEXT),
                        *position,
                    ));
                }
                let value = self.eval_expr(value, *position, cx)?;
                self.env.set(variable.clone(), value);
            }
            Statement::Expression { value, position } => {
                self.eval_expr(value, *position, cx)?;
            }
        }
        Ok(())
    }

    /// Evaluate an expression. `at` is where the enclosing statement starts
    /// and is used for errors that carry no position of their own.
    fn eval_expr(
        &mut self,
        expr: &Expr,
        at: Position,
        cx: &mut Context<'_>,
    ) -> Result<RuntimeValue, FragmentError> {
        match expr {
            Expr::NumberLiteral(n) => Ok(RuntimeValue::Number(*n)),
            Expr::StringLiteral(s) => Ok(RuntimeValue::String(s.clone())),
            Expr::BooleanLiteral(b) => Ok(RuntimeValue::Boolean(*b)),
            Expr::UnitLiteral => Ok(RuntimeValue::Unit),

            Expr::Variable(name, position) => {
                if name == FRAME_TEXT {
                    return Ok(RuntimeValue::String(cx.frame_text.to_string()));
                }
                self.env.get(name).cloned().ok_or_else(|| {
                    FragmentError::new(ScriptError::UndefinedVariable(name.clone()), *position)
                })
            }

            Expr::UnaryOperation { operator, operand } => {
                let val = self.eval_expr(operand, at, cx)?;
                match operator {
                    UnaryOperator::Negation => {
                        let n = coerce_number(&val).map_err(|e| FragmentError::new(e, at))?;
                        Ok(RuntimeValue::Number(-n))
                    }
                    UnaryOperator::LogicalNot => Ok(RuntimeValue::Boolean(val.is_falsy())),
                }
            }

            Expr::BinaryOperation {
                operator: BinaryOperator::LogicalAnd,
                left,
                right,
            } => {
                let l = self.eval_expr(left, at, cx)?;
                if l.is_falsy() {
                    return Ok(RuntimeValue::Boolean(false));
                }
                let r = self.eval_expr(right, at, cx)?;
                Ok(RuntimeValue::Boolean(r.is_truthy()))
            }
            Expr::BinaryOperation {
                operator: BinaryOperator::LogicalOr,
                left,
                right,
            } => {
                let l = self.eval_expr(left, at, cx)?;
                if l.is_truthy() {
                    return Ok(RuntimeValue::Boolean(true));
                }
                let r = self.eval_expr(right, at, cx)?;
                Ok(RuntimeValue::Boolean(r.is_truthy()))
            }
            Expr::BinaryOperation {
                operator,
                left,
                right,
            } => {
                let l = self.eval_expr(left, at, cx)?;
                let r = self.eval_expr(right, at, cx)?;
                eval_binary_op(operator, &l, &r).map_err(|e| FragmentError::new(e, at))
            }

            Expr::Conditional {
                condition,
                true_branch,
                false_branch,
            } => {
                if self.eval_expr(condition, at, cx)?.is_truthy() {
                    self.eval_expr(true_branch, at, cx)
                } else {
                    self.eval_expr(false_branch, at, cx)
                }
            }

            Expr::Call {
                function,
                arguments,
                position,
            } => {
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.eval_expr(argument, at, cx)?);
                }
                self.call(function, args, cx)
                    .map_err(|e| FragmentError::new(e, *position))
            }
        }
    }

    fn call(
        &mut self,
        function: &str,
        args: Vec<RuntimeValue>,
        cx: &mut Context<'_>,
    ) -> Result<RuntimeValue, ScriptError> {
        match function {
            "print" => {
                writeln!(self.output, "{}", join(&args, " "))
                    .map_err(|e| ScriptError::Io(e.to_string()))?;
                Ok(RuntimeValue::Unit)
            }
            "emit" => {
                cx.emitted.push_str(&join(&args, ""));
                Ok(RuntimeValue::Unit)
            }
            "len" => match single(function, args)? {
                RuntimeValue::String(s) => Ok(RuntimeValue::Number(s.chars().count() as f64)),
                other => Err(type_error("String", &other)),
            },
            "str" => Ok(RuntimeValue::String(single(function, args)?.to_string())),
            "trim" => match single(function, args)? {
                RuntimeValue::String(s) => Ok(RuntimeValue::String(s.trim().to_string())),
                other => Err(type_error("String", &other)),
            },
            "fail" => Err(ScriptError::Failed(single(function, args)?.to_string())),
            // The next attempt starts from a fresh scope, so only a restart
            // guarded on seeded or external state can ever settle.
            "restart" => {
                arity(function, &args, 0)?;
                cx.restart = true;
                Ok(RuntimeValue::Unit)
            }
            _ => Err(ScriptError::UnknownFunction(function.to_string())),
        }
    }
}

impl<W: Write> Evaluator for ScriptEvaluator<W> {
    fn evaluate(&mut self, fragment: Fragment<'_>) -> Result<Flow, EvaluationError> {
        let (address, indents) = (fragment.address, fragment.indents);
        let statements = parse_fragment(fragment.source).map_err(|e| e.at(address, indents))?;

        let mut cx = Context {
            frame_text: fragment.frame_text,
            emitted: fragment.emitted,
            restart: false,
        };
        for statement in &statements {
            self.execute(statement, &mut cx).map_err(|e| e.at(address, indents))?;
            if cx.restart {
                return Ok(Flow::Restart);
            }
        }
        Ok(Flow::Continue)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join(args: &[RuntimeValue], separator: &str) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

fn arity(function: &str, args: &[RuntimeValue], expected: usize) -> Result<(), ScriptError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ScriptError::ArityMismatch {
            function: function.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn single(function: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, ScriptError> {
    arity(function, &args, 1)?;
    Ok(args.into_iter().next().unwrap_or(RuntimeValue::Unit))
}

fn type_error(expected: &str, got: &RuntimeValue) -> ScriptError {
    ScriptError::TypeError {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

fn coerce_number(val: &RuntimeValue) -> Result<f64, ScriptError> {
    match val {
        RuntimeValue::Number(n) => Ok(*n),
        other => Err(type_error("Number", other)),
    }
}

fn eval_binary_op(
    op: &BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, ScriptError> {
    match op {
        BinaryOperator::Addition => match (left, right) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => Ok(RuntimeValue::Number(a + b)),
            (RuntimeValue::String(a), b) => Ok(RuntimeValue::String(format!("{}{}", a, b))),
            (a, RuntimeValue::String(b)) => Ok(RuntimeValue::String(format!("{}{}", a, b))),
            _ => Err(ScriptError::TypeError {
                expected: "numbers or a string".to_string(),
                got: format!("{} + {}", left.type_name(), right.type_name()),
            }),
        },
        BinaryOperator::Subtraction => numeric_binop(left, right, |a, b| a - b),
        BinaryOperator::Multiplication => numeric_binop(left, right, |a, b| a * b),
        BinaryOperator::Division => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a / b))
        }
        BinaryOperator::Modulo => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a % b))
        }
        BinaryOperator::Equality => Ok(RuntimeValue::Boolean(left == right)),
        BinaryOperator::Inequality => Ok(RuntimeValue::Boolean(left != right)),
        BinaryOperator::GreaterThan => numeric_cmp(left, right, |a, b| a > b),
        BinaryOperator::LessThan => numeric_cmp(left, right, |a, b| a < b),
        BinaryOperator::GreaterThanOrEqual => numeric_cmp(left, right, |a, b| a >= b),
        BinaryOperator::LessThanOrEqual => numeric_cmp(left, right, |a, b| a <= b),
        BinaryOperator::LogicalAnd => {
            Ok(RuntimeValue::Boolean(left.is_truthy() && right.is_truthy()))
        }
        BinaryOperator::LogicalOr => {
            Ok(RuntimeValue::Boolean(left.is_truthy() || right.is_truthy()))
        }
    }
}

fn numeric_binop(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(f64, f64) -> f64,
) -> Result<RuntimeValue, ScriptError> {
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Number(f(a, b)))
}

fn numeric_cmp(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(f64, f64) -> bool,
) -> Result<RuntimeValue, ScriptError> {
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Boolean(f(a, b)))
}
