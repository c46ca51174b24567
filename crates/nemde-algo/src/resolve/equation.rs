//! Generic-equation evaluator.
//!
//! Equations are postfix programs over a value stack. Each term reads its
//! operand (scaled by the term multiplier) and applies its operation:
//!
//! | operation | with operand            | without operand              |
//! |-----------|-------------------------|------------------------------|
//! | push      | push `m·x`              | error                        |
//! | binary    | pop `a`, push `a ∘ m·x` | pop `b`, pop `a`, push `m·(a ∘ b)` |
//! | unary     | push `f(m·x)`           | replace top `a` with `m·f(a)` |
//! | dup/exch/pop | stack manipulation, operand ignored                |
//!
//! The equation's value is the sum of whatever is left on the stack. Values
//! are memoised per equation and per constraint so a shared sub-equation is
//! evaluated once per interval.

use std::collections::HashMap;

use nemde_core::{
    Casefile, ConstraintId, EquationId, GenericConstraint, Operand, Operation, RhsSource,
};
use tracing::{debug, warn};

use crate::error::ResolveError;

/// Resolves constraint right-hand sides for one casefile.
pub struct RhsResolver<'a> {
    casefile: &'a Casefile,
    equations: HashMap<EquationId, f64>,
    constraints: HashMap<ConstraintId, f64>,
    /// Equations and constraints currently being evaluated, outermost first.
    visiting: Vec<String>,
}

impl<'a> RhsResolver<'a> {
    pub fn new(casefile: &'a Casefile) -> Self {
        Self {
            casefile,
            equations: HashMap::new(),
            constraints: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Right-hand side of `constraint`.
    pub fn constraint_rhs(&mut self, constraint: &GenericConstraint) -> Result<f64, ResolveError> {
        if let Some(&value) = self.constraints.get(&constraint.id) {
            return Ok(value);
        }
        let key = format!("constraint {}", constraint.id);
        self.enter(key)?;
        let value = match &constraint.rhs {
            RhsSource::Literal { value } => Ok(*value),
            RhsSource::Equation {
                equation_id,
                default,
            } => {
                if self.casefile.equation(equation_id.as_str()).is_some() {
                    self.evaluate(equation_id)
                } else {
                    warn!(
                        constraint = %constraint.id,
                        equation = %equation_id,
                        "RHS equation missing, using default"
                    );
                    Ok(*default)
                }
            }
        };
        self.visiting.pop();
        let value = value?;
        self.constraints.insert(constraint.id.clone(), value);
        Ok(value)
    }

    /// Value of equation `id`.
    pub fn evaluate(&mut self, id: &EquationId) -> Result<f64, ResolveError> {
        if let Some(&value) = self.equations.get(id) {
            return Ok(value);
        }
        self.enter(format!("equation {id}"))?;
        let value = self.run(id);
        self.visiting.pop();
        let value = value?;
        debug!(equation = %id, value, "equation evaluated");
        self.equations.insert(id.clone(), value);
        Ok(value)
    }

    fn enter(&mut self, key: String) -> Result<(), ResolveError> {
        if let Some(start) = self.visiting.iter().position(|k| k == &key) {
            let mut path = self.visiting[start..].to_vec();
            path.push(key);
            return Err(ResolveError::EquationCycle {
                path: path.join(" -> "),
            });
        }
        self.visiting.push(key);
        Ok(())
    }

    fn run(&mut self, id: &EquationId) -> Result<f64, ResolveError> {
        let casefile = self.casefile;
        let equation = casefile
            .equation(id.as_str())
            .ok_or_else(|| ResolveError::Equation {
                equation: id.to_string(),
                term: 0,
                message: "equation not found".into(),
            })?;

        let mut stack: Vec<f64> = Vec::with_capacity(equation.terms.len());
        for (index, term) in equation.terms.iter().enumerate() {
            let fail = |message: &str| ResolveError::Equation {
                equation: id.to_string(),
                term: index,
                message: message.to_string(),
            };
            let operand = match &term.operand {
                Some(operand) => Some(term.multiplier * self.operand_value(operand)?),
                None => None,
            };
            let op = term.operation;

            match (op, operand) {
                (Operation::Push, Some(x)) => stack.push(x),
                (Operation::Push, None) => return Err(fail("push without operand")),
                (Operation::Dup, _) => {
                    let top = *stack.last().ok_or_else(|| fail("stack underflow"))?;
                    stack.push(top);
                }
                (Operation::Exch, _) => {
                    let n = stack.len();
                    if n < 2 {
                        return Err(fail("stack underflow"));
                    }
                    stack.swap(n - 1, n - 2);
                }
                (Operation::Pop, _) => {
                    stack.pop().ok_or_else(|| fail("stack underflow"))?;
                }
                (op, Some(x)) if op.is_binary() => {
                    let a = stack.pop().ok_or_else(|| fail("stack underflow"))?;
                    stack.push(binary(op, a, x).map_err(fail)?);
                }
                (op, None) if op.is_binary() => {
                    let b = stack.pop().ok_or_else(|| fail("stack underflow"))?;
                    let a = stack.pop().ok_or_else(|| fail("stack underflow"))?;
                    stack.push(term.multiplier * binary(op, a, b).map_err(fail)?);
                }
                (op, Some(x)) => stack.push(unary(op, x).map_err(fail)?),
                (op, None) => {
                    let a = stack.pop().ok_or_else(|| fail("stack underflow"))?;
                    stack.push(term.multiplier * unary(op, a).map_err(fail)?);
                }
            }
        }
        Ok(stack.iter().sum())
    }

    fn operand_value(&mut self, operand: &Operand) -> Result<f64, ResolveError> {
        let casefile = self.casefile;
        Ok(match operand {
            Operand::Constant { value } => *value,
            Operand::Telemetry { tag, default } => {
                debug!(tag = %tag, default, "telemetry not modelled, using default");
                *default
            }
            Operand::Region {
                region_id,
                attribute,
                default,
            } => casefile
                .region(region_id.as_str())
                .and_then(|r| attribute.read(r))
                .unwrap_or(*default),
            Operand::Trader {
                trader_id,
                attribute,
                default,
            } => casefile
                .trader(trader_id.as_str())
                .and_then(|t| attribute.read(t))
                .unwrap_or(*default),
            Operand::Interconnector {
                interconnector_id,
                attribute,
                default,
            } => casefile
                .interconnector(interconnector_id.as_str())
                .and_then(|ic| attribute.read(ic))
                .unwrap_or(*default),
            Operand::Constraint {
                constraint_id,
                default,
            } => match casefile.constraint(constraint_id.as_str()) {
                Some(constraint) => self.constraint_rhs(constraint)?,
                None => *default,
            },
            Operand::Equation { equation_id } => self.evaluate(equation_id)?,
        })
    }
}

fn binary(op: Operation, a: f64, b: f64) -> Result<f64, &'static str> {
    Ok(match op {
        Operation::Add => a + b,
        Operation::Sub => a - b,
        Operation::Mul => a * b,
        Operation::Div => {
            if b == 0.0 {
                return Err("division by zero");
            }
            a / b
        }
        Operation::Max => a.max(b),
        Operation::Min => a.min(b),
        _ => return Err("not a binary operation"),
    })
}

fn unary(op: Operation, a: f64) -> Result<f64, &'static str> {
    Ok(match op {
        Operation::Neg => -a,
        Operation::Abs => a.abs(),
        Operation::Sqrt => {
            if a < 0.0 {
                return Err("square root of a negative value");
            }
            a.sqrt()
        }
        Operation::Step => {
            if a > 0.0 {
                1.0
            } else {
                0.0
            }
        }
        Operation::Pow2 => a * a,
        Operation::Pow3 => a * a * a,
        _ => return Err("not a unary operation"),
    })
}

/// Resolve the right-hand side of every generic constraint.
pub fn resolve_constraint_rhs(
    casefile: &Casefile,
) -> Result<HashMap<ConstraintId, f64>, ResolveError> {
    let mut resolver = RhsResolver::new(casefile);
    casefile
        .constraints
        .iter()
        .map(|c| Ok((c.id.clone(), resolver.constraint_rhs(c)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemde_core::{EquationTerm, GenericEquation};
    use serde_json::json;

    fn casefile(equations: serde_json::Value, constraints: serde_json::Value) -> Casefile {
        Casefile::from_value(json!({
            "case": {"case_id": "T", "voll": 15000.0, "market_price_floor": -1000.0, "penalties": {}},
            "regions": [{"id": "NSW1", "initial_demand": 7000.0, "ade": 0.0, "demand_forecast": 50.0}],
            "traders": [],
            "interconnectors": [],
            "constraints": constraints,
            "equations": equations
        }))
        .unwrap()
    }

    fn eval(terms: Vec<EquationTerm>) -> Result<f64, ResolveError> {
        let mut cf = casefile(json!([]), json!([]));
        cf.equations.push(GenericEquation {
            id: "E".into(),
            terms,
        });
        RhsResolver::new(&cf).evaluate(&"E".into())
    }

    fn constant(value: f64, operation: Operation) -> EquationTerm {
        EquationTerm {
            multiplier: 1.0,
            operand: Some(Operand::Constant { value }),
            operation,
        }
    }

    fn bare(operation: Operation) -> EquationTerm {
        EquationTerm {
            multiplier: 1.0,
            operand: None,
            operation,
        }
    }

    #[test]
    fn stack_sum_is_the_result() {
        let value = eval(vec![
            constant(2.0, Operation::Push),
            constant(3.0, Operation::Push),
            constant(4.0, Operation::Push),
        ])
        .unwrap();
        assert_eq!(value, 9.0);
        assert_eq!(eval(vec![]).unwrap(), 0.0);
    }

    #[test]
    fn binary_with_and_without_operand() {
        // (10 - 4) then * 3
        let value = eval(vec![
            constant(10.0, Operation::Push),
            constant(4.0, Operation::Push),
            bare(Operation::Sub),
            constant(3.0, Operation::Mul),
        ])
        .unwrap();
        assert_eq!(value, 18.0);
    }

    #[test]
    fn unary_and_stack_ops() {
        let value = eval(vec![
            constant(-9.0, Operation::Push),
            bare(Operation::Abs),
            bare(Operation::Sqrt),
            bare(Operation::Dup),
            bare(Operation::Mul),
            constant(2.0, Operation::Push),
            bare(Operation::Exch),
            bare(Operation::Div),
        ])
        .unwrap();
        // sqrt(9) = 3, dup * = 9, then 2 / 9
        assert!((value - 2.0 / 9.0).abs() < 1e-12);

        let step = eval(vec![constant(-1.0, Operation::Step), constant(5.0, Operation::Step)]);
        assert_eq!(step.unwrap(), 1.0);
    }

    #[test]
    fn multiplier_scales_operand() {
        let term = EquationTerm {
            multiplier: -2.0,
            operand: Some(Operand::Constant { value: 3.0 }),
            operation: Operation::Push,
        };
        assert_eq!(eval(vec![term]).unwrap(), -6.0);
    }

    #[test]
    fn underflow_and_division_by_zero() {
        let err = eval(vec![bare(Operation::Add)]).unwrap_err();
        assert!(err.to_string().contains("underflow"));
        let err = eval(vec![constant(1.0, Operation::Push), constant(0.0, Operation::Div)])
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));
        assert!(err.to_string().contains("term 1"));
    }

    #[test]
    fn attributes_and_defaults() {
        let cf = casefile(
            json!([{"id": "E", "terms": [
                {"operand": {"kind": "region", "region_id": "NSW1", "attribute": "demand_forecast", "default": 1.0}},
                {"operand": {"kind": "trader", "trader_id": "GONE", "attribute": "initial_mw", "default": 7.0}},
                {"operand": {"kind": "telemetry", "tag": "SCADA.X", "default": 3.0}}
            ]}]),
            json!([]),
        );
        assert_eq!(RhsResolver::new(&cf).evaluate(&"E".into()).unwrap(), 60.0);
    }

    #[test]
    fn constraint_rhs_uses_equation_or_default() {
        let cf = casefile(
            json!([{"id": "E", "terms": [{"operand": {"kind": "constant", "value": 850.0}}]}]),
            json!([
                {"id": "C1", "constraint_type": "LE", "violation_price": 1.0,
                 "rhs": {"kind": "equation", "equation_id": "E", "default": 0.0}},
                {"id": "C2", "constraint_type": "GE", "violation_price": 1.0,
                 "rhs": {"kind": "equation", "equation_id": "MISSING", "default": 12.5}},
                {"id": "C3", "constraint_type": "EQ", "violation_price": 1.0,
                 "rhs": {"kind": "literal", "value": -4.0}}
            ]),
        );
        let rhs = resolve_constraint_rhs(&cf).unwrap();
        assert_eq!(rhs["C1"], 850.0);
        assert_eq!(rhs["C2"], 12.5);
        assert_eq!(rhs["C3"], -4.0);
    }

    #[test]
    fn mutual_references_are_a_cycle() {
        let cf = casefile(
            json!([
                {"id": "EA", "terms": [{"operand": {"kind": "constraint", "constraint_id": "CB"}}]},
                {"id": "EB", "terms": [{"operand": {"kind": "constraint", "constraint_id": "CA"}}]}
            ]),
            json!([
                {"id": "CA", "constraint_type": "LE", "violation_price": 1.0,
                 "rhs": {"kind": "equation", "equation_id": "EA"}},
                {"id": "CB", "constraint_type": "LE", "violation_price": 1.0,
                 "rhs": {"kind": "equation", "equation_id": "EB"}}
            ]),
        );
        let err = resolve_constraint_rhs(&cf).unwrap_err();
        assert!(matches!(err, ResolveError::EquationCycle { .. }));
        assert!(err.to_string().contains("constraint CA"));
    }

    #[test]
    fn shared_equations_are_memoised() {
        let cf = casefile(
            json!([
                {"id": "BASE", "terms": [{"operand": {"kind": "constant", "value": 2.0}}]},
                {"id": "TOP", "terms": [
                    {"operand": {"kind": "equation", "equation_id": "BASE"}},
                    {"operand": {"kind": "equation", "equation_id": "BASE"}, "operation": "mul"}
                ]}
            ]),
            json!([]),
        );
        let mut resolver = RhsResolver::new(&cf);
        assert_eq!(resolver.evaluate(&"TOP".into()).unwrap(), 4.0);
        assert_eq!(resolver.equations.len(), 2);
    }
}
