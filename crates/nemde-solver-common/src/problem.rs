//! Problem representation handed to solver backends.
//!
//! A [`LinearProblem`] is a minimisation over bounded variables:
//!
//! ```text
//! min  c'x + offset
//! s.t. a_r'x  (<= | >= | =)  b_r     for every row r
//!      l <= x <= u,  x_j integer for integer-domain j
//! ```

use serde::{Deserialize, Serialize};

use crate::{SolverError, SolverResult};

/// Index of a variable in its [`LinearProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Index of a row in its [`LinearProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarDomain {
    Continuous,
    /// Integer within the variable's bounds; binaries are integers in [0, 1].
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSense {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    /// `f64::INFINITY` when unbounded above.
    pub upper: f64,
    pub domain: VarDomain,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    /// Duplicate variables are summed.
    pub terms: Vec<(VarId, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LinearProblem {
    pub name: String,
    pub variables: Vec<Variable>,
    pub rows: Vec<Row>,
    /// Constant added to the objective.
    pub objective_offset: f64,
}

impl LinearProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        domain: VarDomain,
    ) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper,
            domain,
            cost: 0.0,
        });
        VarId(self.variables.len() - 1)
    }

    /// Continuous variable in `[0, +inf)`.
    pub fn add_nonneg(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, 0.0, f64::INFINITY, VarDomain::Continuous)
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, 0.0, 1.0, VarDomain::Integer)
    }

    /// Add `coefficient` to the variable's objective cost.
    pub fn add_cost(&mut self, var: VarId, coefficient: f64) {
        self.variables[var.0].cost += coefficient;
    }

    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        sense: RowSense,
        rhs: f64,
    ) -> RowId {
        self.rows.push(Row {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
        RowId(self.rows.len() - 1)
    }

    /// Pin a variable to a value (used to fix integers or pricing-pass targets).
    pub fn fix_variable(&mut self, var: VarId, value: f64) {
        let v = &mut self.variables[var.0];
        v.lower = value;
        v.upper = value;
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_nonzeros(&self) -> usize {
        self.rows.iter().map(|r| r.terms.len()).sum()
    }

    pub fn has_integers(&self) -> bool {
        self.variables
            .iter()
            .any(|v| v.domain == VarDomain::Integer)
    }

    pub fn integer_vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.domain == VarDomain::Integer)
            .map(|(j, _)| VarId(j))
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective_offset
            + self
                .variables
                .iter()
                .zip(x)
                .map(|(v, xj)| v.cost * xj)
                .sum::<f64>()
    }

    pub fn row_activity(&self, row: RowId, x: &[f64]) -> f64 {
        self.rows[row.0]
            .terms
            .iter()
            .map(|(var, a)| a * x.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Reject problems no backend could interpret.
    pub fn validate(&self) -> SolverResult<()> {
        for v in &self.variables {
            if v.lower.is_nan() || v.upper.is_nan() || !v.cost.is_finite() {
                return Err(SolverError::InvalidProblem(format!(
                    "variable '{}' has non-finite bound or cost",
                    v.name
                )));
            }
            if v.lower > v.upper {
                return Err(SolverError::InvalidProblem(format!(
                    "variable '{}' has lower bound {} above upper bound {}",
                    v.name, v.lower, v.upper
                )));
            }
        }
        for r in &self.rows {
            if !r.rhs.is_finite() {
                return Err(SolverError::InvalidProblem(format!(
                    "row '{}' has non-finite rhs",
                    r.name
                )));
            }
            for (var, a) in &r.terms {
                if var.0 >= self.variables.len() {
                    return Err(SolverError::InvalidProblem(format!(
                        "row '{}' references unknown variable {}",
                        r.name, var.0
                    )));
                }
                if !a.is_finite() {
                    return Err(SolverError::InvalidProblem(format!(
                        "row '{}' has non-finite coefficient",
                        r.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_evaluate() {
        let mut lp = LinearProblem::new("t");
        let x = lp.add_variable("x", 0.0, 10.0, VarDomain::Continuous);
        let y = lp.add_nonneg("y");
        let b = lp.add_binary("b");
        lp.add_cost(x, 2.0);
        lp.add_cost(x, 1.0);
        lp.add_cost(y, 5.0);
        let r = lp.add_row("bal", vec![(x, 1.0), (y, 1.0), (x, 1.0)], RowSense::Eq, 4.0);

        assert_eq!(lp.num_vars(), 3);
        assert_eq!(lp.num_nonzeros(), 3);
        assert!(lp.has_integers());
        assert_eq!(lp.integer_vars().collect::<Vec<_>>(), vec![b]);
        let point = [1.0, 2.0, 0.0];
        assert_eq!(lp.objective_value(&point), 13.0);
        assert_eq!(lp.row_activity(r, &point), 4.0);
        assert!(lp.validate().is_ok());
    }

    #[test]
    fn crossed_bounds_are_invalid() {
        let mut lp = LinearProblem::new("t");
        lp.add_variable("x", 2.0, 1.0, VarDomain::Continuous);
        assert!(matches!(lp.validate(), Err(SolverError::InvalidProblem(_))));
    }

    #[test]
    fn dangling_variable_is_invalid() {
        let mut lp = LinearProblem::new("t");
        lp.add_row("r", vec![(VarId(3), 1.0)], RowSense::Le, 1.0);
        assert!(lp.validate().is_err());
    }

    #[test]
    fn fix_variable_pins_bounds() {
        let mut lp = LinearProblem::new("t");
        let x = lp.add_nonneg("x");
        lp.fix_variable(x, 7.5);
        assert_eq!(lp.variables[x.0].lower, 7.5);
        assert_eq!(lp.variables[x.0].upper, 7.5);
    }
}
