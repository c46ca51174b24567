//! Piecewise-linear interconnector loss curves.
//!
//! A loss model lists segments `(limit_k, factor_k)`. Breakpoints are
//! `x_0 = -loss_lower_limit` and `x_{k+1} = limit_k`; the loss at flow `x` is
//! the signed integral of the marginal loss factor from zero:
//!
//! ```text
//! loss(x) = ∫_0^x factor(s) ds
//! ```
//!
//! so `loss(0) = 0`, the slope on segment `k` is `factor_k`, and adjoining
//! segments agree at their shared breakpoint.
//!
//! # Encodings
//!
//! - **Segment selection**: one fill variable `δ_k ∈ [0, w_k]` per segment
//!   with `flow = x_0 + Σδ_k`, `loss = y_0 + Σ factor_k δ_k`, and a binary per
//!   interior breakpoint forcing segments to fill left to right.
//! - **Convex combination**: weights `λ_i ∈ [0, 1]` per breakpoint with
//!   `Σλ = 1`, `flow = Σλ_i x_i`, `loss = Σλ_i y_i`, and one binary per segment
//!   so at most two adjacent weights are non-zero (SOS2).
//!
//! With non-decreasing factors the curve is convex and the continuous
//! relaxation of either encoding already picks points on the curve.

use nemde_core::{Interconnector, LossModel};
use nemde_solver_common::{LinearProblem, RowSense, VarDomain, VarId};

use crate::config::LossEncoding;
use crate::error::ResolveError;

/// Variables created when a loss curve is encoded into a problem.
#[derive(Debug, Clone)]
pub struct EncodedLoss {
    /// Free variable equal to the curve value at the encoded flow.
    pub loss: VarId,
    /// Fill (`δ`) or weight (`λ`) variables.
    pub pieces: Vec<VarId>,
    pub binaries: Vec<VarId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LossCurve {
    breakpoints: Vec<f64>,
    values: Vec<f64>,
    factors: Vec<f64>,
}

impl LossCurve {
    pub fn from_model(interconnector: &str, model: &LossModel) -> Result<Self, ResolveError> {
        let err = |message: String| ResolveError::LossModel {
            interconnector: interconnector.to_string(),
            message,
        };
        if model.segments.is_empty() {
            return Err(err("no loss segments".into()));
        }

        let mut breakpoints = Vec::with_capacity(model.segments.len() + 1);
        breakpoints.push(-model.loss_lower_limit);
        for segment in &model.segments {
            let previous = breakpoints[breakpoints.len() - 1];
            if !(segment.limit > previous) {
                return Err(err(format!(
                    "segment limit {} does not exceed previous breakpoint {}",
                    segment.limit, previous
                )));
            }
            breakpoints.push(segment.limit);
        }
        let factors: Vec<f64> = model.segments.iter().map(|s| s.factor).collect();

        // Integral from the first breakpoint, then shift so loss(0) = 0.
        let mut cumulative = Vec::with_capacity(breakpoints.len());
        cumulative.push(0.0);
        for k in 0..factors.len() {
            let next = cumulative[k] + factors[k] * (breakpoints[k + 1] - breakpoints[k]);
            cumulative.push(next);
        }
        let origin = interpolate(&breakpoints, &cumulative, &factors, 0.0);
        let values = cumulative.iter().map(|c| c - origin).collect();

        Ok(Self {
            breakpoints,
            values,
            factors,
        })
    }

    pub fn for_interconnector(ic: &Interconnector) -> Result<Self, ResolveError> {
        Self::from_model(ic.id.as_str(), &ic.loss_model)
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Curve value at each breakpoint.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    pub fn segment_count(&self) -> usize {
        self.factors.len()
    }

    pub fn min_flow(&self) -> f64 {
        self.breakpoints[0]
    }

    pub fn max_flow(&self) -> f64 {
        self.breakpoints[self.breakpoints.len() - 1]
    }

    /// Segment containing `flow`; boundary flows resolve to the lower segment.
    /// Flows outside the curve use the end segments.
    pub fn segment_for(&self, flow: f64) -> usize {
        segment_index(&self.breakpoints, flow)
    }

    /// Loss on the line through segment `k`.
    pub fn loss_in_segment(&self, k: usize, flow: f64) -> f64 {
        self.values[k] + self.factors[k] * (flow - self.breakpoints[k])
    }

    pub fn loss_at(&self, flow: f64) -> f64 {
        self.loss_in_segment(self.segment_for(flow), flow)
    }

    /// Non-decreasing factors: relaxed encodings stay on the curve.
    pub fn is_convex(&self) -> bool {
        self.factors.windows(2).all(|w| w[0] <= w[1])
    }

    /// Add the encoding of `loss = curve(flow)` for an existing flow variable.
    pub fn encode(
        &self,
        problem: &mut LinearProblem,
        flow: VarId,
        encoding: LossEncoding,
        name: &str,
    ) -> EncodedLoss {
        let loss = problem.add_variable(
            format!("{name}.loss"),
            f64::NEG_INFINITY,
            f64::INFINITY,
            VarDomain::Continuous,
        );
        match encoding {
            LossEncoding::SegmentSelection => self.encode_segments(problem, flow, loss, name),
            LossEncoding::ConvexCombination => self.encode_weights(problem, flow, loss, name),
        }
    }

    fn encode_segments(
        &self,
        problem: &mut LinearProblem,
        flow: VarId,
        loss: VarId,
        name: &str,
    ) -> EncodedLoss {
        let n = self.segment_count();
        let widths: Vec<f64> = self.breakpoints.windows(2).map(|w| w[1] - w[0]).collect();
        let pieces: Vec<VarId> = widths
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                problem.add_variable(format!("{name}.fill[{k}]"), 0.0, w, VarDomain::Continuous)
            })
            .collect();

        let mut flow_terms = vec![(flow, 1.0)];
        flow_terms.extend(pieces.iter().map(|&d| (d, -1.0)));
        problem.add_row(
            format!("{name}.flow_fill"),
            flow_terms,
            RowSense::Eq,
            self.breakpoints[0],
        );

        let mut loss_terms = vec![(loss, 1.0)];
        loss_terms.extend(pieces.iter().zip(&self.factors).map(|(&d, &f)| (d, -f)));
        problem.add_row(
            format!("{name}.loss_fill"),
            loss_terms,
            RowSense::Eq,
            self.values[0],
        );

        let mut binaries = Vec::with_capacity(n.saturating_sub(1));
        for k in 0..n.saturating_sub(1) {
            let u = problem.add_binary(format!("{name}.full[{k}]"));
            // segment k full before k+1 starts
            problem.add_row(
                format!("{name}.fill_order_lo[{k}]"),
                vec![(pieces[k], 1.0), (u, -widths[k])],
                RowSense::Ge,
                0.0,
            );
            problem.add_row(
                format!("{name}.fill_order_hi[{k}]"),
                vec![(pieces[k + 1], 1.0), (u, -widths[k + 1])],
                RowSense::Le,
                0.0,
            );
            binaries.push(u);
        }

        EncodedLoss {
            loss,
            pieces,
            binaries,
        }
    }

    fn encode_weights(
        &self,
        problem: &mut LinearProblem,
        flow: VarId,
        loss: VarId,
        name: &str,
    ) -> EncodedLoss {
        let pieces: Vec<VarId> = (0..self.breakpoints.len())
            .map(|i| {
                problem.add_variable(format!("{name}.lambda[{i}]"), 0.0, 1.0, VarDomain::Continuous)
            })
            .collect();

        problem.add_row(
            format!("{name}.lambda_sum"),
            pieces.iter().map(|&l| (l, 1.0)).collect(),
            RowSense::Eq,
            1.0,
        );

        let mut flow_terms = vec![(flow, 1.0)];
        flow_terms.extend(pieces.iter().zip(&self.breakpoints).map(|(&l, &x)| (l, -x)));
        problem.add_row(format!("{name}.flow_lambda"), flow_terms, RowSense::Eq, 0.0);

        let mut loss_terms = vec![(loss, 1.0)];
        loss_terms.extend(pieces.iter().zip(&self.values).map(|(&l, &y)| (l, -y)));
        problem.add_row(format!("{name}.loss_lambda"), loss_terms, RowSense::Eq, 0.0);

        let n = self.segment_count();
        let binaries: Vec<VarId> = (0..n)
            .map(|k| problem.add_binary(format!("{name}.segment[{k}]")))
            .collect();
        problem.add_row(
            format!("{name}.segment_sum"),
            binaries.iter().map(|&z| (z, 1.0)).collect(),
            RowSense::Eq,
            1.0,
        );

        // λ_i may be positive only next to the selected segment
        for (i, &lambda) in pieces.iter().enumerate() {
            let mut terms = vec![(lambda, 1.0)];
            if i > 0 {
                terms.push((binaries[i - 1], -1.0));
            }
            if i < n {
                terms.push((binaries[i], -1.0));
            }
            problem.add_row(format!("{name}.sos2[{i}]"), terms, RowSense::Le, 0.0);
        }

        EncodedLoss {
            loss,
            pieces,
            binaries,
        }
    }
}

fn segment_index(breakpoints: &[f64], x: f64) -> usize {
    breakpoints[1..]
        .iter()
        .position(|&upper| x <= upper)
        .unwrap_or(breakpoints.len() - 2)
}

fn interpolate(xs: &[f64], ys: &[f64], slopes: &[f64], x: f64) -> f64 {
    let k = segment_index(xs, x);
    ys[k] + slopes[k] * (x - xs[k])
}
