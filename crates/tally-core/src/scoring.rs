//! Predictive success model
//!
//! Estimates the probability (0-100) that a proposal gets funded from six
//! factors. Each factor adds an independent, bounded effect to a fixed
//! baseline:
//!
//! | Factor                  | Scale     | Neutral   | Effect   | Formula                         |
//! |-------------------------|-----------|-----------|----------|---------------------------------|
//! | `amount`                | STX, >= 0 | reference | -20..+10 | `-8 * log2(amount / reference)` |
//! | `category_success_rate` | 0-100     | 50        | -15..+15 | `(v - 50) * 0.3`                |
//! | `description_quality`   | 1-10      | 5.5       | -9..+9   | `(v - 5.5) * 2`                 |
//! | `reputation`            | 0-100     | 50        | -10..+10 | `(v - 50) * 0.2`                |
//! | `timing_sentiment`      | 0-100     | 50        | -5..+5   | `(v - 50) * 0.1`                |
//! | `competition_level`     | 0-100     | 0         | -10..0   | `-v * 0.1`                      |
//!
//! Missing or non-finite factors take their neutral value, out-of-range ones
//! are clamped to their scale. The point estimate is clamped to
//! `[min_estimate, max_estimate]`; when the clamp engages the breakdown is
//! rescaled so it still sums to `point_estimate - baseline`.
//!
//! The confidence interval is symmetric around the point estimate. With
//! [`IntervalMethod::Empirical`] its half-width is the sample standard
//! deviation of `trials` jittered draws; with [`IntervalMethod::FixedBand`]
//! it is a constant. Either way it is narrowed so it stays within 0-100.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ModelConfig;

/// One named input dimension of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Amount,
    CategorySuccessRate,
    DescriptionQuality,
    Reputation,
    TimingSentiment,
    CompetitionLevel,
}

impl FactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::CategorySuccessRate => "category_success_rate",
            Self::DescriptionQuality => "description_quality",
            Self::Reputation => "reputation",
            Self::TimingSentiment => "timing_sentiment",
            Self::CompetitionLevel => "competition_level",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Amount => "Requested amount",
            Self::CategorySuccessRate => "Category success rate",
            Self::DescriptionQuality => "Description quality",
            Self::Reputation => "Proposer reputation",
            Self::TimingSentiment => "Timing sentiment",
            Self::CompetitionLevel => "Competing proposals",
        }
    }

    pub fn all() -> &'static [FactorKind] {
        &[
            Self::Amount,
            Self::CategorySuccessRate,
            Self::DescriptionQuality,
            Self::Reputation,
            Self::TimingSentiment,
            Self::CompetitionLevel,
        ]
    }

    /// Value that contributes nothing, used when the factor is missing
    fn neutral(&self, amount_reference: f64) -> f64 {
        match self {
            Self::Amount => amount_reference,
            Self::CategorySuccessRate | Self::Reputation | Self::TimingSentiment => 50.0,
            Self::DescriptionQuality => 5.5,
            Self::CompetitionLevel => 0.0,
        }
    }

    /// Most favorable value on the factor's scale
    fn favorable(&self) -> f64 {
        match self {
            Self::Amount | Self::CompetitionLevel => 0.0,
            Self::CategorySuccessRate | Self::Reputation | Self::TimingSentiment => 100.0,
            Self::DescriptionQuality => 10.0,
        }
    }

    fn clamp_to_scale(&self, value: f64) -> f64 {
        match self {
            Self::Amount => value.max(0.0),
            Self::DescriptionQuality => value.clamp(1.0, 10.0),
            _ => value.clamp(0.0, 100.0),
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FactorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amount" => Ok(Self::Amount),
            "category_success_rate" | "category_rate" => Ok(Self::CategorySuccessRate),
            "description_quality" | "description_score" => Ok(Self::DescriptionQuality),
            "reputation" => Ok(Self::Reputation),
            "timing_sentiment" | "timing" => Ok(Self::TimingSentiment),
            "competition_level" | "competition" => Ok(Self::CompetitionLevel),
            _ => Err(format!("Unknown factor: {}", s)),
        }
    }
}

/// Model inputs. Every field is optional so a partially filled calculator
/// can still be scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationFactors {
    pub amount: Option<f64>,
    pub category_success_rate: Option<f64>,
    pub description_quality_score: Option<f64>,
    pub reputation: Option<f64>,
    pub timing_sentiment: Option<f64>,
    pub competition_level: Option<f64>,
}

impl CalculationFactors {
    pub fn get(&self, kind: FactorKind) -> Option<f64> {
        match kind {
            FactorKind::Amount => self.amount,
            FactorKind::CategorySuccessRate => self.category_success_rate,
            FactorKind::DescriptionQuality => self.description_quality_score,
            FactorKind::Reputation => self.reputation,
            FactorKind::TimingSentiment => self.timing_sentiment,
            FactorKind::CompetitionLevel => self.competition_level,
        }
    }

    pub fn set(&mut self, kind: FactorKind, value: Option<f64>) {
        let slot = match kind {
            FactorKind::Amount => &mut self.amount,
            FactorKind::CategorySuccessRate => &mut self.category_success_rate,
            FactorKind::DescriptionQuality => &mut self.description_quality_score,
            FactorKind::Reputation => &mut self.reputation,
            FactorKind::TimingSentiment => &mut self.timing_sentiment,
            FactorKind::CompetitionLevel => &mut self.competition_level,
        };
        *slot = value;
    }

    /// Copy of `self` with every factor present in `overrides` replaced
    pub fn overlay(&self, overrides: &CalculationFactors) -> CalculationFactors {
        let mut merged = self.clone();
        for &kind in FactorKind::all() {
            if let Some(value) = overrides.get(kind) {
                merged.set(kind, Some(value));
            }
        }
        merged
    }
}

/// Direction of a factor's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
    Neutral,
}

impl Sign {
    fn of(value: f64) -> Self {
        if value > 0.005 {
            Sign::Positive
        } else if value < -0.005 {
            Sign::Negative
        } else {
            Sign::Neutral
        }
    }
}

/// One factor's share of the estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: FactorKind,
    /// The input after defaulting and clamping
    pub value: f64,
    /// Points added to (or removed from) the baseline
    pub contribution: f64,
    pub sign: Sign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResult {
    pub point_estimate: f64,
    pub confidence_interval: (f64, f64),
    pub breakdown: Vec<FactorContribution>,
    /// Baseline plus effects before clamping
    pub raw_estimate: f64,
}

impl ProbabilityResult {
    pub fn negative_factors(&self) -> impl Iterator<Item = &FactorContribution> {
        self.breakdown.iter().filter(|c| c.sign == Sign::Negative)
    }
}

/// How the confidence interval half-width is derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// Sample standard deviation of the jittered trials
    Empirical,
    /// Constant half-width
    FixedBand { half_width: f64 },
}

/// Result of the interactive what-if calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub base: ProbabilityResult,
    pub scenario: ProbabilityResult,
    /// `scenario.point_estimate - base.point_estimate`
    pub delta: f64,
}

/// Points gained by moving one factor to its most favorable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorLift {
    pub factor: FactorKind,
    pub lift: f64,
}

/// Weighted-factor success model
#[derive(Debug, Clone, Default)]
pub struct SuccessModel {
    config: ModelConfig,
}

impl SuccessModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Score with the configured seed, or OS entropy when none is set
    pub fn score(&self, factors: &CalculationFactors) -> ProbabilityResult {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.score_with_rng(factors, &mut rng)
    }

    /// Score with an explicit random source for the interval sampling
    pub fn score_with_rng<R: Rng>(
        &self,
        factors: &CalculationFactors,
        rng: &mut R,
    ) -> ProbabilityResult {
        let (point_estimate, raw_estimate, breakdown) = self.estimate(factors);
        let half_width = self
            .half_width(point_estimate, rng)
            .min(point_estimate)
            .min(100.0 - point_estimate)
            .max(0.0);

        ProbabilityResult {
            point_estimate,
            confidence_interval: (point_estimate - half_width, point_estimate + half_width),
            breakdown,
            raw_estimate,
        }
    }

    /// Score `base` and `base` with `overrides` applied
    pub fn what_if(
        &self,
        base: &CalculationFactors,
        overrides: &CalculationFactors,
    ) -> WhatIfResult {
        let base_result = self.score(base);
        let scenario = self.score(&base.overlay(overrides));
        let delta = scenario.point_estimate - base_result.point_estimate;
        WhatIfResult {
            base: base_result,
            scenario,
            delta,
        }
    }

    /// Potential gain per factor, largest first. Factors already at their
    /// best value are omitted.
    pub fn factor_lifts(&self, factors: &CalculationFactors) -> Vec<FactorLift> {
        let (current, _, _) = self.estimate(factors);
        let mut lifts: Vec<FactorLift> = FactorKind::all()
            .iter()
            .map(|&kind| {
                let mut improved = factors.clone();
                improved.set(kind, Some(kind.favorable()));
                let (best, _, _) = self.estimate(&improved);
                FactorLift {
                    factor: kind,
                    lift: best - current,
                }
            })
            .filter(|l| l.lift > 0.005)
            .collect();
        lifts.sort_by(|a, b| {
            b.lift
                .partial_cmp(&a.lift)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        lifts
    }

    /// Deterministic part: (clamped point, raw estimate, breakdown)
    fn estimate(&self, factors: &CalculationFactors) -> (f64, f64, Vec<FactorContribution>) {
        let mut breakdown: Vec<FactorContribution> = FactorKind::all()
            .iter()
            .map(|&kind| {
                let value = self.resolve(kind, factors.get(kind));
                let contribution = self.effect(kind, value);
                FactorContribution {
                    factor: kind,
                    value,
                    contribution,
                    sign: Sign::of(contribution),
                }
            })
            .collect();

        let total: f64 = breakdown.iter().map(|c| c.contribution).sum();
        let raw_estimate = self.config.baseline + total;
        let point_estimate = raw_estimate.clamp(self.config.min_estimate, self.config.max_estimate);

        if point_estimate != raw_estimate && total.abs() > f64::EPSILON {
            let scale = (point_estimate - self.config.baseline) / total;
            for entry in &mut breakdown {
                entry.contribution *= scale;
                entry.sign = Sign::of(entry.contribution);
            }
        }

        (point_estimate, raw_estimate, breakdown)
    }

    fn resolve(&self, kind: FactorKind, value: Option<f64>) -> f64 {
        match value {
            Some(v) if v.is_finite() => kind.clamp_to_scale(v),
            _ => kind.neutral(self.config.amount_reference),
        }
    }

    fn effect(&self, kind: FactorKind, value: f64) -> f64 {
        match kind {
            FactorKind::Amount => {
                let ratio = (value / self.config.amount_reference).max(1e-9);
                (-8.0 * ratio.log2()).clamp(-20.0, 10.0)
            }
            FactorKind::CategorySuccessRate => (value - 50.0) * 0.3,
            FactorKind::DescriptionQuality => (value - 5.5) * 2.0,
            FactorKind::Reputation => (value - 50.0) * 0.2,
            FactorKind::TimingSentiment => (value - 50.0) * 0.1,
            FactorKind::CompetitionLevel => -value * 0.1,
        }
    }

    fn half_width<R: Rng>(&self, point: f64, rng: &mut R) -> f64 {
        match self.config.interval {
            IntervalMethod::FixedBand { half_width } => half_width.abs(),
            IntervalMethod::Empirical => {
                let jitter = self.config.jitter;
                let trials = self.config.trials.max(2);
                if jitter <= 0.0 {
                    return 0.0;
                }
                let samples: Vec<f64> = (0..trials)
                    .map(|_| point + rng.gen_range(-jitter..=jitter))
                    .collect();
                sample_std_dev(&samples)
            }
        }
    }
}

fn sample_std_dev(samples: &[f64]) -> f64 {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Heuristic 1-10 score for a proposal body: length plus coverage of the
/// sections reviewers look for (budget, timeline, deliverables, team).
pub fn description_quality(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 1.0;
    }

    let mut score: f64 = 1.0;
    let len = text.chars().count();
    if len >= 100 {
        score += 2.0;
    }
    if len >= 300 {
        score += 2.0;
    }
    if len >= 800 {
        score += 1.0;
    }

    let lower = text.to_lowercase();
    let sections: [&[&str]; 4] = [
        &["budget", "cost", "breakdown"],
        &["timeline", "milestone", "schedule"],
        &["deliverable", "outcome", "success metric"],
        &["team", "experience", "track record"],
    ];
    for keywords in sections {
        if keywords.iter().any(|k| lower.contains(k)) {
            score += 1.0;
        }
    }

    score.clamp(1.0, 10.0)
}
