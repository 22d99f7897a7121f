//! Success estimate commands (score, what-if)

use anyhow::{anyhow, Context, Result};
use tally_core::{
    config::EngineConfig, CalculationFactors, FactorKind, ProbabilityResult, SuccessModel,
};

use crate::cli::FactorArgs;

fn model(config: &EngineConfig, seed: Option<u64>) -> SuccessModel {
    let mut model_config = config.model.clone();
    if seed.is_some() {
        model_config.seed = seed;
    }
    SuccessModel::new(model_config)
}

/// Parse a `FACTOR=VALUE` override
pub fn parse_override(spec: &str) -> Result<(FactorKind, f64)> {
    let (name, value) = spec
        .split_once('=')
        .with_context(|| format!("Expected FACTOR=VALUE, got '{}'", spec))?;
    let factor: FactorKind = name.trim().parse().map_err(|e: String| anyhow!(e))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", factor, value))?;
    Ok((factor, value))
}

fn print_result(heading: &str, result: &ProbabilityResult) {
    let (low, high) = result.confidence_interval;
    println!();
    println!(
        "🎯 {}: {:.1}% (likely {:.1}% to {:.1}%)",
        heading, result.point_estimate, low, high
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for entry in &result.breakdown {
        println!(
            "   {:<24} {:>10.1} {:>+8.1} pts",
            entry.factor.label(),
            entry.value,
            entry.contribution
        );
    }
}

pub fn cmd_score(
    config: &EngineConfig,
    factors: &FactorArgs,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let result = model(config, seed).score(&factors.to_factors());

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result("Success estimate", &result);
    Ok(())
}

pub fn cmd_what_if(
    config: &EngineConfig,
    factors: &FactorArgs,
    overrides: &[String],
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut scenario = CalculationFactors::default();
    for spec in overrides {
        let (factor, value) = parse_override(spec)?;
        scenario.set(factor, Some(value));
    }

    let result = model(config, seed).what_if(&factors.to_factors(), &scenario);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result("Current", &result.base);
    print_result("Scenario", &result.scenario);
    println!();
    println!("   Change: {:+.1} pts", result.delta);
    Ok(())
}
