//! Bucket and insight feed commands

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tally_core::{
    aggregate, config::EngineConfig, db::Database, FeedManager, FeedQuery, Insight,
    InsightEngine, InsightType, Period, Role, SortBy, TimeBucket, UserContext,
};

use super::{load_proposals, truncate};
use crate::cli::InsightsArgs;

pub fn cmd_buckets(
    config: &EngineConfig,
    proposals_path: &Path,
    period: Option<&str>,
    json: bool,
) -> Result<()> {
    let period: Period = match period {
        Some(p) => p.parse().map_err(|e: String| anyhow!(e))?,
        None => config.period,
    };
    let proposals = load_proposals(proposals_path)?;
    let buckets = aggregate(&proposals, period).context("Failed to aggregate proposals")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&buckets)?);
        return Ok(());
    }

    print_buckets(period, &buckets);
    Ok(())
}

fn print_buckets(period: Period, buckets: &[TimeBucket]) {
    println!();
    println!("📊 {} buckets ({})", buckets.len(), period);
    println!(
        "   {:<22} {:>6} {:>12} {:>9} {:>9}",
        "Period", "Count", "Funding", "Approval", "Turnout"
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for bucket in buckets {
        let rate = bucket
            .approval_rate
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "-".to_string());
        let turnout = bucket
            .average_participation
            .map(|r| format!("{:.1}%", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<22} {:>6} {:>12.0} {:>9} {:>9}",
            period.label(bucket.period_start),
            bucket.proposal_count,
            bucket.total_funding,
            rate,
            turnout
        );
    }
}

/// Viewer context from the flags, `None` when no viewer details were given
fn build_user(
    args: &InsightsArgs,
    proposals: &[tally_core::Proposal],
) -> Result<Option<UserContext>> {
    if args.user_history.is_none() && args.last_proposal.is_none() && args.follows.is_empty() {
        return Ok(None);
    }

    let role: Role = args.role.parse().map_err(|e: String| anyhow!(e))?;
    let mut user = UserContext::new(role).with_preferences(args.follows.clone());

    if let Some(path) = &args.user_history {
        user = user.with_history(load_proposals(path)?);
    }
    if let Some(id) = &args.last_proposal {
        let proposal = proposals
            .iter()
            .find(|p| &p.id == id)
            .with_context(|| format!("Proposal {} not found in the proposal file", id))?;
        user = user.with_last_proposal(proposal.clone());
    }
    Ok(Some(user))
}

/// Translate flags into a feed query, falling back to the configured sort
pub fn feed_query(args: &InsightsArgs, default_sort: SortBy) -> Result<FeedQuery> {
    let insight_type = args
        .insight_type
        .as_deref()
        .map(|t| t.parse::<InsightType>())
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let sort = match args.sort.as_deref() {
        Some(s) => s.parse::<SortBy>().map_err(|e| anyhow!(e))?,
        None => default_sort,
    };

    Ok(FeedQuery {
        insight_type,
        search: args.search.clone(),
        sort,
        limit: args.limit,
    })
}

pub fn cmd_insights(db: &Database, config: &EngineConfig, args: &InsightsArgs) -> Result<()> {
    let query = feed_query(args, config.default_sort)?;
    let proposals = load_proposals(&args.proposals)?;
    let user = build_user(args, &proposals)?;

    let engine = InsightEngine::new(config.clone());
    let insights = engine
        .run(&proposals, user.as_ref())
        .context("Failed to generate insights")?;

    let manager = FeedManager::new(db.clone());
    let feed = manager
        .feed(&args.viewer, &insights, &query)
        .context("Failed to build feed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
        return Ok(());
    }

    print_feed(&feed, insights.len());
    Ok(())
}

fn priority_badge(insight: &Insight) -> &'static str {
    match insight.priority {
        tally_core::Priority::High => "🔴 HIGH",
        tally_core::Priority::Medium => "🟡 MED ",
        tally_core::Priority::Low => "⚪ LOW ",
    }
}

fn print_feed(feed: &[Insight], generated: usize) {
    println!();
    if feed.is_empty() {
        println!("✨ No insights to show ({} generated)", generated);
        return;
    }

    println!("💡 {} insights ({} generated)", feed.len(), generated);
    println!("   ─────────────────────────────────────────────────────────────");
    for insight in feed {
        println!(
            "   {} [{}] {}",
            priority_badge(insight),
            insight.insight_type(),
            insight.title
        );
        println!("        {}", truncate(&insight.description, 100));
        for rec in &insight.recommendations {
            println!(
                "        → {} (+{:.1} pts, effort {})",
                rec.title, rec.impact, rec.effort
            );
        }
        println!(
            "        id: {}  ({})",
            insight.id,
            insight.timestamp.format("%Y-%m-%d")
        );
    }
    println!();
    println!("   Dismiss with: tally dismiss <id>");
}
