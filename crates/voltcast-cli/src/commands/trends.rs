//! Trend and insight command implementations

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use voltcast_core::{
    EnergyIntelligence, Insight, Metric, Reading, Severity, TrendDirection, TrendReport,
};

use super::{load_config, load_readings, print_json, truncate};

fn analyze(
    service: &EnergyIntelligence,
    readings: &[Reading],
    hours: Option<i64>,
) -> BTreeMap<Metric, TrendReport> {
    match hours {
        Some(hours) => service.analyze_trends_window(readings, hours),
        None => service.analyze_trends(readings),
    }
}

pub fn cmd_trends(
    data: &Path,
    config_path: Option<&Path>,
    facility: i64,
    hours: Option<i64>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let readings = load_readings(data, facility)?;
    let service = EnergyIntelligence::new(&config);
    let reports = analyze(&service, &readings, hours);

    if json {
        let reports: Vec<&TrendReport> = reports.values().collect();
        return print_json(&reports);
    }

    println!();
    match hours {
        Some(h) => println!("📈 Trends (facility {}, last {}h)", facility, h),
        None => println!("📈 Trends (facility {})", facility),
    }
    println!("   ───────────────────────────────────────────────────────────────────");
    println!(
        "   {:<20} {:<18} {:>10} {:>10} {:>10} {:>6}",
        "Metric", "Direction", "Slope/h", "Mean", "Volatility", "N"
    );

    for report in reports.values() {
        println!(
            "   {:<20} {:<18} {:>10.3} {:>10.2} {:>10.2} {:>6}",
            report.metric.label(),
            format!("{} {}", direction_icon(report.direction), report.direction),
            report.slope,
            report.mean,
            report.volatility,
            report.window_size
        );
    }
    println!();

    Ok(())
}

pub fn cmd_insights(
    data: &Path,
    config_path: Option<&Path>,
    facility: i64,
    hours: Option<i64>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let readings = load_readings(data, facility)?;
    let service = EnergyIntelligence::new(&config);
    let reports = analyze(&service, &readings, hours);
    let insights = service.get_trend_insights(&reports);

    if json {
        return print_json(&insights);
    }

    println!();
    println!("💡 Insights (facility {})", facility);
    println!("   ─────────────────────────────────────────────────────────────");
    print_insights(&insights);

    Ok(())
}

pub(crate) fn print_insights(insights: &[Insight]) {
    if insights.is_empty() {
        println!("   Nothing to report.");
        println!();
        return;
    }

    for insight in insights {
        println!(
            "   {} [{}] {}",
            severity_icon(insight.severity),
            insight.severity,
            insight.title
        );
        println!("      {}", truncate(&insight.message, 160));
    }
    println!();
}

pub(crate) fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "ℹ️ ",
        Severity::Attention => "👀",
        Severity::Warning => "⚠️ ",
        Severity::Alert => "🚨",
    }
}

fn direction_icon(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Rising => "↑",
        TrendDirection::Falling => "↓",
        TrendDirection::Stable => "→",
        TrendDirection::InsufficientData => "?",
    }
}
