//! Rule-table insights and recommendations
//!
//! Two ordered tables turn analysis results into text:
//!
//! - **Trend rules** match `(metric, direction, magnitude bucket)` on a
//!   [`TrendReport`]. Rules are evaluated top-to-bottom and each metric is
//!   claimed by the first rule that matches it, so the output order is the
//!   rule order.
//! - **Recommendation rules** are `(predicate, template)` pairs over a
//!   point-in-time [`Snapshot`], also evaluated top-to-bottom.
//!
//! Templates use `{{var}}` placeholders. Both tables are plain data and can
//! be replaced with [`InsightGenerator::with_rules`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{AnalyzerConfig, InsightThresholds, RecommendationThresholds};
use crate::models::{Metric, Snapshot};
use crate::trend::{TrendDirection, TrendReport};

/// Severity level of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Worth attention but not urgent
    Attention,
    /// Should be addressed soon
    Warning,
    /// Requires immediate attention
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Attention => "attention",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Attention => 2,
            Severity::Warning => 3,
            Severity::Alert => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "attention" => Ok(Severity::Attention),
            "warning" => Ok(Severity::Warning),
            "alert" => Ok(Severity::Alert),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Size of a trend relative to the metric's mean over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeBucket {
    Slight,
    Moderate,
    Strong,
}

impl MagnitudeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            MagnitudeBucket::Slight => "slight",
            MagnitudeBucket::Moderate => "moderate",
            MagnitudeBucket::Strong => "strong",
        }
    }

    pub fn classify(report: &TrendReport, thresholds: &InsightThresholds) -> Self {
        let change = report.relative_change.abs();
        if change >= thresholds.strong_change {
            MagnitudeBucket::Strong
        } else if change >= thresholds.moderate_change {
            MagnitudeBucket::Moderate
        } else {
            MagnitudeBucket::Slight
        }
    }
}

impl fmt::Display for MagnitudeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated insight or recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable identifier (e.g., "trend:energy_consumed:rising:strong")
    pub key: String,
    pub severity: Severity,
    /// Short title (e.g., "Consumption Surging")
    pub title: String,
    /// Rendered message
    pub message: String,
    /// Metric the insight is about, when it is about one
    pub source_metric: Option<Metric>,
}

/// Recommendations share the insight shape
pub type Recommendation = Insight;

/// One row of the trend rule table
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRule {
    pub name: &'static str,
    /// None matches any metric
    pub metric: Option<Metric>,
    pub direction: TrendDirection,
    /// None matches any magnitude
    pub bucket: Option<MagnitudeBucket>,
    pub severity: Severity,
    pub title: &'static str,
    pub template: &'static str,
}

impl TrendRule {
    fn matches(&self, report: &TrendReport, bucket: MagnitudeBucket) -> bool {
        self.metric.map_or(true, |m| m == report.metric)
            && self.direction == report.direction
            && self.bucket.map_or(true, |b| b == bucket)
    }
}

/// One row of the recommendation rule table
#[derive(Clone)]
pub struct RecommendationRule {
    pub name: &'static str,
    pub severity: Severity,
    pub source_metric: Option<Metric>,
    pub title: &'static str,
    pub template: &'static str,
    /// Metrics the predicate reads; the rule is skipped when any is non-finite
    pub inputs: &'static [Metric],
    pub applies: fn(&Snapshot, &RecommendationThresholds) -> bool,
}

impl fmt::Debug for RecommendationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("source_metric", &self.source_metric)
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Built-in trend rules, highest priority first
pub fn default_trend_rules() -> Vec<TrendRule> {
    use MagnitudeBucket::*;
    use Metric::*;
    use TrendDirection::*;

    let rule = |name, metric, direction, bucket, severity, title, template| TrendRule {
        name,
        metric,
        direction,
        bucket,
        severity,
        title,
        template,
    };

    vec![
        rule(
            "load_surge",
            Some(CurrentLoad),
            Rising,
            Some(Strong),
            Severity::Warning,
            "Load Climbing Fast",
            "Load rose {{change_pct}}% over the last {{span}}h ({{slope}}/h). Review capacity headroom before peak hours.",
        ),
        rule(
            "consumption_surge",
            Some(EnergyConsumed),
            Rising,
            Some(Strong),
            Severity::Warning,
            "Consumption Surging",
            "Energy consumption rose {{change_pct}}% over the last {{span}}h ({{slope}}/h). Check for equipment left running or new loads.",
        ),
        rule(
            "efficiency_collapse",
            Some(Efficiency),
            Falling,
            Some(Strong),
            Severity::Warning,
            "Efficiency Dropping",
            "Efficiency fell {{change_pct}}% over the last {{span}}h. Schedule an inspection of conversion equipment.",
        ),
        rule(
            "efficiency_decline",
            Some(Efficiency),
            Falling,
            None,
            Severity::Attention,
            "Efficiency Declining",
            "Efficiency is trending down ({{slope}}/h over {{window}} readings). Panels may need cleaning or maintenance.",
        ),
        rule(
            "production_drop",
            Some(EnergyProduced),
            Falling,
            Some(Strong),
            Severity::Attention,
            "Production Dropping",
            "Energy production fell {{change_pct}}% over the last {{span}}h. Verify generation assets are online.",
        ),
        rule(
            "consumption_rise",
            Some(EnergyConsumed),
            Rising,
            Some(Moderate),
            Severity::Attention,
            "Consumption Rising",
            "Energy consumption is up {{change_pct}}% over the last {{span}}h. Consider shifting flexible loads off-peak.",
        ),
        rule(
            "load_rise",
            Some(CurrentLoad),
            Rising,
            Some(Moderate),
            Severity::Attention,
            "Load Rising",
            "Load is up {{change_pct}}% over the last {{span}}h ({{slope}}/h).",
        ),
        rule(
            "production_gain",
            Some(EnergyProduced),
            Rising,
            None,
            Severity::Info,
            "Production Improving",
            "Energy production is up {{change_pct}}% over the last {{span}}h. Surplus may be available for storage.",
        ),
        rule(
            "consumption_saving",
            Some(EnergyConsumed),
            Falling,
            None,
            Severity::Info,
            "Consumption Decreasing",
            "Energy consumption is down {{change_pct}}% over the last {{span}}h. Recent savings measures appear effective.",
        ),
        rule(
            "efficiency_gain",
            Some(Efficiency),
            Rising,
            None,
            Severity::Info,
            "Efficiency Improving",
            "Efficiency is trending up ({{slope}}/h over {{window}} readings).",
        ),
        rule(
            "generic_rise",
            None,
            Rising,
            None,
            Severity::Info,
            "Trending Up",
            "{{label}} is trending up {{change_pct}}% over the last {{span}}h.",
        ),
        rule(
            "generic_fall",
            None,
            Falling,
            None,
            Severity::Info,
            "Trending Down",
            "{{label}} is trending down {{change_pct}}% over the last {{span}}h.",
        ),
        rule(
            "steady",
            None,
            Stable,
            None,
            Severity::Info,
            "Stable",
            "{{label}} has been stable over the last {{span}}h (mean {{mean}}).",
        ),
    ]
}

/// Built-in recommendation rules, highest priority first
pub fn default_recommendation_rules() -> Vec<RecommendationRule> {
    vec![
        RecommendationRule {
            name: "load_critical",
            severity: Severity::Alert,
            source_metric: Some(Metric::CurrentLoad),
            title: "Critical Load",
            template: "Current load {{current_load}} is {{load_ratio_pct}}% of capacity {{capacity}}. Shed non-essential loads immediately.",
            inputs: &[Metric::CurrentLoad],
            applies: |s, t| s.load_ratio().is_some_and(|r| r >= t.critical_load_ratio),
        },
        RecommendationRule {
            name: "load_high",
            severity: Severity::Warning,
            source_metric: Some(Metric::CurrentLoad),
            title: "High Load",
            template: "Current load {{current_load}} is {{load_ratio_pct}}% of capacity {{capacity}} (threshold {{warning_ratio_pct}}%). Defer flexible loads to off-peak hours.",
            inputs: &[Metric::CurrentLoad],
            applies: |s, t| {
                s.load_ratio()
                    .is_some_and(|r| r >= t.load_warning_ratio && r < t.critical_load_ratio)
            },
        },
        RecommendationRule {
            name: "efficiency_low",
            severity: Severity::Warning,
            source_metric: Some(Metric::Efficiency),
            title: "Low Efficiency",
            template: "Efficiency is {{efficiency_pct}}%, below the {{efficiency_floor_pct}}% floor. Inspect panels and inverters for soiling or faults.",
            inputs: &[Metric::Efficiency],
            applies: |s, t| s.efficiency < t.efficiency_floor,
        },
        RecommendationRule {
            name: "energy_deficit",
            severity: Severity::Attention,
            source_metric: Some(Metric::EnergyConsumed),
            title: "Energy Deficit",
            template: "Consumption {{energy_consumed}} exceeds production {{energy_produced}} by {{deficit}}. Consider load shifting or drawing on storage.",
            inputs: &[Metric::EnergyProduced, Metric::EnergyConsumed],
            applies: |s, t| s.energy_consumed > s.energy_produced * (1.0 + t.balance_margin),
        },
        RecommendationRule {
            name: "energy_surplus",
            severity: Severity::Info,
            source_metric: Some(Metric::EnergyProduced),
            title: "Energy Surplus",
            template: "Production {{energy_produced}} exceeds consumption {{energy_consumed}} by {{surplus}}. Store or export the surplus.",
            inputs: &[Metric::EnergyProduced, Metric::EnergyConsumed],
            applies: |s, t| s.energy_produced > s.energy_consumed * (1.0 + t.balance_margin),
        },
        RecommendationRule {
            name: "efficiency_excellent",
            severity: Severity::Info,
            source_metric: Some(Metric::Efficiency),
            title: "Operating Efficiently",
            template: "Efficiency is {{efficiency_pct}}% with load and supply in balance. No action needed.",
            inputs: &Metric::ALL,
            applies: |s, t| {
                let balanced = s.energy_consumed <= s.energy_produced * (1.0 + t.balance_margin)
                    && s.energy_produced <= s.energy_consumed * (1.0 + t.balance_margin);
                let load_ok = s.load_ratio().map_or(true, |r| r < t.load_warning_ratio);
                s.efficiency >= t.efficiency_excellent && balanced && load_ok
            },
        },
    ]
}

/// Maps trend reports and snapshots to ordered insights
#[derive(Debug, Clone)]
pub struct InsightGenerator {
    insight_thresholds: InsightThresholds,
    recommendation_thresholds: RecommendationThresholds,
    trend_rules: Vec<TrendRule>,
    recommendation_rules: Vec<RecommendationRule>,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl InsightGenerator {
    /// Create a generator with the built-in rule tables
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_rules(
            config,
            default_trend_rules(),
            default_recommendation_rules(),
        )
    }

    /// Create a generator with custom rule tables
    pub fn with_rules(
        config: &AnalyzerConfig,
        trend_rules: Vec<TrendRule>,
        recommendation_rules: Vec<RecommendationRule>,
    ) -> Self {
        Self {
            insight_thresholds: config.insights.clone(),
            recommendation_thresholds: config.recommendations.clone(),
            trend_rules,
            recommendation_rules,
        }
    }

    /// Turn trend reports into ordered insights
    pub fn insights(&self, reports: &BTreeMap<Metric, TrendReport>) -> Vec<Insight> {
        let analyzable: Vec<&TrendReport> = Metric::ALL
            .iter()
            .filter_map(|m| reports.get(m))
            .filter(|r| r.direction != TrendDirection::InsufficientData)
            .collect();

        if analyzable.is_empty() {
            let available = reports.values().map(|r| r.window_size).max().unwrap_or(0);
            return vec![Insight {
                key: "trend:insufficient_data".to_string(),
                severity: Severity::Info,
                title: "Not Enough Data".to_string(),
                message: format!(
                    "Not enough readings to identify trends ({} available).",
                    available
                ),
                source_metric: None,
            }];
        }

        let buckets: Vec<MagnitudeBucket> = analyzable
            .iter()
            .map(|r| MagnitudeBucket::classify(r, &self.insight_thresholds))
            .collect();

        let mut claimed: HashSet<Metric> = HashSet::new();
        let mut insights = Vec::new();

        for rule in &self.trend_rules {
            for (report, &bucket) in analyzable.iter().zip(&buckets) {
                if claimed.contains(&report.metric) || !rule.matches(report, bucket) {
                    continue;
                }
                claimed.insert(report.metric);
                insights.push(Insight {
                    key: format!("trend:{}:{}:{}", report.metric, report.direction, bucket),
                    severity: rule.severity,
                    title: rule.title.to_string(),
                    message: render(rule.template, &trend_vars(report)),
                    source_metric: Some(report.metric),
                });
            }
        }

        for report in &analyzable {
            if report.volatility_ratio() > self.insight_thresholds.volatility_ratio {
                insights.push(Insight {
                    key: format!("volatility:{}", report.metric),
                    severity: Severity::Attention,
                    title: "Volatile Readings".to_string(),
                    message: render(
                        "{{label}} is volatile: readings deviate {{volatility}} ({{volatility_pct}}% of the mean) from the trend line.",
                        &trend_vars(report),
                    ),
                    source_metric: Some(report.metric),
                });
            }
        }

        insights
    }

    /// Evaluate the recommendation table against a snapshot
    pub fn recommendations(&self, snapshot: &Snapshot) -> Vec<Recommendation> {
        let vars = snapshot_vars(snapshot, &self.recommendation_thresholds);

        self.recommendation_rules
            .iter()
            .filter(|rule| rule.inputs.iter().all(|&m| snapshot.value_of(m).is_finite()))
            .filter(|rule| (rule.applies)(snapshot, &self.recommendation_thresholds))
            .map(|rule| Recommendation {
                key: format!("recommendation:{}", rule.name),
                severity: rule.severity,
                title: rule.title.to_string(),
                message: render(rule.template, &vars),
                source_metric: rule.source_metric,
            })
            .collect()
    }
}

fn trend_vars(report: &TrendReport) -> Vec<(&'static str, String)> {
    vec![
        ("label", report.metric.label().to_string()),
        ("metric", report.metric.as_str().to_string()),
        ("direction", report.direction.as_str().to_string()),
        ("slope", format!("{:+.3}", report.slope)),
        ("change_pct", format!("{:.0}", report.relative_change.abs() * 100.0)),
        ("span", format!("{:.0}", report.span_hours)),
        ("mean", format!("{:.2}", report.mean)),
        ("volatility", format!("{:.2}", report.volatility)),
        ("volatility_pct", format!("{:.0}", report.volatility_ratio() * 100.0)),
        ("window", report.window_size.to_string()),
    ]
}

fn snapshot_vars(
    snapshot: &Snapshot,
    thresholds: &RecommendationThresholds,
) -> Vec<(&'static str, String)> {
    let ratio = snapshot.load_ratio().unwrap_or(0.0);
    vec![
        ("current_load", format!("{:.1}", snapshot.current_load)),
        (
            "capacity",
            snapshot
                .capacity
                .map(|c| format!("{:.1}", c))
                .unwrap_or_else(|| "unknown".to_string()),
        ),
        ("load_ratio_pct", format!("{:.0}", ratio * 100.0)),
        ("warning_ratio_pct", format!("{:.0}", thresholds.load_warning_ratio * 100.0)),
        ("efficiency_pct", format!("{:.0}", snapshot.efficiency * 100.0)),
        ("efficiency_floor_pct", format!("{:.0}", thresholds.efficiency_floor * 100.0)),
        ("energy_produced", format!("{:.1}", snapshot.energy_produced)),
        ("energy_consumed", format!("{:.1}", snapshot.energy_consumed)),
        (
            "deficit",
            format!("{:.1}", (snapshot.energy_consumed - snapshot.energy_produced).max(0.0)),
        ),
        (
            "surplus",
            format!("{:.1}", (snapshot.energy_produced - snapshot.energy_consumed).max(0.0)),
        ),
    ]
}

/// Simple mustache-style replacement: {{var}}
fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}
