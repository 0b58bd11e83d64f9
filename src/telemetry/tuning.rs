//! Offline threshold tuning over the telemetry dataset.
//!
//! A semantic-router selection counts as a true positive when the final route
//! matched it, and as a false positive otherwise (the fallback or handler
//! overrode it). Malformed lines are skipped, never fatal.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use super::sink::TelemetryEntry;
use crate::config::schema::RoutingConfig;
use crate::routing::route::Route;

/// Minimum false positives before the suggestion splits the two score
/// distributions instead of using the true-positive quantile.
const FP_SPLIT_MIN: usize = 3;

#[derive(Debug, Clone)]
pub struct RouteStats {
    pub route: Route,
    /// Times the semantic router selected this route.
    pub selected: usize,
    /// Selections where the final route agreed.
    pub hits: usize,
    pub false_positives: usize,
    pub precision: f64,
    pub avg_score: f64,
    pub current_threshold: f64,
    pub suggested_threshold: Option<f64>,
}

/// Compute per-route stats from the JSONL dataset at `path`.
pub fn route_stats(path: &Path, config: &RoutingConfig) -> Result<Vec<RouteStats>> {
    let mut tp_scores: HashMap<Route, Vec<f64>> = HashMap::new();
    let mut fp_scores: HashMap<Route, Vec<f64>> = HashMap::new();

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut skipped = 0usize;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: TelemetryEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let (Some(route), Some(score)) = (entry.semantic_route, entry.semantic_score) else {
            continue;
        };
        if entry.final_route == Some(route) {
            tp_scores.entry(route).or_default().push(score);
        } else {
            fp_scores.entry(route).or_default().push(score);
        }
    }
    if skipped > 0 {
        debug!(skipped, "skipped malformed telemetry lines");
    }

    let mut out = Vec::new();
    for route in Route::ALL {
        let tp = tp_scores.remove(&route).unwrap_or_default();
        let fp = fp_scores.remove(&route).unwrap_or_default();
        let selected = tp.len() + fp.len();
        if selected == 0 {
            continue;
        }
        let all_sum: f64 = tp.iter().chain(fp.iter()).sum();
        out.push(RouteStats {
            route,
            selected,
            hits: tp.len(),
            false_positives: fp.len(),
            precision: tp.len() as f64 / selected as f64,
            avg_score: all_sum / selected as f64,
            current_threshold: config.threshold(route),
            suggested_threshold: suggest_threshold(&tp, &fp),
        });
    }
    Ok(out)
}

/// Suggest a per-route threshold from observed scores.
///
/// With enough false positives the midpoint between the two distribution
/// means separates them; otherwise the 20th percentile of true-positive
/// scores gives a floor that keeps 80% of known-good selections.
fn suggest_threshold(tp: &[f64], fp: &[f64]) -> Option<f64> {
    if fp.len() >= FP_SPLIT_MIN && !tp.is_empty() {
        let tp_mean: f64 = tp.iter().sum::<f64>() / tp.len() as f64;
        let fp_mean: f64 = fp.iter().sum::<f64>() / fp.len() as f64;
        if fp_mean < tp_mean {
            return Some((tp_mean + fp_mean) / 2.0);
        }
    }
    quantile(tp, 0.2)
}

fn quantile(scores: &[f64], q: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = (sorted.len() as f64 - 1.0) * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

/// Render the stats report for the CLI.
pub fn format_stats_report(stats: &[RouteStats]) -> String {
    if stats.is_empty() {
        return "No routing telemetry recorded yet.".to_string();
    }
    let mut out = String::from(
        "route          selected  hits  false+  precision  avg score  threshold  suggested\n",
    );
    for s in stats {
        let suggested = s
            .suggested_threshold
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<14} {:>8}  {:>4}  {:>6}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}\n",
            s.route.as_str(),
            s.selected,
            s.hits,
            s.false_positives,
            s.precision,
            s.avg_score,
            s.current_threshold,
            suggested,
        ));
    }
    out
}
