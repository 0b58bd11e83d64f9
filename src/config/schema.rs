//! Configuration schema for adjutant.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so the JSON config
//! file can use camelCase keys while Rust code uses snake_case fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::route::Route;

// ---------------------------------------------------------------------------
// Routing config
// ---------------------------------------------------------------------------

/// Tunable knobs of the semantic router and LLM fallback.
///
/// Thresholds and priorities are keyed by route name so they can be re-tuned
/// from telemetry without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Per-route minimum score for the semantic router to commit.
    #[serde(default = "default_thresholds")]
    pub thresholds: HashMap<String, f64>,
    /// Per-route additive priority, breaking near-ties toward specific
    /// domains. Kept as data because the ordering is tuned, not derived.
    #[serde(default = "default_priorities")]
    pub priorities: HashMap<String, f64>,
    /// Two routes within this margin of each other force an abstention.
    #[serde(default = "default_tie_margin")]
    pub tie_margin: f64,
    /// Hard upper bound on the LLM fallback call, in milliseconds.
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    /// How many recent turns the LLM fallback sees.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_thresholds() -> HashMap<String, f64> {
    Route::ALL
        .iter()
        .map(|r| (r.as_str().to_string(), 1.0))
        .collect()
}

fn default_priorities() -> HashMap<String, f64> {
    // Specific domains get a small edge over broad ones.
    let mut m = HashMap::new();
    for route in Route::ALL {
        let p = match route {
            Route::Maintenance | Route::Connector | Route::Schedule => 0.15,
            Route::MailContacts | Route::Document => 0.10,
            Route::Mail | Route::Workspace => 0.05,
            Route::Web | Route::Memory | Route::SmallTalk => 0.0,
        };
        m.insert(route.as_str().to_string(), p);
    }
    m
}

fn default_tie_margin() -> f64 {
    0.15
}

fn default_llm_timeout_ms() -> u64 {
    8_000
}

fn default_context_turns() -> usize {
    3
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            priorities: default_priorities(),
            tie_margin: default_tie_margin(),
            llm_timeout_ms: default_llm_timeout_ms(),
            context_turns: default_context_turns(),
        }
    }
}

impl RoutingConfig {
    pub fn threshold(&self, route: Route) -> f64 {
        self.thresholds.get(route.as_str()).copied().unwrap_or(1.0)
    }

    pub fn priority(&self, route: Route) -> f64 {
        self.priorities.get(route.as_str()).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Planner config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Ask the LLM for a plan when no lexical cue fires and the text has at
    /// least this many words.
    #[serde(default = "default_min_plan_words")]
    pub min_plan_words: usize,
    /// Upper bound on accepted plan length.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_llm_planning")]
    pub llm_planning: bool,
}

fn default_min_plan_words() -> usize {
    12
}

fn default_max_steps() -> usize {
    6
}

fn default_llm_planning() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_plan_words: default_min_plan_words(),
            max_steps: default_max_steps(),
            llm_planning: default_llm_planning(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider / gateway / telemetry / reminders
// ---------------------------------------------------------------------------

/// LLM completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4-5".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
        }
    }
}

/// Gateway (chat surface) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Sender allow-list; empty means every sender is permitted.
    #[serde(default)]
    pub allow_from: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,
    /// Path of the JSONL dataset; `~` is expanded. Empty means the default
    /// location under the data dir.
    #[serde(default)]
    pub path: String,
}

fn default_telemetry_enabled() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersConfig {
    /// Fixed delivery-loop interval, in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_tick_secs() -> u64 {
    30
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Workspace directory for file operations; `~` is expanded. Empty means
    /// the default under the data dir.
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
}
