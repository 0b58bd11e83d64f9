//! Semantic router: confidence-scored route selection over keyword profiles.
//!
//! Each route has a small weighted keyword/phrase profile. The router scores
//! every allowed route against the normalized text, applies light length and
//! position heuristics, and commits to the best route only when its score
//! clears that route's configured threshold and no runner-up ties within the
//! margin. Abstaining returns `None`, which means "escalate to the LLM
//! fallback" — never "no route".

use serde::Serialize;

use crate::config::schema::RoutingConfig;
use crate::routing::route::Route;

/// A scored runner-up, kept for telemetry and threshold tuning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRoute {
    pub route: Route,
    pub score: f64,
}

/// The committed outcome of semantic routing for one message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    pub route: Route,
    pub score: f64,
    pub reason: String,
    pub alternatives: Vec<ScoredRoute>,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Weighted vocabulary for one route. Keywords match on word boundaries,
/// phrases as substrings of the normalized text.
struct RouteProfile {
    route: Route,
    keywords: &'static [(&'static str, f64)],
    phrases: &'static [(&'static str, f64)],
}

/// Tuned by trial against routing telemetry, not from first principles;
/// adjust thresholds/priorities in config rather than editing weights here.
const PROFILES: &[RouteProfile] = &[
    RouteProfile {
        route: Route::SmallTalk,
        keywords: &[
            ("hello", 1.0),
            ("hi", 1.0),
            ("hey", 1.0),
            ("thanks", 0.9),
            ("joke", 0.8),
        ],
        phrases: &[("how are you", 1.2), ("good morning", 1.2), ("what can you do", 1.0)],
    },
    RouteProfile {
        route: Route::Maintenance,
        keywords: &[("restart", 0.8), ("update", 0.6), ("logs", 0.7), ("status", 0.7)],
        phrases: &[
            ("are you running", 1.4),
            ("restart yourself", 1.6),
            ("update the assistant", 1.4),
            ("health check", 1.2),
        ],
    },
    RouteProfile {
        route: Route::Connector,
        keywords: &[
            ("connector", 1.2),
            ("bridge", 0.9),
            ("integration", 0.9),
            ("telegram", 0.8),
            ("whatsapp", 0.8),
            ("imap", 0.8),
            ("smtp", 0.8),
        ],
        phrases: &[("start the", 0.4), ("stop the", 0.4), ("is the", 0.2)],
    },
    RouteProfile {
        route: Route::Schedule,
        keywords: &[("remind", 1.3), ("reminder", 1.3), ("reminders", 1.2), ("schedule", 0.9)],
        phrases: &[("remind me", 1.6), ("set a reminder", 1.6), ("every day", 0.6)],
    },
    RouteProfile {
        route: Route::Memory,
        keywords: &[("remember", 1.0), ("recall", 1.0), ("mention", 0.6)],
        phrases: &[
            ("do you remember", 1.6),
            ("what did i tell you", 1.6),
            ("what did i say", 1.5),
            ("we talked about", 1.3),
        ],
    },
    RouteProfile {
        route: Route::MailContacts,
        keywords: &[("contact", 1.1), ("contacts", 1.1), ("address", 0.7)],
        phrases: &[
            ("save the contact", 1.6),
            ("email of", 1.3),
            ("email address of", 1.5),
            ("list contacts", 1.5),
        ],
    },
    RouteProfile {
        route: Route::Mail,
        keywords: &[
            ("mail", 1.0),
            ("email", 1.0),
            ("emails", 1.0),
            ("inbox", 1.1),
            ("send", 0.5),
            ("unread", 0.8),
        ],
        phrases: &[
            ("check my", 0.6),
            ("send a mail", 1.4),
            ("send an email", 1.4),
            ("new emails", 1.2),
            ("read the mail", 1.2),
        ],
    },
    RouteProfile {
        route: Route::Workspace,
        keywords: &[
            ("file", 1.0),
            ("files", 1.0),
            ("folder", 1.0),
            ("directory", 1.0),
            ("workspace", 1.1),
            ("delete", 0.8),
            ("create", 0.6),
            ("move", 0.5),
            ("rename", 0.7),
        ],
        phrases: &[("list the files", 1.5), ("in the workspace", 1.0)],
    },
    RouteProfile {
        route: Route::Document,
        keywords: &[
            ("pdf", 1.1),
            ("docx", 1.1),
            ("summarize", 1.0),
            ("summarise", 1.0),
            ("summary", 0.8),
            ("extract", 0.8),
        ],
        phrases: &[("read the document", 1.4)],
    },
    RouteProfile {
        route: Route::Web,
        keywords: &[
            ("search", 1.0),
            ("google", 1.2),
            ("web", 0.9),
            ("internet", 0.9),
            ("online", 0.7),
            ("url", 0.8),
            ("website", 0.9),
        ],
        phrases: &[
            ("search the web", 1.6),
            ("look up", 1.1),
            ("search for", 1.2),
            ("open the", 0.4),
        ],
    },
];

/// Bonus when a profile keyword opens the message.
const POSITION_BONUS: f64 = 0.3;
/// Bonus for very short messages made up mostly of profile vocabulary.
const DENSITY_BONUS: f64 = 0.2;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Deterministic scorer: identical (text, allowed, config) always produces
/// the identical decision.
pub struct SemanticRouter {
    config: RoutingConfig,
}

impl SemanticRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// Score `allowed` routes against the text; `None` is an abstention.
    pub fn route(&self, normalized: &str, allowed: &[Route]) -> Option<RouteDecision> {
        if normalized.is_empty() || allowed.is_empty() {
            return None;
        }

        let mut scored: Vec<ScoredRoute> = Vec::new();
        for profile in PROFILES {
            if !allowed.contains(&profile.route) {
                continue;
            }
            let score = score_profile(profile, normalized) + self.config.priority(profile.route);
            scored.push(ScoredRoute {
                route: profile.route,
                score,
            });
        }

        // Highest score first; stable order (profile table order) on ties.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let best = scored.first()?.clone();
        let threshold = self.config.threshold(best.route);
        if best.score < threshold {
            return None;
        }
        if let Some(second) = scored.get(1) {
            if best.score - second.score < self.config.tie_margin && second.score >= threshold {
                // Ambiguous: two plausible routes within the margin.
                return None;
            }
        }

        let alternatives: Vec<ScoredRoute> = scored.iter().skip(1).take(3).cloned().collect();
        Some(RouteDecision {
            reason: format!("score {:.2} >= threshold {:.2}", best.score, threshold),
            route: best.route,
            score: best.score,
            alternatives,
        })
    }
}

fn score_profile(profile: &RouteProfile, normalized: &str) -> f64 {
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    let mut matched_words = 0usize;
    for (kw, weight) in profile.keywords {
        if words.contains(kw) {
            score += weight;
            matched_words += 1;
        }
    }
    for (phrase, weight) in profile.phrases {
        if normalized.contains(phrase) {
            score += weight;
        }
    }
    if score == 0.0 {
        return 0.0;
    }

    if profile.keywords.iter().any(|(kw, _)| words[0] == *kw) {
        score += POSITION_BONUS;
    }
    if words.len() <= 3 && matched_words * 2 >= words.len() {
        score += DENSITY_BONUS;
    }
    score
}
