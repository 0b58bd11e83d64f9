//! Sequence planner: one instruction, N ordered steps.
//!
//! Two independent triggers. Lexical chain cues ("first ... then ...") split
//! the raw text by simple separators; when none fire and the text is long
//! enough, the completion service is asked for a structured plan. Only plans
//! of two or more steps are accepted; anything else is treated as a single
//! non-sequenced instruction. Steps re-enter the full pipeline one at a time
//! via an explicit queue, never recursion.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::schema::PlannerConfig;
use crate::providers::CompletionClient;
use crate::routing::normalize::word_count;

/// One pipeline re-entry unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// 1-based position, carried into telemetry source tags.
    pub index: usize,
    pub text: String,
    /// Optional "generate content for this step" sub-prompt from LLM plans.
    pub content_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    fn from_texts(texts: Vec<String>) -> Self {
        let steps = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PlanStep {
                index: i + 1,
                text,
                content_prompt: None,
            })
            .collect();
        Self { steps }
    }
}

// ---------------------------------------------------------------------------
// Lexical chain split
// ---------------------------------------------------------------------------

static CHAIN_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:and then|then|after that|afterwards|next,)\b|;\s+|\n\s*\d+[.)]\s+")
        .expect("chain separator regex")
});

static LEADING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:first|second|third|finally|lastly|next|ok|please)[,:]?\s+")
        .expect("leading marker regex")
});

static NUMBERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\d+[.)]\s+").expect("numbered marker regex"));

/// Split on sequencing connectives. Returns `None` unless at least two
/// non-trivial segments come out.
fn split_lexical(raw: &str) -> Option<Vec<String>> {
    // A preamble before the first numbered item ("do these:") introduces the
    // list, it is not a step of its own.
    let raw = match NUMBERED_MARKER.find(raw) {
        Some(m) if m.start() > 0 => &raw[m.start()..],
        _ => raw,
    };
    // A chain needs an actual connective, not just a comma.
    if !CHAIN_SEPARATOR.is_match(raw) {
        return None;
    }
    let segments: Vec<String> = CHAIN_SEPARATOR
        .split(raw)
        .map(|s| {
            let s = s.trim().trim_matches(',').trim();
            LEADING_MARKER.replace(s, "").trim().to_string()
        })
        .filter(|s| word_count(s) >= 2)
        .collect();
    if segments.len() >= 2 {
        Some(segments)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// LLM plan
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    text: String,
    #[serde(default)]
    content_prompt: Option<String>,
}

/// Parse a plan reply, tolerating code fences and surrounding prose.
fn parse_plan_reply(reply: &str, max_steps: usize) -> Option<Vec<PlanStep>> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    let raw: RawPlan = serde_json::from_str(&reply[start..=end]).ok()?;

    let steps: Vec<PlanStep> = raw
        .steps
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .take(max_steps)
        .enumerate()
        .map(|(i, s)| PlanStep {
            index: i + 1,
            text: s.text.trim().to_string(),
            content_prompt: s.content_prompt.filter(|c| !c.trim().is_empty()),
        })
        .collect();
    if steps.len() >= 2 {
        Some(steps)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct Planner {
    config: PlannerConfig,
    client: Option<Arc<dyn CompletionClient>>,
    timeout: Duration,
}

impl Planner {
    pub fn new(
        config: PlannerConfig,
        client: Option<Arc<dyn CompletionClient>>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            config,
            client,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Decide whether `raw` is a multi-step instruction.
    ///
    /// Lexical cues win outright. The LLM is consulted only when no cue
    /// fires, planning is enabled, and the text is long enough to plausibly
    /// contain several instructions. Every failure mode yields `None`.
    pub async fn plan(&self, raw: &str) -> Option<Plan> {
        if let Some(segments) = split_lexical(raw) {
            let segments: Vec<String> =
                segments.into_iter().take(self.config.max_steps).collect();
            debug!(steps = segments.len(), "lexical chain split");
            return Some(Plan::from_texts(segments));
        }

        if !self.config.llm_planning || word_count(raw) < self.config.min_plan_words {
            return None;
        }
        let client = self.client.as_ref()?;

        let system = format!(
            "Decide whether the user message contains multiple sequential instructions.\n\
             If it does, respond with JSON: {{\"steps\": [{{\"text\": \"<one instruction>\", \
             \"contentPrompt\": \"<optional generation prompt>\"}}]}} with 2 to {} steps.\n\
             If it is a single instruction, respond with {{\"steps\": []}}. Nothing else.",
            self.config.max_steps
        );
        let messages = vec![
            serde_json::json!({"role": "system", "content": system}),
            serde_json::json!({"role": "user", "content": raw}),
        ];

        let reply = match tokio::time::timeout(self.timeout, client.chat(&messages, 512, 0.0)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("plan request failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!("plan request timed out");
                return None;
            }
        };

        let steps = parse_plan_reply(&reply, self.config.max_steps)?;
        debug!(steps = steps.len(), "llm plan accepted");
        Some(Plan { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_then_split() {
        let segs = split_lexical("first create notes.txt then send it by mail").unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], "create notes.txt");
        assert_eq!(segs[1], "send it by mail");
    }

    #[test]
    fn test_lexical_after_that() {
        let segs =
            split_lexical("search the web for rust news and then summarize the first hit").unwrap();
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn test_no_connective_no_split() {
        assert!(split_lexical("send the report to anna").is_none());
    }

    #[test]
    fn test_bare_then_word_inside_segment() {
        // One real segment after filtering trivial fragments.
        assert!(split_lexical("ok then").is_none());
    }

    #[test]
    fn test_numbered_list_split() {
        let segs = split_lexical("do these:\n1. create a.txt\n2. delete b.txt").unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], "create a.txt");
        assert_eq!(segs[1], "delete b.txt");
    }

    #[test]
    fn test_parse_plan_reply_fenced() {
        let reply = "```json\n{\"steps\": [{\"text\": \"create notes.txt\"}, \
                     {\"text\": \"mail it\", \"contentPrompt\": \"short summary\"}]}\n```";
        let steps = parse_plan_reply(reply, 6).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].index, 1);
        assert_eq!(steps[1].content_prompt.as_deref(), Some("short summary"));
    }

    #[test]
    fn test_single_step_plan_discarded() {
        let reply = r#"{"steps": [{"text": "just one"}]}"#;
        assert!(parse_plan_reply(reply, 6).is_none());
    }

    #[test]
    fn test_empty_plan_discarded() {
        assert!(parse_plan_reply(r#"{"steps": []}"#, 6).is_none());
        assert!(parse_plan_reply("not json at all", 6).is_none());
    }

    #[test]
    fn test_plan_capped_at_max_steps() {
        let reply = r#"{"steps": [{"text": "a a"}, {"text": "b b"}, {"text": "c c"}, {"text": "d d"}]}"#;
        let steps = parse_plan_reply(reply, 3).unwrap();
        assert_eq!(steps.len(), 3);
    }

    #[tokio::test]
    async fn test_planner_without_client_uses_lexical_only() {
        let planner = Planner::new(PlannerConfig::default(), None, 1000);
        let plan = planner
            .plan("first create notes.txt then send it by mail")
            .await
            .unwrap();
        assert_eq!(plan.steps.len(), 2);

        let long = "please take care of the quarterly report for me because it needs to go out";
        assert!(planner.plan(long).await.is_none());
    }
}
