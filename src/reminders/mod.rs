//! Reminder persistence and delivery.
//!
//! Reminders live in a JSON store under the data dir and are delivered by a
//! fixed-interval loop. The loop is reentrancy-guarded: a tick is skipped
//! outright while the previous run is still in flight, and delivery never
//! blocks message processing.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{MessageBus, OutboundMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub chat_id: String,
    pub channel: String,
    pub task: String,
    pub due_at: DateTime<Local>,
    /// Repeats daily at the same time when set.
    #[serde(default)]
    pub daily: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReminderStore {
    reminders: Vec<Reminder>,
}

// ---------------------------------------------------------------------------
// When parsing
// ---------------------------------------------------------------------------

static IN_RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bin\s+(\d{1,3})\s*(minute|minutes|min|hour|hours|h|day|days)\b")
        .expect("relative regex")
});

static AT_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("time regex"));

/// Parse the "when" phrase a schedule detector extracted.
///
/// Returns the first due time plus whether the reminder repeats daily.
/// Unparseable phrases default to one hour out so the reminder is never
/// silently lost.
pub fn parse_when(normalized: &str) -> (DateTime<Local>, bool) {
    let now = Local::now();
    let daily = normalized.contains("every day") || normalized.contains("daily");

    if let Some(caps) = IN_RELATIVE.captures(normalized) {
        let n: i64 = caps[1].parse().unwrap_or(1);
        let due = match &caps[2] {
            "minute" | "minutes" | "min" => now + Duration::minutes(n),
            "hour" | "hours" | "h" => now + Duration::hours(n),
            _ => now + Duration::days(n),
        };
        return (due, daily);
    }

    if let Some(caps) = AT_TIME.captures(normalized) {
        let mut hour: u32 = caps[1].parse().unwrap_or(9);
        let minute: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        match caps.get(3).map(|m| m.as_str()) {
            Some("pm") if hour < 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }
        if let Some(time) = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0) {
            let mut due = now
                .with_hour(time.hour())
                .and_then(|d| d.with_minute(time.minute()))
                .and_then(|d| d.with_second(0))
                .unwrap_or(now);
            if normalized.contains("tomorrow") || due <= now {
                due += Duration::days(1);
            }
            return (due, daily);
        }
    }

    if normalized.contains("tomorrow") {
        return (now + Duration::days(1), daily);
    }
    if normalized.contains("tonight") || normalized.contains("this evening") {
        let due = now
            .with_hour(20)
            .and_then(|d| d.with_minute(0))
            .unwrap_or(now + Duration::hours(3));
        return (due.max(now + Duration::minutes(5)), daily);
    }

    (now + Duration::hours(1), daily)
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Reminder store with file-based persistence.
pub struct ReminderService {
    store_path: PathBuf,
    store: Mutex<ReminderStore>,
}

impl ReminderService {
    pub fn new(store_path: PathBuf) -> Self {
        let store = if store_path.exists() {
            std::fs::read_to_string(&store_path)
                .ok()
                .and_then(|c| serde_json::from_str(&c).ok())
                .unwrap_or_default()
        } else {
            ReminderStore::default()
        };
        Self {
            store_path,
            store: Mutex::new(store),
        }
    }

    pub fn add(&self, chat_id: &str, channel: &str, task: &str, when: &str) -> Reminder {
        let (due_at, daily) = parse_when(when);
        let reminder = Reminder {
            id: Uuid::new_v4().to_string()[..8].to_string(),
            chat_id: chat_id.to_string(),
            channel: channel.to_string(),
            task: task.to_string(),
            due_at,
            daily,
        };
        {
            let mut store = self.store.lock().expect("reminder store lock poisoned");
            store.reminders.push(reminder.clone());
            self.persist(&store);
        }
        info!("reminder added: '{}' ({})", reminder.task, reminder.id);
        reminder
    }

    pub fn list(&self, chat_id: &str) -> Vec<Reminder> {
        let store = self.store.lock().expect("reminder store lock poisoned");
        store
            .reminders
            .iter()
            .filter(|r| r.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Remove by id prefix or by task substring. Returns removed count.
    pub fn remove(&self, chat_id: &str, needle: &str) -> usize {
        let mut store = self.store.lock().expect("reminder store lock poisoned");
        let before = store.reminders.len();
        let needle = needle.to_lowercase();
        store.reminders.retain(|r| {
            r.chat_id != chat_id
                || !(r.id.starts_with(&needle) || r.task.to_lowercase().contains(&needle))
        });
        let removed = before - store.reminders.len();
        if removed > 0 {
            self.persist(&store);
        }
        removed
    }

    /// Pop reminders that are due, rescheduling daily ones.
    pub fn take_due(&self) -> Vec<Reminder> {
        let now = Local::now();
        let mut store = self.store.lock().expect("reminder store lock poisoned");
        let mut due = Vec::new();
        store.reminders.retain_mut(|r| {
            if r.due_at > now {
                return true;
            }
            due.push(r.clone());
            if r.daily {
                r.due_at += Duration::days(1);
                true
            } else {
                false
            }
        });
        if !due.is_empty() {
            self.persist(&store);
        }
        due
    }

    fn persist(&self, store: &ReminderStore) {
        match serde_json::to_string_pretty(store) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.store_path, json) {
                    warn!("cannot persist reminders: {}", e);
                }
            }
            Err(e) => warn!("cannot serialize reminders: {}", e),
        }
    }
}

/// Run the delivery loop until the process exits.
pub async fn run_delivery_loop(service: Arc<ReminderService>, bus: MessageBus, tick_secs: u64) {
    let busy = Arc::new(AtomicBool::new(false));
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        // Skip the tick if the previous run is still in flight.
        if busy.swap(true, Ordering::SeqCst) {
            continue;
        }
        for reminder in service.take_due() {
            bus.publish_outbound(OutboundMessage::new(
                reminder.channel.clone(),
                reminder.chat_id.clone(),
                format!("Reminder: {}", reminder.task),
            ));
        }
        busy.store(false, Ordering::SeqCst);
    }
}
