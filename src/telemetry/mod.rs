pub mod sink;
pub mod tuning;

pub use sink::{ScoredAlternative, TelemetryEntry, TelemetrySink};
pub use tuning::{format_stats_report, route_stats, RouteStats};
