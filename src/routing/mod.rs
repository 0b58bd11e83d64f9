//! Message routing: normalization, detection, context filtering, semantic
//! scoring, LLM fallback, sequence planning, and the pipeline tying them
//! together.

pub mod detect;
pub mod fallback;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod planner;
pub mod route;
pub mod semantic;

pub use detect::{Candidate, Detector, DetectorBank, RouteParams};
pub use fallback::RouteClassifier;
pub use filter::{filter, ChatView};
pub use normalize::normalize;
pub use pipeline::{Pipeline, PipelineReply};
pub use planner::{Plan, PlanStep, Planner};
pub use route::Route;
pub use semantic::{RouteDecision, SemanticRouter};
