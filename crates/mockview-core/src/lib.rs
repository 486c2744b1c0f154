pub mod config;
pub mod context;
pub mod contradiction;
pub mod depth;
pub mod difficulty;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod fact_check;
pub mod gateway;
pub mod host;
pub mod interviewer;
pub mod observer;
pub mod orchestrator;
pub mod resources;
pub mod reviewer;
pub mod session;
pub mod stop_intent;

#[cfg(test)]
mod testing;

pub use config::*;
pub use context::*;
pub use contradiction::*;
pub use depth::*;
pub use difficulty::*;
pub use error::*;
pub use evaluator::{evaluate, fallback_report, finalize_report, EvaluationInput};
pub use extract::*;
pub use fact_check::*;
pub use gateway::*;
pub use host::*;
pub use interviewer::*;
pub use observer::*;
pub use orchestrator::*;
pub use resources::*;
pub use reviewer::*;
pub use session::*;
pub use stop_intent::*;
