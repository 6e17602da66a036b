//! The turn engine: routing, field collection, the task state machine,
//! and the per-turn orchestrator that ties them to the collaborators.

pub mod collect;
pub mod executor;
pub mod orchestrator;
pub mod prompts;
pub mod router;

pub use executor::StepOutcome;
pub use orchestrator::Orchestrator;
pub use router::RouteDecision;
