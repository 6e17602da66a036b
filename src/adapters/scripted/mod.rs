//! Scripted adapters that serve pre-arranged responses for tests.
//!
//! Each adapter pops the next scripted response per call and panics when the
//! script runs dry, so a test that drifts out of step fails loudly. The
//! recording handles (`calls`, `queries`, `records`) are shared, letting a
//! test keep a handle after boxing the adapter into the context.

pub mod audit;
pub mod backend;
pub mod classifier;
pub mod clock;
pub mod knowledge;
pub mod screening;

pub use audit::RecordingAuditSink;
pub use backend::ScriptedBackend;
pub use classifier::ScriptedClassifier;
pub use clock::ManualClock;
pub use knowledge::ScriptedKnowledge;
pub use screening::ScriptedScreening;
