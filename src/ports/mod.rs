//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the engine core and an external
//! collaborator (time, screening, intent classification, backend execution,
//! knowledge answers, audit). Implementations live in `src/adapters/`.

pub mod audit;
pub mod backend;
pub mod classifier;
pub mod clock;
pub mod knowledge;
pub mod screening;

pub use audit::{AuditRecord, AuditSink, AuditStatus};
pub use backend::{BackendExecutor, BackendRequest, ExecuteFuture, ExecutionReport};
pub use classifier::{
    Classification, ClassifyFuture, ClassifyRequest, IntentClassifier, IntentLabel, SessionDigest,
    SmallTalkKind,
};
pub use clock::Clock;
pub use knowledge::{AnswerFuture, Knowledge, KnowledgeAnswer, KnowledgeRequest};
pub use screening::{Screening, ScreeningFuture, ScreeningVerdict};
