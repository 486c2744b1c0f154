use uuid::Uuid;

/// Session-state misuse. The only failure class surfaced to callers of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("no active interview session: {0}")]
    SessionNotFound(Uuid),
    #[error("interview session {0} is already finished")]
    SessionFinished(Uuid),
    #[error("interview session {0} is busy with another turn")]
    Busy(Uuid),
    #[error("interview host is shutting down")]
    ShuttingDown,
}
