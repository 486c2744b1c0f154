//! Many interview sessions behind one pipeline.
//!
//! Each session sits behind its own async mutex, so two messages for the same
//! session never run at the same time. A global semaphore caps how many turns
//! run at once across all sessions.

use std::collections::HashMap;
use std::sync::Arc;

use mockview_schema::{Candidate, FeedbackFormat, SessionLog};
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use uuid::Uuid;

use crate::error::InterviewError;
use crate::orchestrator::{FinishedInterview, InterviewPipeline, TurnOutcome, TurnReply};
use crate::session::InterviewSession;

type SessionHandle = Arc<Mutex<InterviewSession>>;

pub struct InterviewHost {
    pipeline: InterviewPipeline,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    turn_permits: Arc<Semaphore>,
}

impl InterviewHost {
    /// A host without a cross-session limit.
    pub fn new(pipeline: InterviewPipeline) -> Self {
        Self::with_global_limit(pipeline, Semaphore::MAX_PERMITS)
    }

    /// A host that runs at most `max_concurrent` turns at once.
    pub fn with_global_limit(pipeline: InterviewPipeline, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            sessions: RwLock::new(HashMap::new()),
            turn_permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn pipeline(&self) -> &InterviewPipeline {
        &self.pipeline
    }

    pub async fn open(&self, candidate: Candidate) -> Uuid {
        let session = self.pipeline.start_session(candidate);
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn greet(&self, id: Uuid) -> Result<TurnReply, InterviewError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let _permit = self.permit().await?;
        self.pipeline.greet(&mut session).await
    }

    /// Runs one turn, waiting for any turn already running on this session.
    pub async fn submit(&self, id: Uuid, message: &str) -> Result<TurnOutcome, InterviewError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let _permit = self.permit().await?;
        self.pipeline.process_message(&mut session, message).await
    }

    /// Like [`submit`](Self::submit), but fails with [`InterviewError::Busy`]
    /// instead of waiting when the session is mid-turn.
    pub async fn try_submit(&self, id: Uuid, message: &str) -> Result<TurnOutcome, InterviewError> {
        let handle = self.session(id).await?;
        let mut session = handle
            .try_lock()
            .map_err(|_| InterviewError::Busy(id))?;
        let _permit = self.permit().await?;
        self.pipeline.process_message(&mut session, message).await
    }

    pub async fn finish(&self, id: Uuid) -> Result<FinishedInterview, InterviewError> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let _permit = self.permit().await?;
        Ok(self.pipeline.finish(&mut session).await)
    }

    pub async fn export(
        &self,
        id: Uuid,
        format: FeedbackFormat,
    ) -> Result<SessionLog, InterviewError> {
        let handle = self.session(id).await?;
        let session = handle.lock().await;
        Ok(session.to_log(format))
    }

    /// Removes the session once its running turn, if any, has completed.
    pub async fn close(&self, id: Uuid) -> Result<InterviewSession, InterviewError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(InterviewError::SessionNotFound(id))?;
        let session = handle.lock().await.clone();
        tracing::info!("session {id} closed");
        Ok(session)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Refuses new turns. Turns already running complete normally.
    pub fn shutdown(&self) {
        self.turn_permits.close();
    }

    async fn session(&self, id: Uuid) -> Result<SessionHandle, InterviewError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(InterviewError::SessionNotFound(id))
    }

    async fn permit(&self) -> Result<OwnedSemaphorePermit, InterviewError> {
        self.turn_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| InterviewError::ShuttingDown)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use mockview_provider::{LlmProvider, LlmRequest, LlmResponse};

    use super::*;
    use crate::config::{InterviewSettings, StageTemperatures};
    use crate::testing::{gateway, Broken};

    struct Slow;

    #[async_trait]
    impl LlmProvider for Slow {
        async fn chat(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(LlmResponse {
                text: String::new(),
                input_tokens: None,
                output_tokens: None,
                stop_reason: None,
            })
        }
    }

    fn host(provider: Arc<dyn LlmProvider>) -> InterviewHost {
        InterviewHost::new(InterviewPipeline::new(
            gateway(provider),
            InterviewSettings::default(),
            StageTemperatures::default(),
        ))
    }

    fn candidate() -> Candidate {
        Candidate::new("Ann", "Backend Developer", "Middle", "")
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let host = host(Arc::new(Broken));
        let id = Uuid::new_v4();
        assert!(matches!(
            host.submit(id, "hi").await,
            Err(InterviewError::SessionNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            host.export(id, FeedbackFormat::Text).await,
            Err(InterviewError::SessionNotFound(_))
        ));
        assert!(matches!(
            host.close(id).await,
            Err(InterviewError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_then_close_tracks_sessions() {
        let host = host(Arc::new(Broken));
        let a = host.open(candidate()).await;
        let b = host.open(candidate()).await;
        assert_ne!(a, b);
        assert_eq!(host.active_sessions().await, 2);

        host.greet(a).await.unwrap();
        let closed = host.close(a).await.unwrap();
        assert_eq!(closed.id(), a);
        assert!(!closed.last_question().is_empty());
        assert_eq!(host.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn try_submit_refuses_a_busy_session() {
        let host = Arc::new(host(Arc::new(Slow)));
        let id = host.open(candidate()).await;

        let running = {
            let host = host.clone();
            tokio::spawn(async move { host.submit(id, "I mostly write SQL reports").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(
            host.try_submit(id, "second message").await,
            Err(InterviewError::Busy(busy)) if busy == id
        ));
        assert!(running.await.unwrap().is_ok());
        assert!(host.try_submit(id, "now it is free").await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_refuses_new_turns() {
        let host = host(Arc::new(Broken));
        let id = host.open(candidate()).await;
        host.shutdown();
        assert!(matches!(
            host.submit(id, "hello").await,
            Err(InterviewError::ShuttingDown)
        ));
    }
}
