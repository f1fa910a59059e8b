//! Scripted oracle.
//!
//! Replays a fixed queue of replies instead of calling a model. Used by
//! tests and by `sq ask --oracle-reply` to reproduce a classification
//! without a running model.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::provider::OracleProvider;
use super::types::ProviderInfo;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
    Delay(Duration, String),
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    prompts: Vec<(String, String)>,
}

/// Oracle that answers from a queue. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    state: Arc<Mutex<ScriptState>>,
    available: bool,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                replies: replies.into_iter().collect(),
                prompts: Vec::new(),
            })),
            available: true,
        }
    }

    /// Always answer with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([ScriptedReply::Text(text.into())])
    }

    /// Fail every call.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new([ScriptedReply::Fail(message.into())])
    }

    /// Answer with `text` after `delay`.
    pub fn slow(delay: Duration, text: impl Into<String>) -> Self {
        Self::new([ScriptedReply::Delay(delay, text.into())])
    }

    /// Report itself unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new([])
        }
    }

    /// Prompts received so far, as `(system, user)` pairs.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The last reply repeats once the queue is down to one entry.
    fn next_reply(&self, system_prompt: &str, user_prompt: &str) -> Option<ScriptedReply> {
        let mut state = self.lock();
        state
            .prompts
            .push((system_prompt.to_string(), user_prompt.to_string()));
        if state.replies.len() > 1 {
            state.replies.pop_front()
        } else {
            state.replies.front().cloned()
        }
    }
}

impl OracleProvider for ScriptedOracle {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "scripted".to_string(),
            model: "scripted".to_string(),
            endpoint: String::new(),
        }
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match self.next_reply(system_prompt, user_prompt) {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(Error::Oracle(message)),
            Some(ScriptedReply::Delay(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(Error::Oracle("No scripted reply".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let oracle = ScriptedOracle::new([
            ScriptedReply::Text("one".into()),
            ScriptedReply::Text("two".into()),
        ]);
        assert_eq!(oracle.classify("s", "a").await.unwrap(), "one");
        assert_eq!(oracle.classify("s", "b").await.unwrap(), "two");
        assert_eq!(oracle.classify("s", "c").await.unwrap(), "two");
        assert_eq!(oracle.prompts().len(), 3);
        assert_eq!(oracle.prompts()[1].1, "b");
    }

    #[tokio::test]
    async fn test_failing_and_unavailable() {
        let oracle = ScriptedOracle::failing("boom");
        assert!(oracle.classify("s", "u").await.is_err());

        let oracle = ScriptedOracle::unavailable();
        assert!(!oracle.is_available().await);
        assert!(oracle.classify("s", "u").await.is_err());
    }
}
