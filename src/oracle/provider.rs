//! Oracle provider trait.
//!
//! The oracle is an external language model that turns a question into a
//! JSON classification. It is unreliable by nature: it may be unreachable,
//! slow, or answer with text that is not JSON at all. Callers treat every
//! outcome other than `Ok(text)` as "no answer".

use crate::error::Result;
use super::types::ProviderInfo;
use std::future::Future;
use std::pin::Pin;

/// Trait for classification oracles.
///
/// Implemented by the Ollama and Gemini providers and by
/// [`super::ScriptedOracle`] for tests.
pub trait OracleProvider: Send + Sync {
    /// Get provider metadata.
    fn info(&self) -> ProviderInfo;

    /// Check if the provider can currently answer.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Send a system and user prompt, returning the raw reply text.
    fn classify(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Boxed oracle for dynamic dispatch.
pub struct BoxedOracle {
    inner: Box<dyn OracleProviderBoxed + Send + Sync>,
}

/// Object-safe version of [`OracleProvider`] for boxing.
pub trait OracleProviderBoxed: Send + Sync {
    fn info(&self) -> ProviderInfo;
    fn is_available_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
    fn classify_boxed(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

impl BoxedOracle {
    /// Create a new boxed oracle.
    pub fn new<P: OracleProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Box::new(BoxedOracleWrapper(provider)),
        }
    }

    /// Get provider metadata.
    pub fn info(&self) -> ProviderInfo {
        self.inner.info()
    }

    /// Check if the provider can currently answer.
    pub async fn is_available(&self) -> bool {
        self.inner.is_available_boxed().await
    }

    /// Send a system and user prompt, returning the raw reply text.
    pub async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.inner.classify_boxed(system_prompt, user_prompt).await
    }
}

struct BoxedOracleWrapper<P: OracleProvider + 'static>(P);

impl<P: OracleProvider + 'static> OracleProviderBoxed for BoxedOracleWrapper<P> {
    fn info(&self) -> ProviderInfo {
        self.0.info()
    }

    fn is_available_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(self.0.is_available())
    }

    fn classify_boxed(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        // Owned copies so the future does not borrow the caller's strings.
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();
        Box::pin(async move { self.0.classify(&system_prompt, &user_prompt).await })
    }
}
