//! The LLM HTTP client is an external collaborator per the
//! contract: only its request/response contract is
//! implemented here, never the wording of the prompts it is fed.
//! Grounded on `ProviderResolver`'s `reqwest` usage for the async HTTP
//! shape, narrowed to a single chat-completion call.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::CatmitError;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
   role:    &'static str,
   content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
   model:       String,
   messages:    Vec<ChatMessage>,
   max_tokens:  u32,
   temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
   message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
   content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
   choices: Vec<ChatChoice>,
}

/// Given (cancellation token, system prompt, user prompt), returns a
/// single commit message string or a typed error. Authentication is a
/// bearer token header; the request body conforms to a
/// chat-completion format with `model`, `messages`, `max_tokens`
/// (default 128), `temperature` (default 0.7).
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
   async fn complete(
      &self,
      cancel: &CancellationToken,
      system_prompt: &str,
      user_prompt: &str,
   ) -> Result<String, CatmitError>;
}

pub struct HttpLlmClient {
   http:        reqwest::Client,
   api_url:     String,
   api_key:     String,
   model:       String,
   max_tokens:  u32,
   temperature: f32,
}

impl HttpLlmClient {
   pub fn new(
      api_url: String,
      api_key: String,
      model: String,
      max_tokens: u32,
      temperature: f32,
      timeout: Duration,
   ) -> Self {
      Self {
         http: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
         api_url,
         api_key,
         model,
         max_tokens,
         temperature,
      }
   }
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
   /// The call carries its own derived deadline: the per-call timeout
   /// baked into `self.http` intersected with `cancel`.
   async fn complete(
      &self,
      cancel: &CancellationToken,
      system_prompt: &str,
      user_prompt: &str,
   ) -> Result<String, CatmitError> {
      let body = ChatRequest {
         model:       self.model.clone(),
         messages:    vec![
            ChatMessage { role: "system", content: system_prompt.to_string() },
            ChatMessage { role: "user", content: user_prompt.to_string() },
         ],
         max_tokens:  self.max_tokens,
         temperature: self.temperature,
      };

      let request = self.http.post(&self.api_url).bearer_auth(&self.api_key).json(&body).send();

      let response = tokio::select! {
         biased;
         () = cancel.cancelled() => return Err(CatmitError::Canceled),
         result = request => result.map_err(|e| {
            if e.is_timeout() {
               CatmitError::Timeout(Duration::from_secs(0))
            } else {
               CatmitError::Network(e.to_string())
            }
         })?,
      };

      if !response.status().is_success() {
         let status = response.status();
         let text = response.text().await.unwrap_or_default();
         return Err(CatmitError::Llm(format!("LLM endpoint returned {status}: {text}")));
      }

      let parsed: ChatResponse =
         response.json().await.map_err(|e| CatmitError::Llm(format!("invalid LLM response JSON: {e}")))?;

      parsed
         .choices
         .into_iter()
         .next()
         .map(|choice| choice.message.content.trim().to_string())
         .ok_or_else(|| CatmitError::Llm("LLM response contained no choices".to_string()))
   }
}

#[cfg(test)]
pub mod fake {
   use super::{CancellationToken, CatmitError, LlmClient};

   /// Test double returning a canned message, used by orchestrator
   /// tests that exercise the query stage without real network access.
   pub struct FakeLlmClient {
      pub response: Result<String, String>,
   }

   impl FakeLlmClient {
      pub const fn ok(message: String) -> Self {
         Self { response: Ok(message) }
      }
   }

   #[async_trait::async_trait]
   impl LlmClient for FakeLlmClient {
      async fn complete(
         &self,
         cancel: &CancellationToken,
         _system_prompt: &str,
         _user_prompt: &str,
      ) -> Result<String, CatmitError> {
         if cancel.is_cancelled() {
            return Err(CatmitError::Canceled);
         }
         self.response.clone().map_err(CatmitError::Llm)
      }
   }
}
