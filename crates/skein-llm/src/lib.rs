//! LLM and embedding capabilities for Skein.
//!
//! Two seams live here:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │  LlmBackend trait            │   │  Embedder trait              │
//! │  - complete() -> Response    │   │  - embed() -> Vec<f32>       │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!        │              │                   │               │
//!        ▼              ▼                   ▼               ▼
//!   ┌─────────┐   ┌──────────┐        ┌──────────┐   ┌──────────┐
//!   │ OpenAI- │   │   Mock   │        │   Hash   │   │  OpenAI  │
//!   │ compat. │   │          │        │ (local)  │   │          │
//!   └─────────┘   └──────────┘        └──────────┘   └──────────┘
//! ```

pub mod backend;
pub mod embeddings;
pub mod error;
pub mod openai;
pub mod types;

pub use backend::{LlmBackend, MockBackend, SharedBackend, with_retry};
pub use embeddings::{
    Embedder, HashEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig, SharedEmbedder,
    build_embedder, cosine_similarity,
};
pub use error::{LlmError, Result};
pub use openai::{DEFAULT_MAX_TOKENS, OpenAiBackend, OpenAiConfig, create_shared_backend};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
