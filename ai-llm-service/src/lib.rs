//! LLM access for the chat backend: provider clients (Ollama, OpenAI-compatible),
//! env-driven profiles for completion and embeddings, and health probes.

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
