//! Client for Groq's OpenAI-compatible chat completions endpoint.

pub mod client;
pub mod config;
pub mod models;
mod sse;

pub use client::{ClientGuard, GroqClient};
pub use config::GroqConfig;
