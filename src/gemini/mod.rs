//! Gemini `generateContent` client with function calling.

pub mod client;
pub mod types;
