//! Gemini-backed implementation of the `AnalysisClient` trait. The workflows
//! only know the trait; this crate owns the wire format and HTTP error
//! mapping.

pub mod gemini;

pub use gemini::GeminiClient;
