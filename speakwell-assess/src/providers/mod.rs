//! Provider adapters
//!
//! Concrete implementations of the two provider ports from `types`:
//! 1. **speech_assessment_client** - structured pronunciation assessment (primary)
//! 2. **transcription_client** - plain speech-to-text (secondary)
//!
//! The orchestrator holds both behind `Arc<dyn ...>`, so tests swap in the
//! scripted providers from `mock`.

pub mod speech_assessment_client;
pub mod transcription_client;

pub use speech_assessment_client::SpeechAssessmentClient;
pub use transcription_client::TranscriptionClient;

// ============================================================================
// Mock Providers (for testing)
// ============================================================================
