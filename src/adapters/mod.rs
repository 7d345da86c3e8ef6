//! External system integrations.
//!
//! - `summarizer`: AI summarization gateway (OpenAI chat completions)
//! - `notion`: document-store sink for processed messages
//! - `jandi`: outbound connect-message sender

pub mod jandi;
pub mod notion;
pub mod summarizer;

pub use jandi::{JandiClient, OutboundMessage, SendReport};
pub use notion::{DocumentSink, NotionSink};
pub use summarizer::{AiSummarizer, Summarizer};
