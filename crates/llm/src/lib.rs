pub mod answer;
pub mod provider;
pub mod providers;

pub use answer::{DocumentAnswerer, FailureKind, LlmAnswer};
pub use provider::{LlmError, LlmProvider, Message, Role};
