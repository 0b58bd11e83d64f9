pub mod base;
pub mod openai_compat;

pub use base::CompletionClient;
pub use openai_compat::OpenAICompatClient;
