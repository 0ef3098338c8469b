//! Text generation over the OpenAI-compatible chat client.

mod groq;

pub use groq::{LlmGenerator, LlmGeneratorFactory, GENERATION_TEMPERATURE};
