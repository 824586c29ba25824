pub mod providers;

pub use providers::{ChatModel, ModelOutput, ProviderError};
