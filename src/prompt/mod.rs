pub mod composer;
pub mod profiles;

pub use composer::{compose, ComposedPrompt};
