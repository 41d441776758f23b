//! Model endpoint providers for Codewright.
//!
//! All providers implement the `codewright_core::Provider` trait.
//! The router selects the correct provider from the model catalog.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, ResolvedModel, build_from_config};
