//! Concrete embedding providers for the `textkit-core` contract.
//!
//! - [`HashEmbedder`]: deterministic, dependency-free.
//! - [`LocalModelEmbedder`]: BGE-M3 on candle, gated on the model files.
//!
//! [`get_default_embedder`] picks one from configuration.

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

use tracing::info;

use textkit_core::config::{Config, EmbedSettings};
use textkit_core::{Construct, EmbeddingProvider, Error, Result};

pub use device::shared_device;
pub use hash::{HashEmbedder, HashEmbedderOptions};
pub use model::{resolve_model_dir, resolve_model_dir_with, LoadedModel, LocalModelEmbedder, LocalModelOptions};
pub use pool::masked_mean_l2;

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the hash embedder.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn embedder_from_settings(settings: &EmbedSettings, force_fake: bool) -> Result<Box<dyn EmbeddingProvider>> {
    if force_fake {
        info!(dim = settings.dim, "using hash embedder (fake embeddings forced)");
        return Ok(Box::new(HashEmbedder::build(HashEmbedderOptions { dim: settings.dim })?));
    }
    match settings.provider.as_str() {
        "hash" => {
            info!(dim = settings.dim, "using hash embedder");
            Ok(Box::new(HashEmbedder::build(HashEmbedderOptions { dim: settings.dim })?))
        }
        "local" => Ok(Box::new(LocalModelEmbedder::build(LocalModelOptions::from_settings(settings))?)),
        other => Err(Error::InvalidConfig(format!("unknown embed.provider '{other}'"))),
    }
}

pub fn get_default_embedder(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    embedder_from_settings(&config.embed_settings()?, use_fake_embeddings())
}
