//! Deterministic hashed bag-of-words embedder.
//!
//! Needs no model files, so it backs tests and development runs
//! (`APP_USE_FAKE_EMBEDDINGS=1`).

use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use textkit_core::readiness::{Construct, Readiness, Requirement};
use textkit_core::{EmbeddingProvider, Error, Result, TokenCounting, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedderOptions {
    pub dim: usize,
}

impl Readiness for HashEmbedderOptions {
    type Deps = ();

    fn requirement(&self) -> Requirement {
        Requirement::new("hash embedder", "It has no optional dependencies.")
    }

    fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("hash embedder dimension must be positive".to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool { true }

    fn acquire(&self) -> Result<()> { Ok(()) }
}

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        Self::build(HashEmbedderOptions { dim })
    }
}

impl Construct for HashEmbedder {
    type Options = HashEmbedderOptions;

    fn from_deps(options: HashEmbedderOptions, (): ()) -> Result<Self> {
        options.validate()?;
        Ok(Self { dim: options.dim })
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vector> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        Ok(v)
    }

    fn dimension(&self) -> usize { self.dim }

    fn tokenizer_or_token_counter(&self) -> Result<TokenCounting> {
        Ok(TokenCounting::counter(|text| text.split_whitespace().count()))
    }
}
