use crate::error::{Error, Result};
use crate::similarity::cosine_similarity;
use crate::types::{EmbedInput, Embedded, TokenCounting, Vector};

/// Contract implemented by every embedding provider.
///
/// Implementors supply `embed`, `dimension` and `tokenizer_or_token_counter`;
/// batching, similarity and input dispatch have default implementations in
/// terms of those. Instances are built through [`crate::readiness::Construct`],
/// which checks the provider's availability before anything is acquired.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. The result has exactly `dimension()` entries.
    fn embed(&self, text: &str) -> Result<Vector>;

    /// Length of every vector this instance produces. Constant for its lifetime.
    fn dimension(&self) -> usize;

    /// Tokenizer or token counter compatible with this provider's inputs.
    fn tokenizer_or_token_counter(&self) -> Result<TokenCounting>;

    /// Embed texts in input order. The first failure aborts the batch.
    ///
    /// Providers with native batching should override this and keep the
    /// per-index correspondence with `texts`.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Score two vectors. Cosine similarity unless overridden.
    fn similarity(&self, u: &[f32], v: &[f32]) -> Result<f32> {
        cosine_similarity(u, v)
    }

    /// Route a single text to `embed` and a list to `embed_batch`.
    fn call(&self, input: EmbedInput) -> Result<Embedded> {
        match input {
            EmbedInput::One(text) => self.embed(&text).map(Embedded::One),
            EmbedInput::Many(texts) => self.embed_batch(&texts).map(Embedded::Many),
        }
    }

    /// [`Self::call`] for dynamically typed input. Anything other than a
    /// string or an array of strings is [`Error::InvalidInput`].
    fn call_json(&self, input: &serde_json::Value) -> Result<Embedded> {
        self.call(EmbedInput::try_from(input)?)
    }

    fn check_dimension(&self, v: &[f32]) -> Result<()> {
        let expected = self.dimension();
        if v.len() == expected {
            Ok(())
        } else {
            Err(Error::DimensionMismatch { expected, actual: v.len() })
        }
    }

    /// Debug representation naming the concrete provider, e.g. `HashEmbedder()`.
    fn repr(&self) -> String {
        let full = std::any::type_name::<Self>();
        let path = full.split('<').next().unwrap_or(full);
        let name = path.rsplit("::").next().unwrap_or(path);
        format!("{name}()")
    }
}
