use std::sync::Arc;

use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use textkit_core::{Error, Tokenize};

/// XLM-RoBERTa `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Token ids and attention mask for `text`, truncated or padded to `max_len`.
pub fn encode_padded(tokenizer: &Tokenizer, text: &str, max_len: usize) -> Result<(Vec<u32>, Vec<u32>)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    ids.resize(max_len, PAD_ID);
    mask.resize(max_len, 0);
    Ok((ids, mask))
}

/// `[B, max_len]` input ids and attention mask for a batch of texts.
pub fn tokenize_on_device<S: AsRef<str>>(
    tokenizer: &Tokenizer,
    texts: &[S],
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let mut all_ids = Vec::with_capacity(texts.len() * max_len);
    let mut all_mask = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let (ids, mask) = encode_padded(tokenizer, text.as_ref(), max_len)?;
        all_ids.extend(ids);
        all_mask.extend(mask);
    }
    let input_ids = Tensor::from_iter(all_ids, device)?.reshape((texts.len(), max_len))?;
    let attention_mask = Tensor::from_iter(all_mask, device)?.reshape((texts.len(), max_len))?;
    Ok((input_ids, attention_mask))
}

/// [`Tokenize`] handle over a Hugging Face tokenizer.
#[derive(Clone)]
pub struct HfTokenizer {
    inner: Arc<Tokenizer>,
}

impl HfTokenizer {
    pub fn new(inner: Arc<Tokenizer>) -> Self { Self { inner } }

    pub fn inner(&self) -> &Tokenizer { &self.inner }
}

impl Tokenize for HfTokenizer {
    fn encode(&self, text: &str) -> textkit_core::Result<Vec<u32>> {
        let enc = self.inner.encode(text, true).map_err(Error::embedding)?;
        Ok(enc.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> textkit_core::Result<String> {
        self.inner.decode(ids, true).map_err(Error::embedding)
    }
}
