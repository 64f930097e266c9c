//! Local XLM-RoBERTa (BGE-M3) embedder running on candle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use textkit_core::config::{expand_path, EmbedSettings};
use textkit_core::readiness::{Construct, Readiness, Requirement};
use textkit_core::similarity::dot;
use textkit_core::{EmbeddingProvider, Error, Result, TokenCounting, Vector};

use crate::device::shared_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::{tokenize_on_device, HfTokenizer, PAD_ID};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "pytorch_model.bin";
pub const REQUIRED_FILES: [&str; 3] = [TOKENIZER_FILE, CONFIG_FILE, WEIGHTS_FILE];

const SLOW_EMBED_MS: u128 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalModelOptions {
    /// `None` when no candidate directory could be resolved.
    pub model_dir: Option<PathBuf>,
    pub max_len: usize,
}

impl LocalModelOptions {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self { model_dir: Some(model_dir.into()), max_len: EmbedSettings::default().max_len }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn from_settings(settings: &EmbedSettings) -> Self {
        Self { model_dir: resolve_model_dir(settings.model_dir.as_deref()), max_len: settings.max_len }
    }
}

/// Environment variables consulted for the model directory, in order.
pub const MODEL_DIR_VARS: [&str; 2] = ["APP_MODEL_DIR", "MODEL_DIR"];

/// Model directory lookup: `APP_MODEL_DIR`, `MODEL_DIR`, the configured
/// directory, then `../models/bge-m3` and `models/bge-m3`. Falls back to the
/// configured path even when it does not exist so errors can name it.
pub fn resolve_model_dir(configured: Option<&str>) -> Option<PathBuf> {
    resolve_model_dir_with(|var| std::env::var(var).ok(), configured)
}

/// [`resolve_model_dir`] with an explicit environment lookup.
pub fn resolve_model_dir_with<F>(env: F, configured: Option<&str>) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    for var in MODEL_DIR_VARS {
        if let Some(dir) = env(var) {
            let p = expand_path(&dir);
            if p.exists() { debug!(var, dir = %p.display(), "model dir from env"); return Some(p); }
            warn!(var, dir = %p.display(), "model dir from env does not exist, skipping");
        }
    }
    let configured = configured.map(expand_path);
    if let Some(p) = configured.as_ref().filter(|p| p.exists()) {
        return Some(p.clone());
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { debug!(dir = %p.display(), "model dir from default location"); return Some(p.to_path_buf()); }
    }
    configured
}

/// Everything [`LocalModelEmbedder`] needs, loaded during readiness.
pub struct LoadedModel {
    model: XLMRobertaModel,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    dimension: usize,
    max_tokens: usize,
}

impl LoadedModel {
    /// Build the model from a `config.json` document and its weights.
    ///
    /// Rejects configs without a positive `hidden_size` or a
    /// `max_position_embeddings` entry.
    pub fn from_parts(raw_config: &str, vb: VarBuilder<'_>, tokenizer: Tokenizer, device: &Device) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(raw_config).map_err(|e| Error::InvalidConfig(format!("model config: {e}")))?;
        let field = |name: &str| value.get(name).and_then(serde_json::Value::as_u64);

        let dimension = field("hidden_size").unwrap_or(0);
        if dimension == 0 {
            return Err(Error::InvalidConfig("model config needs a positive hidden_size".to_string()));
        }
        let positions = field("max_position_embeddings")
            .ok_or_else(|| Error::InvalidConfig("model config has no max_position_embeddings".to_string()))?;
        // XLM-R position ids start after the padding index.
        let max_tokens = positions.saturating_sub(field("pad_token_id").unwrap_or(u64::from(PAD_ID)) + 1);

        let config: XLMRobertaConfig =
            serde_json::from_str(raw_config).map_err(|e| Error::InvalidConfig(format!("model config: {e}")))?;
        let model = XLMRobertaModel::new(&config, vb).map_err(Error::embedding)?;

        Ok(Self {
            model,
            tokenizer: Arc::new(tokenizer),
            device: device.clone(),
            dimension: usize::try_from(dimension).map_err(Error::embedding)?,
            max_tokens: usize::try_from(max_tokens).map_err(Error::embedding)?,
        })
    }

    pub fn dimension(&self) -> usize { self.dimension }

    /// Longest token window the position table supports.
    pub fn max_tokens(&self) -> usize { self.max_tokens }
}

impl Readiness for LocalModelOptions {
    type Deps = LoadedModel;

    fn requirement(&self) -> Requirement {
        let location = self
            .model_dir
            .as_ref()
            .map_or_else(|| "<no model directory found>".to_string(), |p| p.display().to_string());
        Requirement::new(
            format!("BGE-M3 model files ({}) in {location}", REQUIRED_FILES.join(", ")),
            "Set APP_MODEL_DIR (or embed.model_dir) to a directory containing them, or place the model under models/bge-m3.",
        )
    }

    fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(Error::InvalidConfig("max_len must be positive".to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.model_dir
            .as_ref()
            .is_some_and(|dir| REQUIRED_FILES.iter().all(|f| dir.join(f).is_file()))
    }

    fn acquire(&self) -> Result<LoadedModel> {
        let dir = self.model_dir.as_ref().ok_or_else(|| self.requirement().missing())?;
        let loaded = load_model(dir, shared_device())?;
        check_window(self.max_len, &loaded)?;
        Ok(loaded)
    }
}

fn check_window(max_len: usize, loaded: &LoadedModel) -> Result<()> {
    if max_len > loaded.max_tokens {
        return Err(Error::InvalidConfig(format!(
            "max_len {max_len} exceeds the model's {} usable positions",
            loaded.max_tokens
        )));
    }
    Ok(())
}

fn load_model(model_dir: &Path, device: &Device) -> Result<LoadedModel> {
    info!(dir = %model_dir.display(), "loading BGE-M3 model");

    let tokenizer_path = model_dir.join(TOKENIZER_FILE);
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))
        .map_err(Error::embedding)?;

    let config_path = model_dir.join(CONFIG_FILE);
    let raw_config = std::fs::read_to_string(&config_path)
        .map_err(|e| Error::Embedding(format!("reading {}: {e}", config_path.display())))?;

    let weights_path = model_dir.join(WEIGHTS_FILE);
    debug!(path = %weights_path.display(), "loading weights");
    let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)
        .map_err(Error::embedding)?
        .into_iter()
        .collect();
    let vb = VarBuilder::from_tensors(weights, DType::F32, device);

    let loaded = LoadedModel::from_parts(&raw_config, vb, tokenizer, device)?;
    info!(dimension = loaded.dimension, max_tokens = loaded.max_tokens, "BGE-M3 model loaded");
    Ok(loaded)
}

pub struct LocalModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    dimension: usize,
    max_len: usize,
}

impl Construct for LocalModelEmbedder {
    type Options = LocalModelOptions;

    fn from_deps(options: LocalModelOptions, loaded: LoadedModel) -> Result<Self> {
        options.validate()?;
        check_window(options.max_len, &loaded)?;
        let LoadedModel { model, tokenizer, device, dimension, .. } = loaded;
        Ok(Self { model, tokenizer, device, dimension, max_len: options.max_len })
    }
}

impl LocalModelEmbedder {
    pub fn max_len(&self) -> usize { self.max_len }

    /// One forward pass over all `texts`; rows follow input order.
    fn forward<S: AsRef<str>>(&self, texts: &[S]) -> anyhow::Result<Vec<Vector>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vector> = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?;

        let elapsed = start.elapsed().as_millis();
        if elapsed > SLOW_EMBED_MS * texts.len() as u128 {
            warn!(elapsed_ms = elapsed as u64, batch = texts.len(), "slow embedding");
        }
        Ok(rows)
    }
}

impl EmbeddingProvider for LocalModelEmbedder {
    fn embed(&self, text: &str) -> Result<Vector> {
        let v = self
            .forward(&[text])
            .map_err(Error::embedding)?
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no rows".to_string()))?;
        self.check_dimension(&v)?;
        Ok(v)
    }

    fn dimension(&self) -> usize { self.dimension }

    fn tokenizer_or_token_counter(&self) -> Result<TokenCounting> {
        Ok(TokenCounting::Tokenizer(Arc::new(HfTokenizer::new(Arc::clone(&self.tokenizer)))))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.forward(texts).map_err(Error::embedding)?;
        if rows.len() != texts.len() {
            return Err(Error::Embedding(format!("model returned {} rows for {} texts", rows.len(), texts.len())));
        }
        for row in &rows { self.check_dimension(row)?; }
        Ok(rows)
    }

    /// Outputs are L2-normalized, so the dot product is the cosine.
    fn similarity(&self, u: &[f32], v: &[f32]) -> Result<f32> {
        dot(u, v)
    }
}
