use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use textkit_core::config::{expand_path, resolve_with_base, Config, EmbedSettings};
use textkit_core::readiness::{prepare, Construct, Readiness, Requirement};
use textkit_core::{EmbedInput, Embedded, EmbeddingProvider, Error, Result, TokenCounting, Tokenize, Vector};

struct CharOptions {
    dim: usize,
    present: bool,
    acquired: Arc<AtomicUsize>,
}

impl CharOptions {
    fn new(dim: usize) -> Self { Self { dim, present: true, acquired: Arc::new(AtomicUsize::new(0)) } }
}

impl Readiness for CharOptions {
    /// Shared call counter.
    type Deps = Arc<AtomicUsize>;

    fn requirement(&self) -> Requirement {
        Requirement::new("numeric backend", "Rebuild with `--features numeric`.")
    }

    fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("dim must be positive".to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool { self.present }

    fn acquire(&self) -> Result<Arc<AtomicUsize>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(AtomicUsize::new(0)))
    }
}

/// Char-code provider: bucket `i` accumulates code points at positions `i mod dim`.
struct CharProvider {
    dim: usize,
    calls: Arc<AtomicUsize>,
}

impl CharProvider {
    fn new(dim: usize) -> Self { Self::build(CharOptions::new(dim)).expect("char provider is available") }
}

impl Construct for CharProvider {
    type Options = CharOptions;

    fn from_deps(options: CharOptions, calls: Arc<AtomicUsize>) -> Result<Self> {
        Ok(Self { dim: options.dim, calls })
    }
}

impl EmbeddingProvider for CharProvider {
    fn embed(&self, text: &str) -> Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("boom") {
            return Err(Error::Embedding(format!("cannot embed {text:?}")));
        }
        let mut v = vec![0f32; self.dim];
        for (i, c) in text.chars().enumerate() { v[i % self.dim] += c as u32 as f32; }
        v[0] += 1.0;
        Ok(v)
    }

    fn dimension(&self) -> usize { self.dim }

    fn tokenizer_or_token_counter(&self) -> Result<TokenCounting> {
        Ok(TokenCounting::counter(|s| s.chars().count()))
    }
}

#[test]
fn embed_length_matches_dimension() {
    let p = CharProvider::new(384);
    let v = p.embed("hello").expect("embed");
    assert_eq!(v.len(), 384);
    p.check_dimension(&v).expect("dimension holds");
    assert!(matches!(p.check_dimension(&[1.0]), Err(Error::DimensionMismatch { expected: 384, actual: 1 })));
}

#[test]
fn default_batch_matches_single_embeds_in_order() {
    let p = CharProvider::new(8);
    let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
    let batch = p.embed_batch(&texts).expect("batch");
    assert_eq!(batch.len(), 3);
    for (i, t) in texts.iter().enumerate() {
        assert_eq!(batch[i], p.embed(t).expect("embed"));
    }
}

#[test]
fn default_batch_keeps_duplicates() {
    let p = CharProvider::new(4);
    let texts = vec!["same".to_string(), "same".to_string()];
    let batch = p.embed_batch(&texts).expect("batch");
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0], batch[1]);
}

#[test]
fn default_batch_aborts_on_first_failure() {
    let p = CharProvider::new(4);
    let texts = vec!["ok".to_string(), "boom".to_string(), "never".to_string()];
    let err = p.embed_batch(&texts).unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    // "never" is not embedded once "boom" fails
    assert_eq!(p.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn similarity_is_symmetric_and_bounded() {
    let p = CharProvider::new(384);
    let u = p.embed("hello").expect("embed");
    let v = p.embed("world").expect("embed");
    let uv = p.similarity(&u, &v).expect("sim");
    let vu = p.similarity(&v, &u).expect("sim");
    assert!((uv - vu).abs() < 1e-6);
    assert!((-1.0..=1.0).contains(&uv));
    let uu = p.similarity(&u, &u).expect("sim");
    assert!((uu - 1.0).abs() < 1e-5, "self similarity {uu}");
}

#[test]
fn similarity_rejects_unequal_lengths() {
    let p = CharProvider::new(3);
    assert!(matches!(p.similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn call_routes_single_and_list() {
    let p = CharProvider::new(16);
    let one = p.call(EmbedInput::from("hello")).expect("call");
    assert_eq!(one, Embedded::One(p.embed("hello").expect("embed")));

    let texts = vec!["x".to_string(), "y".to_string()];
    let many = p.call(EmbedInput::from(texts.clone())).expect("call");
    assert_eq!(many.into_many().expect("many"), p.embed_batch(&texts).expect("batch"));
}

#[test]
fn call_json_dispatches_on_shape() {
    let p = CharProvider::new(16);
    let one = p.call_json(&json!("hello")).expect("string");
    assert_eq!(one.into_one().expect("one"), p.embed("hello").expect("embed"));

    let many = p.call_json(&json!(["a", "b"])).expect("list");
    assert_eq!(many, p.call(EmbedInput::from(&["a", "b"][..])).expect("slice input"));
    assert_eq!(many.into_many().expect("many").len(), 2);

    let empty = p.call_json(&json!([])).expect("empty list");
    assert_eq!(empty, Embedded::Many(vec![]));
}

#[test]
fn call_json_rejects_other_shapes() {
    let p = CharProvider::new(16);
    for bad in [json!(42), json!(null), json!({"text": "a"}), json!(["a", 1]), json!(true)] {
        let err = p.call_json(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{bad} -> {err}");
    }
    assert_eq!(p.calls.load(Ordering::SeqCst), 0, "nothing embedded for invalid input");
}

#[test]
fn repr_names_concrete_type() {
    let p = CharProvider::new(2);
    assert_eq!(p.repr(), "CharProvider()");
    let boxed: Box<dyn EmbeddingProvider> = Box::new(CharProvider::new(2));
    assert_eq!(boxed.repr(), "CharProvider()");
}

#[test]
fn token_counter_shape() {
    let p = CharProvider::new(2);
    let counting = p.tokenizer_or_token_counter().expect("counter");
    assert!(matches!(counting, TokenCounting::Counter(_)));
    assert_eq!(counting.count_tokens("abcd").expect("count"), 4);
}

struct SpaceTokenizer;

impl Tokenize for SpaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.split_whitespace().map(|w| w.len() as u32).collect())
    }
}

#[test]
fn tokenizer_without_decode_fails_loudly() {
    let counting = TokenCounting::Tokenizer(Arc::new(SpaceTokenizer));
    assert_eq!(counting.count_tokens("one two three").expect("count"), 3);
    let TokenCounting::Tokenizer(tok) = counting else { panic!("expected tokenizer") };
    let err = tok.decode(&[1, 2]).unwrap_err();
    assert!(matches!(err, Error::Unimplemented { capability: "decode", .. }));
}

#[test]
fn build_fails_before_acquiring_missing_dependency() {
    let opts = CharOptions { present: false, ..CharOptions::new(4) };
    let acquired = Arc::clone(&opts.acquired);
    assert!(!CharProvider::is_available(&opts));

    let err = CharProvider::build(opts).err().expect("no instance");
    match &err {
        Error::DependencyMissing { dependency, remedy } => {
            assert_eq!(dependency, "numeric backend");
            assert!(remedy.contains("--features numeric"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(err.to_string().contains("numeric backend is not available"));
    assert_eq!(acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn build_acquires_once_when_available() {
    let opts = CharOptions::new(4);
    let acquired = Arc::clone(&opts.acquired);
    let p = CharProvider::build(opts).expect("provider");
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert_eq!(p.dimension(), 4);
}

#[test]
fn build_validates_options_before_availability() {
    let opts = CharOptions { dim: 0, present: false, ..CharOptions::new(1) };
    let acquired = Arc::clone(&opts.acquired);
    assert!(matches!(CharProvider::build(opts), Err(Error::InvalidConfig(_))));
    assert_eq!(acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn prepare_hands_back_acquired_deps() {
    let calls = prepare(&CharOptions::new(2)).expect("deps");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn config_reads_embed_table() {
    let cfg = Config::from_toml_str("[embed]\nprovider = \"hash\"\ndim = 384\n").expect("config");
    let s = cfg.embed_settings().expect("settings");
    assert_eq!(s.provider, "hash");
    assert_eq!(s.dim, 384);
    assert_eq!(s.max_len, 256);
    assert_eq!(cfg.get::<usize>("embed.dim").expect("dim"), 384);
}

#[test]
fn config_defaults_without_embed_table() {
    let cfg = Config::from_toml_str("[other]\nx = 1\n").expect("config");
    assert_eq!(cfg.embed_settings().expect("settings"), EmbedSettings::default());
}

#[test]
fn config_rejects_bad_values() {
    assert!(matches!(Config::from_toml_str("[embed]\nprovider = \"rest\"\n"), Err(Error::InvalidConfig(_))));
    assert!(matches!(Config::from_toml_str("[embed]\ndim = 0\n"), Err(Error::InvalidConfig(_))));
}

#[test]
fn resolve_relative_against_base() {
    let tmp = tempfile::TempDir::new().unwrap();
    let base = tmp.path();
    assert_eq!(resolve_with_base(base, "models/bge-m3"), base.join("models/bge-m3"));
    let abs = base.join("abs");
    assert_eq!(resolve_with_base(base, abs.to_string_lossy()), abs);
    assert_eq!(expand_path("plain/dir"), std::path::PathBuf::from("plain/dir"));
}
