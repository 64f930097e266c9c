//! Value types shared by every embedding provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// One embedded text unit. Its length equals the producing provider's
/// `dimension()`.
pub type Vector = Vec<f32>;

/// Full tokenizer capability exposed by providers that own one.
pub trait Tokenize: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn decode(&self, _ids: &[u32]) -> Result<String> {
        Err(Error::Unimplemented {
            provider: std::any::type_name::<Self>().to_string(),
            capability: "decode",
        })
    }

    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }
}

pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Either a tokenizer or a bare token counting function.
///
/// Length-aware chunkers must handle both shapes; [`TokenCounting::count_tokens`]
/// covers the common case.
#[derive(Clone)]
pub enum TokenCounting {
    Tokenizer(Arc<dyn Tokenize>),
    Counter(TokenCounter),
}

impl TokenCounting {
    pub fn counter<F>(f: F) -> Self
    where
        F: Fn(&str) -> usize + Send + Sync + 'static,
    {
        Self::Counter(Arc::new(f))
    }

    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        match self {
            Self::Tokenizer(tok) => tok.count_tokens(text),
            Self::Counter(count) => Ok(count(text)),
        }
    }
}

impl fmt::Debug for TokenCounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenizer(_) => f.write_str("TokenCounting::Tokenizer(..)"),
            Self::Counter(_) => f.write_str("TokenCounting::Counter(..)"),
        }
    }
}

/// Input accepted by `EmbeddingProvider::call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedInput {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for EmbedInput {
    fn from(text: &str) -> Self { Self::One(text.to_string()) }
}

impl From<String> for EmbedInput {
    fn from(text: String) -> Self { Self::One(text) }
}

impl From<Vec<String>> for EmbedInput {
    fn from(texts: Vec<String>) -> Self { Self::Many(texts) }
}

impl From<&[&str]> for EmbedInput {
    fn from(texts: &[&str]) -> Self { Self::Many(texts.iter().map(|t| (*t).to_string()).collect()) }
}

impl TryFrom<&Value> for EmbedInput {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::One(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(invalid_input(other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Many),
            other => Err(invalid_input(other)),
        }
    }
}

impl TryFrom<Value> for EmbedInput {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> { Self::try_from(&value) }
}

fn invalid_input(value: &Value) -> Error {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::InvalidInput(format!("input must be a string or list of strings, got {kind}"))
}

/// Output of `EmbeddingProvider::call`, mirroring the [`EmbedInput`] shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embedded {
    One(Vector),
    Many(Vec<Vector>),
}

impl Embedded {
    pub fn into_one(self) -> Option<Vector> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Option<Vec<Vector>> {
        match self {
            Self::Many(vs) => Some(vs),
            Self::One(_) => None,
        }
    }
}
