#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod readiness;
pub mod similarity;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use readiness::{Construct, Readiness, Requirement};
pub use traits::EmbeddingProvider;
pub use types::{EmbedInput, Embedded, TokenCounting, Tokenize, Vector};
