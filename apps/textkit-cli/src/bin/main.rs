use std::env;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use textkit_core::config::Config;
use textkit_core::{EmbedInput, EmbeddingProvider};
use textkit_embed::get_default_embedder;

const USAGE: &str = "Usage: textkit <embed|batch|similarity|info> [args...]
  embed <text>             embed one text
  batch <text>...          embed several texts in one call
  similarity <a> <b>       score two texts with the provider's metric
  info                     describe the configured provider";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn head(v: &[f32], n: usize) -> String {
    let shown: Vec<String> = v.iter().take(n).map(|x| format!("{x:.4}")).collect();
    format!("[{}{}]", shown.join(", "), if v.len() > n { ", ..." } else { "" })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (cmd, args) = parse_args();
    tracing::debug!(command = %cmd, args = args.len(), "textkit");
    let config = Config::load().context("loading configuration")?;
    let embedder = get_default_embedder(&config).context("constructing embedding provider")?;

    match cmd.as_str() {
        "embed" => {
            let Some(text) = args.first() else { bail!("Usage: textkit embed \"<text>\"") };
            let v = embedder.embed(text)?;
            println!("{} d={} {}", embedder.repr(), v.len(), head(&v, 8));
        }
        "batch" => {
            if args.is_empty() { bail!("Usage: textkit batch \"<text>\"..."); }
            let out = embedder.call(EmbedInput::Many(args))?;
            println!("{}", serde_json::to_string(&out)?);
        }
        "similarity" => {
            let [a, b] = args.as_slice() else { bail!("Usage: textkit similarity \"<a>\" \"<b>\"") };
            let u = embedder.embed(a)?;
            let v = embedder.embed(b)?;
            println!("{:.6}", embedder.similarity(&u, &v)?);
        }
        "info" => {
            let counting = embedder.tokenizer_or_token_counter()?;
            let sample = "The quick brown fox jumps over the lazy dog";
            println!("provider:  {}", embedder.repr());
            println!("dimension: {}", embedder.dimension());
            println!("tokens:    {} for {sample:?} ({counting:?})", counting.count_tokens(sample)?);
        }
        other => {
            eprintln!("Unknown command: {other}\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}
