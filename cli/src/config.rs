//! Credential resolution and logging setup shared by both binaries.
//!
//! Values come from a CLI flag or environment variable (clap handles both);
//! whatever is still missing is asked for interactively.

use anyhow::{Context, Result};
use std::io::{self, Write};

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Returns the resolved value, prompting on stdin when absent.
pub fn resolve(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            print!("{prompt}: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin()
                .read_line(&mut input)
                .with_context(|| format!("failed to read {prompt}"))?;
            Ok(input.trim().to_string())
        }
    }
}

/// Like [`resolve`] but with hidden input for secrets.
pub fn resolve_secret(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => rpassword::prompt_password(format!("{prompt}: "))
            .with_context(|| format!("failed to read {prompt}")),
    }
}
