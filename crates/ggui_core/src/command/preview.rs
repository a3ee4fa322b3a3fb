//! Human-readable rendering of command tokens.

use std::path::Path;

use super::{BuildResult, GourceOptionsBuilder};
use crate::models::VisualizationConfig;

/// Render the gource command for `config` exactly as it would be run.
pub fn preview(config: &VisualizationConfig, repository_path: &Path) -> BuildResult<String> {
    let tokens = GourceOptionsBuilder::new(config, repository_path).build()?;
    Ok(format_tokens(&tokens))
}

/// Join tokens into a single shell-like line, quoting where needed.
pub fn format_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| quote_token(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format tokens for pretty display (one option per line).
pub fn format_tokens_pretty(tokens: &[String]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = quote_token(&tokens[i]);
        let has_value = tokens[i].starts_with("--")
            && i + 1 < tokens.len()
            && !tokens[i + 1].starts_with("--");
        let is_last = i + 1 + usize::from(has_value) >= tokens.len();

        if has_value {
            result.push_str(&format!("{} {}", token, quote_token(&tokens[i + 1])));
            i += 2;
        } else {
            result.push_str(&token);
            i += 1;
        }

        if is_last {
            result.push('\n');
        } else {
            result.push_str(" \\\n  ");
        }
    }

    result
}

fn quote_token(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | '$' | '`' | '&' | ';' | '|'));
    if needs_quotes {
        format!("'{}'", token.replace('\'', r"'\''"))
    } else {
        token.to_string()
    }
}
