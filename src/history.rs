//! Conversation history supplied per call as a JSON file.
//!
//! ```json
//! [
//!   { "role": "user", "content": "What is the transformer?" },
//!   { "role": "assistant", "content": "An attention-only sequence model." }
//! ]
//! ```
//!
//! Nothing is written back; the caller owns the conversation.

use anyhow::{bail, Context, Result};
use paper_context_core::models::Turn;
use std::path::Path;

pub fn load_history(path: &Path) -> Result<Vec<Turn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    let turns: Vec<Turn> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))?;

    if let Some(i) = turns.iter().position(|t| t.content.trim().is_empty()) {
        bail!("History turn {} has empty content", i);
    }
    Ok(turns)
}
