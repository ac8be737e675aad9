//! Prompt construction for the generation collaborator.
//!
//! A [`PromptPayload`] is built from data the caller already holds: the
//! query, an optional context block and the conversation history. Its
//! parts always appear in this order:
//!
//! 1. system instructions
//! 2. context block (RAG only)
//! 3. prior turns, oldest first
//! 4. the current query
//!
//! The payload is handed to the generator as-is; the core never parses a
//! generated answer.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::models::{ContextBlock, Document, Role, Turn};

pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You answer questions about academic papers. \
Base your answer on the paper excerpts provided and name the paper and section you draw on. \
If the excerpts do not contain the answer, say so.";

pub const DEFAULT_DIRECT_INSTRUCTIONS: &str = "You answer questions about academic papers. \
No paper excerpts were retrieved for this question, so answer from general knowledge and say \
when you are unsure.";

pub const DEFAULT_MAX_HISTORY_TURNS: usize = 10;

/// Instructions and limits used when building prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// System text for prompts that carry a context block.
    pub system_instructions: String,
    /// System text for direct prompts.
    pub direct_instructions: String,
    /// Only the most recent turns are kept.
    pub max_history_turns: usize,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            direct_instructions: DEFAULT_DIRECT_INSTRUCTIONS.to_string(),
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
        }
    }
}

/// Where one context segment came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: String,
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    pub section: Option<String>,
    pub sequence: usize,
    pub score: f64,
}

impl SourceRef {
    fn label(&self) -> String {
        let title = self.title.as_deref().unwrap_or(&self.document_id);
        let name = match self.authors.as_slice() {
            [] => title.to_string(),
            [one] => format!("{title} ({one})"),
            [first, second] => format!("{title} ({first} and {second})"),
            [first, ..] => format!("{title} ({first} et al.)"),
        };
        match &self.section {
            Some(section) => format!("{name}, section \"{section}\""),
            None => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Everything the generator needs to answer one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub system: String,
    /// Rendered context block; `None` for direct prompts.
    pub context: Option<String>,
    pub sources: Vec<SourceRef>,
    pub history: Vec<Turn>,
    pub query: String,
}

impl PromptPayload {
    pub fn is_rag(&self) -> bool {
        self.context.is_some()
    }

    /// Single-text rendering for completion-style generators.
    pub fn render(&self) -> String {
        let mut parts = vec![self.system.clone()];
        if let Some(context) = self.context_section() {
            parts.push(context);
        }
        if !self.history.is_empty() {
            let turns: Vec<String> = self
                .history
                .iter()
                .map(|t| format!("{}: {}", t.role, t.content))
                .collect();
            parts.push(format!("Previous conversation:\n{}", turns.join("\n")));
        }
        parts.push(format!("Question: {}", self.query));
        parts.join("\n\n")
    }

    /// Chat rendering: system message (with context), prior turns, query.
    pub fn messages(&self) -> Vec<Message> {
        let system = match self.context_section() {
            Some(context) => format!("{}\n\n{}", self.system, context),
            None => self.system.clone(),
        };

        let mut messages = vec![Message {
            role: MessageRole::System,
            content: system,
        }];
        messages.extend(self.history.iter().map(|t| Message {
            role: match t.role {
                Role::User => MessageRole::User,
                Role::Assistant => MessageRole::Assistant,
            },
            content: t.content.clone(),
        }));
        messages.push(Message {
            role: MessageRole::User,
            content: self.query.clone(),
        });
        messages
    }

    fn context_section(&self) -> Option<String> {
        let context = self.context.as_ref()?;
        let mut section = format!("Context from papers:\n{context}");
        if !self.sources.is_empty() {
            section.push_str("\n\nSources:");
            for (i, source) in self.sources.iter().enumerate() {
                section.push_str(&format!("\n[{}] {}", i + 1, source.label()));
            }
        }
        Some(section)
    }
}

/// Build the prompt for a query.
///
/// An empty or missing context block yields a direct prompt. `documents`
/// is only used to look up titles for the source list.
///
/// # Errors
///
/// [`CoreError::InvalidInput`] when the query is empty.
pub fn build_prompt(
    query: &str,
    context: Option<&ContextBlock>,
    history: &[Turn],
    template: &PromptTemplate,
    documents: &[Document],
) -> Result<PromptPayload> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CoreError::invalid_input("query is empty"));
    }

    let keep_from = history.len().saturating_sub(template.max_history_turns);
    let history = history[keep_from..].to_vec();

    let payload = match context.filter(|block| !block.is_empty()) {
        Some(block) => PromptPayload {
            system: template.system_instructions.clone(),
            context: Some(block.render()),
            sources: block
                .segments
                .iter()
                .map(|s| {
                    let doc = documents.iter().find(|d| d.id == s.segment.document_id);
                    SourceRef {
                        document_id: s.segment.document_id.clone(),
                        title: doc.and_then(|d| d.title.clone()),
                        authors: doc.map(|d| d.authors.clone()).unwrap_or_default(),
                        section: s.segment.section.clone(),
                        sequence: s.segment.sequence,
                        score: s.score,
                    }
                })
                .collect(),
            history,
            query: query.to_string(),
        },
        None => PromptPayload {
            system: template.direct_instructions.clone(),
            context: None,
            sources: Vec::new(),
            history,
            query: query.to_string(),
        },
    };
    Ok(payload)
}
