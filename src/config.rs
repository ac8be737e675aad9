//! TOML configuration for `pctx`.
//!
//! Every section and field has a default, so an empty file (or no file at
//! the default path) is a valid configuration. Values are validated once at
//! load time and turned into the core's per-call [`PipelineParams`].

use anyhow::{bail, Context, Result};
use paper_context_core::params::{ChunkParams, PipelineParams, RouteOverride, Thresholds};
use paper_context_core::prompt::{PromptTemplate, DEFAULT_DIRECT_INSTRUCTIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/pctx.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    2000
}
fn default_min_chunk_size() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_rag_threshold")]
    pub rag_similarity_threshold: f64,
    #[serde(default = "default_admission_threshold")]
    pub default_similarity_threshold: f64,
    #[serde(default = "default_header_bonus")]
    pub header_bonus: f64,
    /// Paper discovery runs when vector search returns fewer hits than this.
    #[serde(default = "default_min_vector_hits")]
    pub min_vector_hits: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Papers added by one discovery call.
    #[serde(default = "default_discovery_limit")]
    pub discovery_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rag_similarity_threshold: default_rag_threshold(),
            default_similarity_threshold: default_admission_threshold(),
            header_bonus: default_header_bonus(),
            min_vector_hits: default_min_vector_hits(),
            search_limit: default_search_limit(),
            discovery_limit: default_discovery_limit(),
        }
    }
}

fn default_rag_threshold() -> f64 {
    0.7
}
fn default_admission_threshold() -> f64 {
    0.4
}
fn default_header_bonus() -> f64 {
    0.1
}
fn default_min_vector_hits() -> usize {
    1
}
fn default_search_limit() -> usize {
    20
}
fn default_discovery_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default)]
    pub max_segments: Option<usize>,
    #[serde(default)]
    pub diversify_documents: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_length: default_max_context_length(),
            max_segments: None,
            diversify_documents: false,
        }
    }
}

fn default_max_context_length() -> usize {
    4000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_system_instructions")]
    pub system_instructions: String,
    #[serde(default = "default_direct_instructions")]
    pub direct_instructions: String,
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instructions: default_system_instructions(),
            direct_instructions: default_direct_instructions(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

fn default_system_instructions() -> String {
    PromptTemplate::default().system_instructions
}
fn default_direct_instructions() -> String {
    DEFAULT_DIRECT_INSTRUCTIONS.to_string()
}
fn default_max_history_turns() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// `disabled` or `ollama`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "llama2:7b".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory searched when `--corpus` is not given.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: None,
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    ["**/*.pdf", "**/*.docx", "**/*.txt", "**/*.md"]
        .iter()
        .map(|g| g.to_string())
        .collect()
}

impl Config {
    /// Per-call core parameters for this configuration.
    pub fn pipeline_params(&self, route_override: RouteOverride) -> PipelineParams {
        PipelineParams {
            chunking: ChunkParams {
                max_chunk_size: self.chunking.max_chunk_size,
                min_chunk_size: self.chunking.min_chunk_size,
            },
            max_context_length: self.context.max_context_length,
            max_segments: self.context.max_segments,
            diversify_documents: self.context.diversify_documents,
            thresholds: Thresholds {
                rag_similarity_threshold: self.retrieval.rag_similarity_threshold,
                default_similarity_threshold: self.retrieval.default_similarity_threshold,
                route_override,
            },
            header_bonus: self.retrieval.header_bonus,
            prompt: PromptTemplate {
                system_instructions: self.prompt.system_instructions.clone(),
                direct_instructions: self.prompt.direct_instructions.clone(),
                max_history_turns: self.prompt.max_history_turns,
            },
        }
    }
}

/// Load and validate a config file.
///
/// A missing file at [`DEFAULT_CONFIG_PATH`] yields [`Config::default`]; a
/// missing file anywhere else is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.min_chunk_size == 0 {
        bail!("chunking.min_chunk_size must be > 0");
    }
    if config.chunking.max_chunk_size < 2 * config.chunking.min_chunk_size {
        bail!("chunking.max_chunk_size must be at least twice chunking.min_chunk_size");
    }

    // Retrieval
    for (name, value) in [
        (
            "retrieval.rag_similarity_threshold",
            config.retrieval.rag_similarity_threshold,
        ),
        (
            "retrieval.default_similarity_threshold",
            config.retrieval.default_similarity_threshold,
        ),
        ("retrieval.header_bonus", config.retrieval.header_bonus),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{} must be in [0.0, 1.0]", name);
        }
    }
    if config.retrieval.search_limit == 0 {
        bail!("retrieval.search_limit must be >= 1");
    }
    if config.retrieval.discovery_limit == 0 {
        bail!("retrieval.discovery_limit must be >= 1");
    }

    // Context
    if config.context.max_context_length == 0 {
        bail!("context.max_context_length must be > 0");
    }
    if config.context.max_segments == Some(0) {
        bail!("context.max_segments must be >= 1 when set");
    }

    // Generation
    match config.generation.provider.as_str() {
        "disabled" => {}
        "ollama" => {
            if config.generation.model.trim().is_empty() {
                bail!("generation.model must be specified when provider is 'ollama'");
            }
            if config.generation.timeout_secs == 0 {
                bail!("generation.timeout_secs must be > 0");
            }
        }
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }

    Ok(())
}

/// Commented starter config written by `pctx init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# Paper Context configuration

[chunking]
# Segment length limits, in characters.
max_chunk_size = 2000
min_chunk_size = 50

[retrieval]
# Best candidate must reach this score for a RAG answer.
rag_similarity_threshold = 0.7
# Candidates below this never enter the context block.
default_similarity_threshold = 0.4
# Added when a section heading matches the question.
header_bonus = 0.1
# Discover papers when vector search returns fewer hits than this.
min_vector_hits = 1
search_limit = 20
discovery_limit = 5

[context]
max_context_length = 4000
# max_segments = 8
diversify_documents = false

[prompt]
max_history_turns = 10

[generation]
# "disabled" or "ollama"
provider = "disabled"
model = "llama2:7b"
base_url = "http://localhost:11434"
timeout_secs = 30

[corpus]
# root = "./papers"
include_globs = ["**/*.pdf", "**/*.docx", "**/*.txt", "**/*.md"]
exclude_globs = []
"#;

/// Write [`DEFAULT_CONFIG_TOML`] to `path`, refusing to overwrite.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking, ChunkingConfig::default());
        assert_eq!(config.retrieval, RetrievalConfig::default());
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_pipeline_params_follow_config() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            max_chunk_size = 800
            min_chunk_size = 80
            [retrieval]
            rag_similarity_threshold = 0.6
            [context]
            max_segments = 3
            "#,
        )
        .unwrap();
        let params = config.pipeline_params(RouteOverride::ForceRag);
        assert_eq!(params.chunking.max_chunk_size, 800);
        assert_eq!(params.max_segments, Some(3));
        assert!((params.thresholds.rag_similarity_threshold - 0.6).abs() < 1e-12);
        assert_eq!(params.thresholds.route_override, RouteOverride::ForceRag);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.chunking.max_chunk_size = 60;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.retrieval.default_similarity_threshold = 1.2;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.generation.provider = "openai".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown generation provider"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = load_config(Path::new("/nonexistent/pctx.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config/pctx.toml");
        write_default_config(&path).unwrap();
        assert!(load_config(&path).is_ok());
        assert!(write_default_config(&path).is_err());
    }
}
