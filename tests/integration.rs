use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PAPER: &str = "Attention Is All You Need\n\n\
Abstract\n\
The dominant sequence transduction models are based on recurrent networks. \
We propose the Transformer, based solely on attention mechanisms.\n\n\
1. Introduction\n\
Recurrent models process tokens sequentially, which precludes parallelization within training examples.\n\n\
2. Methods\n\
The Transformer uses multi-head self-attention with eight parallel attention heads in every layer.\n\n\
3. Results\n\
The model reaches 28.4 BLEU on the WMT 2014 English-to-German translation task.\n";

fn pctx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pctx");
    path
}

struct TestEnv {
    _tmp: TempDir,
    root: PathBuf,
    config_path: PathBuf,
    paper: PathBuf,
}

fn setup_test_env() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("pctx.toml");
    fs::write(
        &config_path,
        r#"[chunking]
max_chunk_size = 2000
min_chunk_size = 50

[retrieval]
rag_similarity_threshold = 0.7
default_similarity_threshold = 0.4
"#,
    )
    .unwrap();

    let papers = root.join("papers");
    fs::create_dir_all(&papers).unwrap();
    let paper = papers.join("attention.txt");
    fs::write(&paper, PAPER).unwrap();
    fs::write(
        papers.join("bread.md"),
        "Baking Bread\n\nKnead the dough for ten minutes and let it rise overnight.\n",
    )
    .unwrap();

    TestEnv {
        _tmp: tmp,
        root,
        config_path,
        paper,
    }
}

fn run_pctx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pctx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pctx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_writes_config_once() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nested").join("pctx.toml");

    let (stdout, stderr, success) = run_pctx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Wrote default config"));
    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("[retrieval]"));

    let (_, stderr, success) = run_pctx(&config_path, &["init"]);
    assert!(!success, "second init should refuse to overwrite");
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_chunk_shows_sections() {
    let env = setup_test_env();
    let (stdout, stderr, success) =
        run_pctx(&env.config_path, &["chunk", env.paper.to_str().unwrap()]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Headings: 4"));
    assert!(stdout.contains("Methods"));
    assert!(stdout.contains("Results"));
}

#[test]
fn test_chunk_json_segments_match_source() {
    let env = setup_test_env();
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &["chunk", env.paper.to_str().unwrap(), "--json"],
    );
    assert!(success, "chunk failed: stderr={}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let segments = report["segments"].as_array().unwrap();
    assert!(segments.len() >= 4);

    let mut covered = String::new();
    for seg in segments {
        let start = seg["start"].as_u64().unwrap() as usize;
        let end = seg["end"].as_u64().unwrap() as usize;
        assert_eq!(seg["text"].as_str().unwrap(), &PAPER[start..end]);
        covered.push_str(&PAPER[start..end]);
    }
    assert_eq!(covered, PAPER);
}

#[test]
fn test_chunk_unsupported_file_fails() {
    let env = setup_test_env();
    let path = env.root.join("figure.png");
    fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let (_, stderr, success) = run_pctx(&env.config_path, &["chunk", path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Unsupported file type"));
}

#[test]
fn test_ask_routes_rag_for_matching_question() {
    let env = setup_test_env();
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--doc",
            env.paper.to_str().unwrap(),
        ],
    );
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Route: rag (max similarity meets threshold)"));
    assert!(stdout.contains("Context from papers:"));
    assert!(stdout.contains("eight parallel attention heads"));
    assert!(stdout.contains("Question: parallel attention heads transformer"));
}

#[test]
fn test_ask_routes_direct_for_unrelated_question() {
    let env = setup_test_env();
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "protein folding",
            "--doc",
            env.paper.to_str().unwrap(),
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);
    assert!(stdout.contains("Route: direct (max similarity below threshold)"));
    assert!(!stdout.contains("Context from papers:"));
    assert!(stdout.contains("Question: protein folding"));
}

#[test]
fn test_ask_force_direct() {
    let env = setup_test_env();
    let (stdout, _, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--doc",
            env.paper.to_str().unwrap(),
            "--force",
            "direct",
        ],
    );
    assert!(success);
    assert!(stdout.contains("Route: direct (forced by caller)"));
    assert!(!stdout.contains("Context from papers:"));
}

#[test]
fn test_ask_json_report() {
    let env = setup_test_env();
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--doc",
            env.paper.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["route"], "rag");
    assert_eq!(report["vector_hits"], 0);
    assert!(report["context"]["segment_count"].as_u64().unwrap() >= 1);
    assert!(report["context"]["total_chars"].as_u64().unwrap() <= 4000);
    assert!(report.get("answer").is_none());
}

#[test]
fn test_ask_with_similarity_file() {
    let env = setup_test_env();
    let doc_id = env.paper.to_str().unwrap();
    let hits = env.root.join("hits.json");
    fs::write(
        &hits,
        serde_json::json!([
            { "document_id": doc_id, "sequence": 0, "similarity": 0.9 },
            { "document_id": doc_id, "sequence": 1, "similarity": 0.2 },
            { "document_id": "elsewhere.pdf", "sequence": 0, "similarity": 0.99 }
        ])
        .to_string(),
    )
    .unwrap();

    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "protein folding",
            "--doc",
            doc_id,
            "--similarities",
            hits.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["route"], "rag");
    assert_eq!(report["vector_hits"], 2);
    assert_eq!(report["stats"]["count"], 2);
    assert_eq!(report["stats"]["admitted"], 1);
}

#[test]
fn test_ask_rejects_unknown_segment_reference() {
    let env = setup_test_env();
    let doc_id = env.paper.to_str().unwrap();
    let hits = env.root.join("hits.json");
    fs::write(
        &hits,
        serde_json::json!([{ "document_id": doc_id, "sequence": 99, "similarity": 0.9 }])
            .to_string(),
    )
    .unwrap();

    let (_, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "attention",
            "--doc",
            doc_id,
            "--similarities",
            hits.to_str().unwrap(),
        ],
    );
    assert!(!success);
    assert!(stderr.contains("99"), "stderr={}", stderr);
}

#[test]
fn test_ask_discovers_papers_in_corpus() {
    let env = setup_test_env();
    let corpus = env.root.join("papers");
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--corpus",
            corpus.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["discovered"], 1);
    assert_eq!(report["documents"], serde_json::json!(["attention.txt"]));
    assert_eq!(report["route"], "rag");
}

#[test]
fn test_ask_history_is_included() {
    let env = setup_test_env();
    let history = env.root.join("history.json");
    fs::write(
        &history,
        r#"[{"role": "user", "content": "Which paper introduced the Transformer?"},
            {"role": "assistant", "content": "Attention Is All You Need."}]"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--doc",
            env.paper.to_str().unwrap(),
            "--history",
            history.to_str().unwrap(),
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);
    assert!(stdout.contains("Previous conversation:"));
    assert!(stdout.contains("User: Which paper introduced the Transformer?"));
}

#[test]
fn test_ask_empty_query_fails() {
    let env = setup_test_env();
    let (_, stderr, success) = run_pctx(
        &env.config_path,
        &["ask", "   ", "--doc", env.paper.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("query is empty"), "stderr={}", stderr);
}

#[test]
fn test_ask_generate_disabled_fails() {
    let env = setup_test_env();
    let (_, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "attention",
            "--doc",
            env.paper.to_str().unwrap(),
            "--generate",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let env = setup_test_env();
    fs::write(&env.config_path, "[chunking]\nmin_chunk_size = 0\n").unwrap();

    let (_, stderr, success) = run_pctx(
        &env.config_path,
        &["ask", "attention", "--doc", env.paper.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("min_chunk_size"));
}

#[test]
fn test_missing_explicit_config_is_error() {
    let env = setup_test_env();
    let missing = env.root.join("nope.toml");
    let (_, stderr, success) = run_pctx(
        &missing,
        &["ask", "attention", "--doc", env.paper.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_ask_empty_query_fails_before_reading_papers() {
    let env = setup_test_env();
    let missing = env.root.join("missing.pdf");
    let (_, stderr, success) = run_pctx(
        &env.config_path,
        &["ask", "", "--doc", missing.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("query is empty"), "stderr={}", stderr);
    assert!(!stderr.contains("Failed to read"), "stderr={}", stderr);
}

#[test]
fn test_ask_doc_inside_corpus_is_loaded_once() {
    let env = setup_test_env();
    let corpus = env.root.join("papers");
    let (stdout, stderr, success) = run_pctx(
        &env.config_path,
        &[
            "ask",
            "parallel attention heads transformer",
            "--doc",
            env.paper.to_str().unwrap(),
            "--corpus",
            corpus.to_str().unwrap(),
            "--json",
        ],
    );
    assert!(success, "ask failed: stderr={}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["discovered"], 0);
    assert_eq!(report["documents"].as_array().unwrap().len(), 1);
    let sources = report["prompt"]["sources"].as_array().unwrap();
    assert!(sources
        .iter()
        .all(|s| s["document_id"] == env.paper.to_str().unwrap()));
}
