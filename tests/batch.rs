//! Batch pipeline tests with in-process collaborators.
//!
//! The rasterizer writes real PNG files with the `image` crate and the
//! vision model answers from a script, so the whole folder → result-file
//! path runs without pdfium or network access.

use async_trait::async_trait;
use edgequake_llm::ImageData;
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use talent_trawler::{
    trawl_folder, trawl_folder_with_cancellation, BatchProgressCallback, DocumentError,
    ModelReply, Outcome, Rasterizer, TrawlConfig, TrawlerError, VisionModel,
};
use tokio_util::sync::CancellationToken;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Page count per document id; unknown ids get one page. Records every
/// output directory it was handed.
struct ScriptedRasterizer {
    pages: HashMap<&'static str, usize>,
    seen_dirs: Mutex<Vec<PathBuf>>,
}

impl Rasterizer for ScriptedRasterizer {
    fn rasterize(
        &self,
        _pdf: &Path,
        out: &Path,
        prefix: &str,
    ) -> Result<Vec<PathBuf>, DocumentError> {
        self.seen_dirs.lock().unwrap().push(out.to_path_buf());
        let n = self.pages.get(prefix).copied().unwrap_or(1);
        (1..=n)
            .map(|page| {
                let path = out.join(format!("{prefix}_{page}.png"));
                RgbImage::from_pixel(16, 16, Rgb([250, 250, 250]))
                    .save(&path)
                    .map_err(|e| DocumentError::Internal(e.to_string()))?;
                Ok(path)
            })
            .collect()
    }
}

/// Replies in call order from a fixed list; records the prompts it saw.
struct ScriptedModel {
    replies: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        let mut replies: Vec<String> = replies.iter().map(|s| s.to_string()).collect();
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn infer(
        &self,
        images: Vec<ImageData>,
        prompt: &str,
    ) -> Result<ModelReply, DocumentError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| DocumentError::ModelFailed {
                detail: "no scripted reply left".into(),
            })?;
        Ok(ModelReply {
            text,
            input_tokens: 1000 * images.len() as u64,
            output_tokens: 100,
        })
    }
}

#[derive(Default)]
struct Counting {
    completes: AtomicUsize,
    errors: AtomicUsize,
}

impl BatchProgressCallback for Counting {
    fn on_document_complete(&self, _: usize, _: usize, _: &str) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_error(&self, _: usize, _: usize, _: &str, _: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const SCHEMA: &str = r#"{
  "subject": "Site Reliability Engineer",
  "questions": [
    { "field": "candidate_name", "question": "What is the candidate's full name?" },
    { "field": "years_experience", "question": "Total years of experience?", "type": "int" },
    { "field": "on_call_ready", "question": "Has the candidate done on-call rotations?", "type": "bool" }
  ]
}"#;

fn folder_with(schema: &str, pdfs: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), schema).unwrap();
    for name in pdfs {
        std::fs::write(dir.path().join(name), b"%PDF-1.7 placeholder").unwrap();
    }
    dir
}

fn config(rasterizer: ScriptedRasterizer, model: Arc<ScriptedModel>) -> TrawlConfig {
    TrawlConfig::builder()
        .rasterizer(Arc::new(rasterizer))
        .vision_model(model)
        .build()
        .unwrap()
}

fn pages(counts: &[(&'static str, usize)]) -> ScriptedRasterizer {
    ScriptedRasterizer {
        pages: counts.iter().copied().collect(),
        seen_dirs: Mutex::new(Vec::new()),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_document_does_not_affect_the_others() {
    let dir = folder_with(SCHEMA, &["1_ada.pdf", "2_bob.pdf", "3_cy.pdf"]);
    let model = ScriptedModel::new(&[
        r#"{"candidate_name": "Ada “The Countess” Lovelace", "years_experience": 12, "on_call_ready": true}"#,
        "```json\n{\"candidate_name\": \"Cy Twombly\", \"years_experience\": \"3.0\", \"on_call_ready\": \"no\"}\n```",
    ]);
    let counting = Arc::new(Counting::default());
    let mut cfg = config(pages(&[("1_ada", 2), ("2_bob", 0), ("3_cy", 1)]), model.clone());
    cfg.progress_callback = Some(counting.clone() as Arc<dyn BatchProgressCallback>);

    let out = trawl_folder(dir.path(), &cfg).await.unwrap();
    let results = &out.report.results;

    assert_eq!(results.len(), 3);
    let ids: Vec<&str> = results.iter().map(|r| r.document_id()).collect();
    assert_eq!(ids, vec!["1_ada", "2_bob", "3_cy"]);

    assert_eq!(results[0].outcome(), Outcome::Success);
    assert_eq!(results[1].outcome(), Outcome::Failure);
    assert_eq!(results[2].outcome(), Outcome::Success);
    assert_eq!(results[1].error_message(), Some("PDF conversion produced no pages"));
    assert!(results[1].values().all_null());

    assert_eq!(results[0].pages_processed(), 2);
    assert_eq!(results[0].input_tokens(), 2000);

    assert_eq!(out.report.summary.succeeded, 2);
    assert_eq!(out.report.summary.failed, 1);
    assert_eq!(out.report.summary.total_input_tokens, 3000);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 2);
    assert_eq!(counting.errors.load(Ordering::SeqCst), 1);

    // The model was only called for the two documents that rendered.
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Site Reliability Engineer"));
    assert!(prompts[0].contains("- years_experience (int): Total years of experience?"));

    let csv = std::fs::read_to_string(&out.output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "document_id,outcome,pages_processed,input_tokens,output_tokens,cost,\
         candidate_name,years_experience,on_call_ready,error_message"
    );
    assert_eq!(
        lines[1],
        "1_ada,success,2,2000,100,0.007500,\"Ada \"\"The Countess\"\" Lovelace\",12,true,"
    );
    assert_eq!(lines[2], "2_bob,failure,0,0,0,0.000000,,,,PDF conversion produced no pages");
    assert_eq!(lines[3], "3_cy,success,1,1000,100,0.004500,Cy Twombly,3,false,");
    assert_eq!(lines.len(), 4);
}

#[tokio::test]
async fn structured_mode_writes_json_with_native_types() {
    let schema = SCHEMA.replacen('{', "{\n  \"output_mode\": \"Structured\",", 1);
    let dir = folder_with(&schema, &["ann.pdf"]);
    let model = ScriptedModel::new(&[
        r#"Here you go: {"candidate_name": "Ann", "years_experience": 7.9, "on_call_ready": "maybe"}"#,
    ]);

    let out = trawl_folder(dir.path(), &config(pages(&[]), model)).await.unwrap();

    let name = out.output_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("resume_trawl_1_resumes_"), "got {name}");
    assert!(name.ends_with(".json"), "got {name}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out.output_path).unwrap()).unwrap();
    let record = &json[0];
    assert_eq!(record["outcome"], "success");
    assert_eq!(record["values"]["candidate_name"], "Ann");
    assert_eq!(record["values"]["years_experience"], 7);
    assert!(record["values"]["on_call_ready"].is_null());
}

#[tokio::test]
async fn unparsable_reply_is_a_failure_with_usage() {
    let dir = folder_with(SCHEMA, &["dan.pdf"]);
    let model = ScriptedModel::new(&["I could not find a resume in these images."]);

    let out = trawl_folder(dir.path(), &config(pages(&[]), model)).await.unwrap();
    let r = &out.report.results[0];
    assert_eq!(r.outcome(), Outcome::Failure);
    assert_eq!(r.input_tokens(), 1000);
    assert!(r.cost() > 0.0);
    assert!(r.values().all_null());
}

#[tokio::test]
async fn configuration_errors_abort_before_processing() {
    let model = ScriptedModel::new(&[]);

    let empty = folder_with(SCHEMA, &[]);
    let err = trawl_folder(empty.path(), &config(pages(&[]), model.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, TrawlerError::NoDocuments { .. }));

    let bad = folder_with(r#"{"subject": "x", "questions": []}"#, &["a.pdf"]);
    let err = trawl_folder(bad.path(), &config(pages(&[]), model.clone()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("'questions' list cannot be empty"));
    // Nothing besides the inputs was written.
    assert_eq!(std::fs::read_dir(bad.path()).unwrap().count(), 2);
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_batch_still_writes_one_row_per_document() {
    let dir = folder_with(SCHEMA, &["a.pdf", "b.pdf"]);
    let token = CancellationToken::new();
    token.cancel();

    let out = trawl_folder_with_cancellation(
        dir.path(),
        &config(pages(&[]), ScriptedModel::new(&[])),
        token,
    )
    .await
    .unwrap();

    assert!(out.report.cancelled);
    assert_eq!(out.report.summary.failed, 2);
    let csv = std::fs::read_to_string(&out.output_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("Processing cancelled"));
}

#[tokio::test]
async fn documents_sharing_a_stem_get_separate_scratch_dirs() {
    let dir = folder_with(SCHEMA, &["a.pdf", "a.PDF"]);
    let scratch = tempfile::tempdir().unwrap();
    let reply = r#"{"candidate_name": "Ann", "years_experience": 4, "on_call_ready": true}"#;
    let rasterizer = Arc::new(pages(&[("a", 3)]));
    let cfg = TrawlConfig::builder()
        .rasterizer(rasterizer.clone())
        .vision_model(ScriptedModel::new(&[reply, reply]))
        .scratch_dir(scratch.path())
        .concurrency(2)
        .build()
        .unwrap();

    let out = trawl_folder(dir.path(), &cfg).await.unwrap();
    assert_eq!(out.report.summary.succeeded, 2);
    assert!(out.report.results.iter().all(|r| r.pages_processed() == 3));

    let mut seen = rasterizer.seen_dirs.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![scratch.path().join("a.PDF"), scratch.path().join("a.pdf")]
    );
    for name in ["a.PDF", "a.pdf"] {
        assert!(scratch.path().join(name).join("a_3.png").exists());
    }
}
