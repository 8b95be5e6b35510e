//! Cascade behavior tests
//!
//! Ordering, escalation and failure isolation across the three stages. Only
//! regex-decided records are asserted exactly across repeated runs; in
//! production, LLM-dependent records may vary between calls.


use async_trait::async_trait;
use logcascade_classifiers::{
    Cascade, EmbeddingStrategy, Encoder, LogisticRegression, RegexRule, RegexStrategy,
    StageOutcome, Strategy,
};
use logcascade_core::{Availability, Label, LogRecord, Result, Verdict};
use mock_strategies::{FailingStrategy, MockStrategy, UnavailableLoader};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn regex_404() -> Arc<RegexStrategy> {
    Arc::new(
        RegexStrategy::new(vec![RegexRule::new("404", "HTTP Error")], true)
            .expect("valid rules"),
    )
}

/// Encodes by counting two keywords
struct KeywordEncoder;

impl Encoder for KeywordEncoder {
    fn dimension(&self) -> usize {
        2
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(vec![
            text.matches("cpu").count() as f32,
            text.matches("login").count() as f32,
        ])
    }
}

/// Binary model: "cpu" pushes towards Resource Usage, "login" towards Security Alert
fn embedding_strategy() -> Arc<EmbeddingStrategy> {
    let classifier = Arc::new(LogisticRegression {
        classes: vec!["Resource Usage".to_string(), "Security Alert".to_string()],
        coef: vec![vec![-3.0, 3.0]],
        intercept: vec![0.0],
    });
    Arc::new(
        EmbeddingStrategy::new(Arc::new(KeywordEncoder), classifier)
            .expect("dimensions match")
            .with_threshold(0.6),
    )
}

fn records(messages: &[&str]) -> Vec<LogRecord> {
    messages
        .iter()
        .enumerate()
        .map(|(idx, message)| LogRecord::new(format!("app{}", idx), *message))
        .collect()
}

#[tokio::test]
async fn test_output_matches_input_length_and_order() {
    let llm = Arc::new(
        MockStrategy::new("llm")
            .with_response("escalation", Verdict::label("Workflow Error"))
            .with_response("deprecated", Verdict::label("Deprecation Warning")),
    );
    let cascade = Cascade::builder()
        .strategy(regex_404())
        .strategy(embedding_strategy())
        .strategy(llm)
        .build();

    let batch = records(&[
        "GET /api/users returned 404",
        "Case escalation for ticket ID 7324 failed",
        "CPU usage at 98% on node-3",
        "The 'ReportGenerator' module is deprecated",
        "Multiple login failures from 10.0.0.7",
        "cpu login",
    ]);
    let labels = cascade.classify(&batch).await;

    assert_eq!(labels.len(), batch.len());
    assert_eq!(
        labels,
        vec![
            Label::new("HTTP Error"),
            Label::new("Workflow Error"),
            Label::new("Resource Usage"),
            Label::new("Deprecation Warning"),
            Label::new("Security Alert"),
            Label::unclassified(),
        ]
    );
}

#[tokio::test]
async fn test_regex_match_wins_regardless_of_later_stages() {
    let embedding = Arc::new(MockStrategy::new("embedding").with_fallback(Verdict::label("Other")));
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Other")));

    let cascade = Cascade::builder()
        .strategy(regex_404())
        .strategy(embedding.clone())
        .strategy(llm.clone())
        .build();

    let labels = cascade
        .classify(&records(&["API returned 404 not found error"]))
        .await;
    assert_eq!(labels, vec![Label::new("HTTP Error")]);
    assert_eq!(embedding.call_count(), 0);
    assert_eq!(llm.call_count(), 0);

    // Same outcome when the later stages are unavailable
    let cascade = Cascade::builder()
        .strategy(regex_404())
        .loader(Arc::new(UnavailableLoader::new("embedding")))
        .loader(Arc::new(UnavailableLoader::new("llm")))
        .build();
    let labels = cascade
        .classify(&records(&["API returned 404 not found error"]))
        .await;
    assert_eq!(labels, vec![Label::new("HTTP Error")]);
}

#[tokio::test]
async fn test_confident_embedding_skips_llm_when_regex_unavailable() {
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")));

    let cascade = Cascade::builder()
        .loader(Arc::new(UnavailableLoader::new("regex")))
        .strategy(embedding_strategy())
        .strategy(llm.clone())
        .build();

    let decision = cascade.classify_one("CPU usage at 98%").await;

    assert_eq!(decision.label, "Resource Usage");
    assert_eq!(decision.decided_by.as_deref(), Some("embedding"));
    assert_eq!(decision.trace[0].outcome, StageOutcome::Skipped);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_low_confidence_embedding_escalates_to_llm() {
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")));

    let cascade = Cascade::builder()
        .strategy(regex_404())
        .strategy(embedding_strategy())
        .strategy(llm.clone())
        .build();

    // Equal keyword counts put the model at 0.5, below the 0.6 threshold
    let decision = cascade.classify_one("cpu spike after login").await;

    assert_eq!(decision.label, "Workflow Error");
    assert_eq!(decision.decided_by.as_deref(), Some("llm"));
    assert_eq!(
        decision.trace[1].outcome,
        StageOutcome::Answered(Verdict::Unclassified)
    );
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_failing_embedding_escalates_to_llm() {
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")));

    let cascade = Cascade::builder()
        .strategy(regex_404())
        .strategy(Arc::new(FailingStrategy::new("embedding")))
        .strategy(llm.clone())
        .build();

    let decision = cascade.classify_one("Lead conversion failed").await;

    assert_eq!(decision.label, "Workflow Error");
    assert!(matches!(decision.trace[1].outcome, StageOutcome::Failed(_)));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_all_unavailable_is_unclassified() {
    let regex = Arc::new(UnavailableLoader::new("regex"));
    let embedding = Arc::new(UnavailableLoader::new("embedding"));
    let llm = Arc::new(UnavailableLoader::new("llm"));

    let cascade = Cascade::builder()
        .loader(regex.clone())
        .loader(embedding.clone())
        .loader(llm.clone())
        .build();

    let labels = cascade
        .classify(&[LogRecord::new("app2", "some never-seen phrase xyz")])
        .await;
    assert_eq!(labels, vec![Label::unclassified()]);

    for (_, availability) in cascade.availability() {
        assert!(matches!(availability, Availability::Unavailable { .. }));
    }

    // Failures are cached: no retry on the next batch
    cascade
        .classify(&records(&["another", "batch"]))
        .await;
    assert_eq!(regex.attempts(), 1);
    assert_eq!(embedding.attempts(), 1);
    assert_eq!(llm.attempts(), 1);
}

#[tokio::test]
async fn test_failure_on_one_record_does_not_affect_the_next() {
    let flaky = Arc::new(
        FailingStrategy::new("embedding").failing_on("poison", Verdict::label("Resource Usage")),
    );
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")));

    let cascade = Cascade::builder()
        .strategy(regex_404())
        .strategy(flaky.clone())
        .strategy(llm.clone())
        .build();

    let labels = cascade
        .classify(&records(&[
            "poison record",
            "CPU usage at 98%",
            "returned 404",
        ]))
        .await;

    assert_eq!(
        labels,
        vec![
            Label::new("Workflow Error"),
            Label::new("Resource Usage"),
            Label::new("HTTP Error"),
        ]
    );
    assert_eq!(flaky.call_count(), 2);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_regex_only_is_idempotent() {
    let cascade = Cascade::builder()
        .strategy(Arc::new(RegexStrategy::with_defaults().expect("defaults compile")))
        .build();

    let batch = records(&[
        "User User123 logged in.",
        "Backup completed successfully.",
        "System updated to version 2.3.1.",
        "Something nobody has seen",
    ]);

    let first = cascade.classify(&batch).await;
    for _ in 0..5 {
        assert_eq!(cascade.classify(&batch).await, first);
    }
    assert_eq!(
        first,
        vec![
            Label::new("User Action"),
            Label::new("System Notification"),
            Label::new("System Notification"),
            Label::unclassified(),
        ]
    );
}

#[tokio::test]
async fn test_http_error_example() {
    let cascade = Cascade::builder().strategy(regex_404()).build();

    let labels = cascade
        .classify(&[LogRecord::new("app1", "API returned 404 not found error")])
        .await;
    assert_eq!(labels, vec![Label::new("HTTP Error")]);
}

/// Sleeps longer for earlier records so completion order is reversed
struct ReverseLatency;

#[async_trait]
impl Strategy for ReverseLatency {
    async fn classify(&self, message: &str) -> Result<Verdict> {
        let idx: u64 = message.parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(100 - idx * 10)).await;
        Ok(Verdict::label(format!("label-{}", idx)))
    }

    fn name(&self) -> &str {
        "reverse"
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_classification_preserves_order() {
    let cascade = Cascade::builder()
        .strategy(Arc::new(ReverseLatency))
        .max_concurrency(4)
        .build();

    let batch: Vec<LogRecord> = (0..8)
        .map(|idx| LogRecord::new("app", idx.to_string()))
        .collect();
    let labels = cascade.classify(&batch).await;

    let expected: Vec<Label> = (0..8).map(|idx| Label::new(format!("label-{}", idx))).collect();
    assert_eq!(labels, expected);
}

#[tokio::test]
async fn test_detailed_trace_records_every_consulted_stage() {
    let cascade = Cascade::builder()
        .strategy(regex_404())
        .loader(Arc::new(UnavailableLoader::new("embedding")))
        .strategy(Arc::new(
            MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")),
        ))
        .build();

    let decisions = cascade
        .classify_detailed(&records(&["404 on /health", "Escalation rule failed"]))
        .await;

    assert_eq!(decisions[0].decided_by.as_deref(), Some("regex"));
    assert_eq!(decisions[0].trace.len(), 1);

    let names: Vec<&str> = decisions[1]
        .trace
        .iter()
        .map(|entry| entry.strategy.as_str())
        .collect();
    assert_eq!(names, vec!["regex", "embedding", "llm"]);
    assert_eq!(decisions[1].trace[0].outcome, StageOutcome::Answered(Verdict::NoOpinion));
    assert_eq!(decisions[1].trace[1].outcome, StageOutcome::Skipped);
    assert_eq!(decisions[1].label, "Workflow Error");
}

/// Encoder whose forward pass blocks the thread, like a slow model on CPU
struct SlowEncoder;

impl Encoder for SlowEncoder {
    fn dimension(&self) -> usize {
        2
    }

    fn encode(&self, _text: &str) -> Result<Vec<f32>> {
        std::thread::sleep(Duration::from_secs(1));
        Ok(vec![1.0, 0.0])
    }
}

#[tokio::test]
async fn test_slow_embedding_times_out_and_escalates() {
    let classifier = Arc::new(LogisticRegression {
        classes: vec!["Resource Usage".to_string(), "Security Alert".to_string()],
        coef: vec![vec![-3.0, 3.0]],
        intercept: vec![0.0],
    });
    let embedding = Arc::new(
        EmbeddingStrategy::new(Arc::new(SlowEncoder), classifier).expect("dimensions match"),
    );
    let llm = Arc::new(MockStrategy::new("llm").with_fallback(Verdict::label("Workflow Error")));

    let cascade = Cascade::builder()
        .strategy(embedding)
        .strategy(llm.clone())
        .strategy_timeout(Duration::from_millis(100))
        .build();

    let start = Instant::now();
    let decision = cascade.classify_one("msg").await;

    assert!(start.elapsed() < Duration::from_millis(900), "took {:?}", start.elapsed());
    assert_eq!(
        decision.trace[0].outcome,
        StageOutcome::Failed("operation timed out".to_string())
    );
    assert_eq!(decision.label, "Workflow Error");
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_share_one_initialization() {
    let regex = Arc::new(UnavailableLoader::new("regex").with_latency(Duration::from_millis(50)));
    let embedding =
        Arc::new(UnavailableLoader::new("embedding").with_latency(Duration::from_millis(50)));

    let cascade = Arc::new(
        Cascade::builder()
            .loader(regex.clone())
            .loader(embedding.clone())
            .max_concurrency(4)
            .build(),
    );

    let batches = (0..8).map(|_| {
        let cascade = Arc::clone(&cascade);
        tokio::spawn(async move {
            cascade
                .classify(&records(&["first", "second", "third", "fourth"]))
                .await
        })
    });

    for labels in futures::future::join_all(batches).await {
        assert_eq!(labels.unwrap(), vec![Label::unclassified(); 4]);
    }
    assert_eq!(regex.attempts(), 1);
    assert_eq!(embedding.attempts(), 1);
}
