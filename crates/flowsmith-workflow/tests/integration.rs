//! Integration tests for the flowsmith-workflow crate.
//!
//! A scripted `TextGenerator` stands in for the model, answering per
//! strategy, so the full request -> salvage -> normalize -> pair path runs
//! without a network connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use flowsmith_llm::{ChatRequest, LlmError, LlmResponse, TextGenerator};
use flowsmith_workflow::{
    BranchSlot, GeneratorConfig, MALFORMED_USER_MESSAGE, SolutionGenerator, SolutionStrategy,
    WorkflowError, extract, normalize, to_indented_text,
};
use tokio::sync::Barrier;

// ═══════════════════════════════════════════════════════════════════════
//  Scripted model
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone)]
enum Script {
    Answer(&'static str),
    Fail,
}

struct ScriptedModel {
    ai_centric: Script,
    traditional: Script,
    ai_delay: Duration,
    traditional_delay: Duration,
    barrier: Option<Arc<Barrier>>,
    completed: AtomicUsize,
}

impl ScriptedModel {
    fn new(ai_centric: Script, traditional: Script) -> Self {
        Self {
            ai_centric,
            traditional,
            ai_delay: Duration::ZERO,
            traditional_delay: Duration::ZERO,
            barrier: None,
            completed: AtomicUsize::new(0),
        }
    }
}

fn strategy_of(request: &ChatRequest) -> SolutionStrategy {
    let system = request.system_text().unwrap_or_default();
    if system.contains("MUST AVOID AI services") {
        SolutionStrategy::Traditional
    } else {
        SolutionStrategy::AiCentric
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate(&self, request: &ChatRequest) -> flowsmith_llm::Result<LlmResponse> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let (script, delay) = match strategy_of(request) {
            SolutionStrategy::AiCentric => (self.ai_centric.clone(), self.ai_delay),
            SolutionStrategy::Traditional => (self.traditional.clone(), self.traditional_delay),
        };
        tokio::time::sleep(delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);

        match script {
            Script::Answer(text) => Ok(LlmResponse::text(text)),
            Script::Fail => Err(LlmError::RequestFailed {
                reason: "503 Service Unavailable".into(),
            }),
        }
    }
}

const AI_ANSWER: &str = r#"Here is the AI-centric design:
```json
{
  "title": "Invoice Intake with Document Understanding",
  "summary": "Classifies and extracts invoices with DU.",
  "diagram": "Sequence: Main\n  For Each: Invoice in Inbox\n    body:\n      Extract Document Data: Invoice fields\n  If: Confidence High\n    then:\n      Add Queue Item: Post invoice\n    else:\n      Create Validation Action: Human review",
  "components": [
    {"name": "Extract Document Data", "package": "UiPath.IntelligentOCR.Activities", "description": "DU extraction"}
  ],
  "variables": [
    {"name": "confidence", "type": "Double", "scope": "Main", "defaultValue": "0.8"}
  ],
  "arguments": [
    {"name": "in_Mailbox", "direction": "In", "type": "String", "description": "Mailbox to scan"}
  ]
}
```
Let me know if you need changes."#;

const TRADITIONAL_ANSWER: &str = r#"{"title": "Invoice Intake with Regex", "summary": "Brittle for scanned invoices.", "diagram": "Sequence: Main\n  Read PDF Text: Invoice\n  Matches: Invoice number", "components": [], "variables": [], "arguments": []}"#;

fn pair_generator(model: Arc<ScriptedModel>) -> SolutionGenerator {
    SolutionGenerator::new(model, GeneratorConfig::default())
}

// ═══════════════════════════════════════════════════════════════════════
//  Pair generation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn pair_contains_both_normalized_solutions() {
    let model = Arc::new(ScriptedModel::new(
        Script::Answer(AI_ANSWER),
        Script::Answer(TRADITIONAL_ANSWER),
    ));
    let pair = pair_generator(Arc::clone(&model))
        .generate_pair("Process supplier invoices from email", false)
        .await
        .unwrap();

    assert_eq!(pair.ai_centric.title, "Invoice Intake with Document Understanding");
    let main = &pair.ai_centric.diagram[0];
    let steps = main.slot(BranchSlot::Children);
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].slot(BranchSlot::Body)[0].kind, "Extract Document Data");
    assert_eq!(steps[1].slot(BranchSlot::Then)[0].name, "Post invoice");
    assert_eq!(steps[1].slot(BranchSlot::Else)[0].name, "Human review");

    assert_eq!(pair.traditional.title, "Invoice Intake with Regex");
    assert_eq!(pair.traditional.diagram[0].slot(BranchSlot::Children).len(), 2);
    assert_eq!(model.completed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pipelines_run_concurrently() {
    // Each request waits for the other to arrive; sequential execution would
    // never get past the barrier.
    let mut model = ScriptedModel::new(
        Script::Answer(TRADITIONAL_ANSWER),
        Script::Answer(TRADITIONAL_ANSWER),
    );
    model.barrier = Some(Arc::new(Barrier::new(2)));
    let generator = pair_generator(Arc::new(model));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        generator.generate_pair("Reconcile bank statements", true),
    )
    .await
    .expect("pipelines did not run concurrently");
    assert!(result.is_ok());
}

#[tokio::test]
async fn traditional_failure_discards_finished_ai_solution() {
    let mut model = ScriptedModel::new(Script::Answer(AI_ANSWER), Script::Answer("Sorry, I can't."));
    model.traditional_delay = Duration::from_millis(50);
    let model = Arc::new(model);

    let err = pair_generator(Arc::clone(&model))
        .generate_pair("Process supplier invoices", false)
        .await
        .unwrap_err();

    // The AI-centric pipeline had already finished; no pair is returned.
    assert_eq!(model.completed.load(Ordering::SeqCst), 2);
    assert_eq!(err.failed_strategy(), Some(SolutionStrategy::Traditional));
    assert!(err.is_malformed());
    assert_eq!(err.user_message(), MALFORMED_USER_MESSAGE);

    match err {
        WorkflowError::PairGenerationFailure { source, .. } => match *source {
            WorkflowError::MalformedResponse { raw } => assert_eq!(raw, "Sorry, I can't."),
            other => panic!("expected MalformedResponse, got {other:?}"),
        },
        other => panic!("expected PairGenerationFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_is_not_classified_as_malformed() {
    let model = Arc::new(ScriptedModel::new(
        Script::Fail,
        Script::Answer(TRADITIONAL_ANSWER),
    ));

    let err = pair_generator(model)
        .generate_pair("Process supplier invoices", false)
        .await
        .unwrap_err();

    assert_eq!(err.failed_strategy(), Some(SolutionStrategy::AiCentric));
    assert!(!err.is_malformed());
    assert!(err.user_message().contains("503 Service Unavailable"));
}

#[tokio::test]
async fn failure_returns_before_slow_pipeline_finishes() {
    let mut model = ScriptedModel::new(Script::Answer(AI_ANSWER), Script::Fail);
    model.ai_delay = Duration::from_millis(300);
    let model = Arc::new(model);

    let err = pair_generator(Arc::clone(&model))
        .generate_pair("Process supplier invoices", false)
        .await
        .unwrap_err();
    assert_eq!(err.failed_strategy(), Some(SolutionStrategy::Traditional));
    assert_eq!(model.completed.load(Ordering::SeqCst), 1);

    // The abandoned AI-centric request still runs to completion.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(model.completed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn incomplete_solution_fails_the_pair() {
    let model = Arc::new(ScriptedModel::new(
        Script::Answer(r#"{"title": "No summary", "diagram": "", "components": [], "variables": [], "arguments": []}"#),
        Script::Answer(TRADITIONAL_ANSWER),
    ));

    let err = pair_generator(model)
        .generate_pair("Process supplier invoices", false)
        .await
        .unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("summary"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Salvage + normalize without the orchestrator
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn salvage_then_normalize_then_serialize() {
    let solution = normalize(extract(AI_ANSWER).unwrap()).unwrap();
    let text = to_indented_text(&solution.diagram);
    assert!(text.starts_with("Sequence: Main\n  For Each: Invoice in Inbox\n"));
    assert!(text.contains("    body:\n    Extract Document Data: Invoice fields\n"));
    assert_eq!(flowsmith_workflow::diagram::parse(&text), solution.diagram);
}

#[test]
fn pair_json_uses_presentation_field_names() {
    let ai = normalize(extract(AI_ANSWER).unwrap()).unwrap();
    let traditional = normalize(extract(TRADITIONAL_ANSWER).unwrap()).unwrap();
    let pair = flowsmith_workflow::SolutionPair {
        ai_centric: ai,
        traditional,
    };

    let json = serde_json::to_value(&pair).unwrap();
    assert_eq!(
        json["aiSolution"]["diagram"][0]["children"][1]["else"][0]["type"],
        "Create Validation Action"
    );
    assert!(json["traditionalSolution"]["diagram"][0].get("then").is_none());
}
