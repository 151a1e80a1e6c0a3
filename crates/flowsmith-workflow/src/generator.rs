//! Dual-solution generation.
//!
//! [`SolutionGenerator::generate_pair`] runs two independent pipelines, one
//! per [`SolutionStrategy`]:
//!
//! ```text
//! model request ──> salvage::extract ──> solution::normalize
//! ```
//!
//! Each pipeline runs as its own tokio task with its own buffers.  The pair
//! is returned only when both succeed.  The first failure is returned as
//! soon as it happens; the other task is detached and its result discarded.

use std::sync::Arc;

use flowsmith_llm::{ChatRequest, Message, ResponseFormat, TextGenerator};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::diagram;
use crate::error::{Result, WorkflowError};
use crate::prompt;
use crate::salvage;
use crate::solution::{self, SolutionPair, SolutionStrategy, WorkflowSolution};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Request parameters shared by both pipelines.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model identifier.  Empty means the generator's default model.
    pub model: String,

    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Output token cap; `None` leaves the provider default.
    pub max_tokens: Option<u32>,

    /// Reasoning budget (Gemini only).
    pub thinking_budget: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".into(),
            temperature: None,
            max_tokens: None,
            thinking_budget: Some(32_768),
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Produces workflow solutions from process descriptions.
#[derive(Clone)]
pub struct SolutionGenerator {
    model: Arc<dyn TextGenerator>,
    config: GeneratorConfig,
}

impl std::fmt::Debug for SolutionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SolutionGenerator {
    pub fn new(model: Arc<dyn TextGenerator>, config: GeneratorConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The model request for one strategy.
    pub fn build_request(
        &self,
        description: &str,
        allow_marketplace: bool,
        strategy: SolutionStrategy,
    ) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message::system(prompt::system_instruction(strategy)),
                Message::user(prompt::user_prompt(description, allow_marketplace)),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat::Json {
                schema: Some(prompt::response_schema()),
            },
            thinking_budget: self.config.thinking_budget,
        }
    }

    /// Generate a single solution under `strategy`.
    pub async fn generate_solution(
        &self,
        description: &str,
        allow_marketplace: bool,
        strategy: SolutionStrategy,
    ) -> Result<WorkflowSolution> {
        let description = validate_description(description)?;
        let request = self.build_request(description, allow_marketplace, strategy);
        run_pipeline(Arc::clone(&self.model), request, strategy, Uuid::now_v7()).await
    }

    /// Generate the AI-centric and traditional solutions concurrently.
    ///
    /// Fails as a whole if either pipeline fails; the error names the
    /// strategy that failed.
    pub async fn generate_pair(
        &self,
        description: &str,
        allow_marketplace: bool,
    ) -> Result<SolutionPair> {
        let description = validate_description(description)?;
        let request_id = Uuid::now_v7();

        info!(
            %request_id,
            allow_marketplace,
            model = %self.config.model,
            "generating solution pair"
        );

        let spawn = |strategy: SolutionStrategy| {
            let request = self.build_request(description, allow_marketplace, strategy);
            let model = Arc::clone(&self.model);
            tokio::spawn(run_pipeline(model, request, strategy, request_id))
        };

        let ai_centric = spawn(SolutionStrategy::AiCentric);
        let traditional = spawn(SolutionStrategy::Traditional);

        let (ai_centric, traditional) = futures::future::try_join(
            settle(ai_centric, SolutionStrategy::AiCentric),
            settle(traditional, SolutionStrategy::Traditional),
        )
        .await
        .inspect_err(|e| {
            warn!(
                %request_id,
                strategy = ?e.failed_strategy(),
                malformed = e.is_malformed(),
                error = %e,
                "solution pair failed"
            );
        })?;

        info!(%request_id, "solution pair ready");

        Ok(SolutionPair {
            ai_centric,
            traditional,
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn validate_description(description: &str) -> Result<&str> {
    let description = description.trim();
    if description.is_empty() {
        return Err(WorkflowError::InvalidInput {
            reason: "process description is empty".into(),
        });
    }
    Ok(description)
}

/// Request, salvage, and normalize one solution.
async fn run_pipeline(
    model: Arc<dyn TextGenerator>,
    request: ChatRequest,
    strategy: SolutionStrategy,
    request_id: Uuid,
) -> Result<WorkflowSolution> {
    info!(%request_id, %strategy, "requesting solution");

    let response = model.generate(&request).await?;

    if let Some(usage) = &response.usage {
        debug!(
            %request_id,
            %strategy,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "model answered"
        );
    }

    let salvaged = salvage::salvage(&response.text).inspect_err(|_| {
        warn!(%request_id, %strategy, raw = %response.text, "model returned malformed JSON");
    })?;
    debug!(%request_id, %strategy, salvage = %salvaged.strategy, "structured data recovered");

    let solution = solution::normalize(salvaged.value)?;

    info!(
        %request_id,
        %strategy,
        title = %solution.title,
        nodes = diagram::count_nodes(&solution.diagram),
        "solution normalized"
    );

    Ok(solution)
}

/// Await a pipeline task and tag any failure with its strategy.
async fn settle(
    handle: JoinHandle<Result<WorkflowSolution>>,
    strategy: SolutionStrategy,
) -> Result<WorkflowSolution> {
    let source = match handle.await {
        Ok(Ok(solution)) => return Ok(solution),
        Ok(Err(e)) => e,
        Err(join_error) => WorkflowError::Internal(format!("pipeline task failed: {join_error}")),
    };

    Err(WorkflowError::PairGenerationFailure {
        strategy,
        source: Box::new(source),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
