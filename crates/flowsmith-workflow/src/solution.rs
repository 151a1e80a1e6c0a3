//! Workflow solution types and normalization.
//!
//! A model answer is salvaged into loosely-typed JSON first.  [`normalize`]
//! then swaps the `diagram` string for a parsed [`DiagramNode`] forest and
//! reads the result into a [`WorkflowSolution`], rejecting answers that lack
//! any other required field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::diagram::{self, DiagramNode};
use crate::error::{Result, WorkflowError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which family of techniques a solution is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolutionStrategy {
    /// Leans on AI services (document understanding, computer vision, ...).
    AiCentric,
    /// Rule-based automation only.
    Traditional,
}

impl SolutionStrategy {
    /// Both strategies, in the order pairs are reported.
    pub const BOTH: [Self; 2] = [Self::AiCentric, Self::Traditional];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiCentric => "ai-centric",
            Self::Traditional => "traditional",
        }
    }
}

impl std::fmt::Display for SolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An activity package the workflow needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDetail {
    pub name: String,
    pub package: String,
    pub description: String,
}

/// A workflow variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub scope: String,
    #[serde(
        rename = "defaultValue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<String>,
}

/// Data flow direction of a workflow argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgumentDirection {
    #[serde(alias = "in", alias = "IN")]
    In,
    #[serde(alias = "out", alias = "OUT")]
    Out,
    #[serde(alias = "inout", alias = "In/Out", alias = "INOUT")]
    InOut,
}

impl std::fmt::Display for ArgumentDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::In => "In",
            Self::Out => "Out",
            Self::InOut => "InOut",
        })
    }
}

/// A workflow argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDetail {
    pub name: String,
    pub direction: ArgumentDirection,
    #[serde(rename = "type")]
    pub arg_type: String,
    pub description: String,
}

/// One generated workflow design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSolution {
    pub title: String,
    pub summary: String,
    pub diagram: Vec<DiagramNode>,
    pub components: Vec<ComponentDetail>,
    pub variables: Vec<VariableDetail>,
    pub arguments: Vec<ArgumentDetail>,
}

/// The AI-centric and traditional designs for one process description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionPair {
    #[serde(rename = "aiSolution")]
    pub ai_centric: WorkflowSolution,
    #[serde(rename = "traditionalSolution")]
    pub traditional: WorkflowSolution,
}

impl SolutionPair {
    /// The solution produced under `strategy`.
    pub fn get(&self, strategy: SolutionStrategy) -> &WorkflowSolution {
        match strategy {
            SolutionStrategy::AiCentric => &self.ai_centric,
            SolutionStrategy::Traditional => &self.traditional,
        }
    }

    /// Both solutions tagged by strategy, AI-centric first.
    pub fn iter(&self) -> impl Iterator<Item = (SolutionStrategy, &WorkflowSolution)> {
        SolutionStrategy::BOTH
            .into_iter()
            .map(|strategy| (strategy, self.get(strategy)))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn a salvaged JSON value into a [`WorkflowSolution`].
///
/// A non-blank string `diagram` is parsed into a forest; an absent, blank,
/// or non-string `diagram` becomes an empty forest.  Every other field is
/// required.
pub fn normalize(raw: Value) -> Result<WorkflowSolution> {
    let mut fields = match raw {
        Value::Object(fields) => fields,
        other => {
            return Err(WorkflowError::IncompleteSolution {
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            });
        }
    };

    let forest = match fields.remove("diagram") {
        Some(Value::String(text)) if !text.trim().is_empty() => diagram::parse(&text),
        _ => Vec::new(),
    };

    debug!(
        nodes = diagram::count_nodes(&forest),
        depth = diagram::max_depth(&forest),
        "diagram normalized"
    );

    // The forest never passes through `Value`: converting a deep tree there
    // and back recurses once per level.
    let rest: SolutionFields = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        WorkflowError::IncompleteSolution {
            reason: e.to_string(),
        }
    })?;

    Ok(WorkflowSolution {
        title: rest.title,
        summary: rest.summary,
        diagram: forest,
        components: rest.components,
        variables: rest.variables,
        arguments: rest.arguments,
    })
}

/// Every required solution field except `diagram`.
#[derive(Deserialize)]
struct SolutionFields {
    title: String,
    summary: String,
    components: Vec<ComponentDetail>,
    variables: Vec<VariableDetail>,
    arguments: Vec<ArgumentDetail>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
