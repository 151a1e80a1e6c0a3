//! Workflow generation core for Flowsmith.
//!
//! Turns a process description into two RPA workflow designs by asking a
//! generative model for each and recovering a typed tree from whatever it
//! answers.
//!
//! ```text
//! model text ──> salvage ──> JSON ──> normalize ──> WorkflowSolution
//!                                        │
//!                                  diagram::parse
//! ```
//!
//! ## Modules
//!
//! - [`salvage`] -- Multi-strategy JSON recovery from free-form text.
//! - [`diagram`] -- Indented diagram micro-language: parser, serializer, tree.
//! - [`solution`] -- Solution types and normalization of salvaged JSON.
//! - [`prompt`] -- System/user prompts and the response schema.
//! - [`generator`] -- Concurrent dual-solution orchestration.
//! - [`error`] -- Workflow error types.

pub mod diagram;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod salvage;
pub mod solution;

// Re-export the most commonly used types at the crate root.
pub use diagram::{BranchSlot, DiagramBuilder, DiagramNode, to_indented_text};
pub use error::{MALFORMED_USER_MESSAGE, Result, WorkflowError};
pub use generator::{GeneratorConfig, SolutionGenerator};
pub use salvage::{SalvageStrategy, Salvaged, extract};
pub use solution::{
    ArgumentDetail, ArgumentDirection, ComponentDetail, SolutionPair, SolutionStrategy,
    VariableDetail, WorkflowSolution, normalize,
};
