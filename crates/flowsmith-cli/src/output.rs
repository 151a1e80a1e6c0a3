//! Rendering of generated solutions for the terminal.

use std::fmt::{self, Write};

use clap::ValueEnum;
use flowsmith_workflow::{SolutionPair, SolutionStrategy, WorkflowSolution, diagram};

/// How `generate` prints its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON with `aiSolution` and `traditionalSolution`.
    #[default]
    Json,
    /// Human-readable report.
    Text,
}

fn heading(strategy: SolutionStrategy) -> &'static str {
    match strategy {
        SolutionStrategy::AiCentric => "AI-centric solution",
        SolutionStrategy::Traditional => "Traditional solution",
    }
}

/// Render both solutions as a text report, AI-centric first.
pub fn render_pair(pair: &SolutionPair) -> Result<String, fmt::Error> {
    let mut out = String::with_capacity(2048);
    for (index, (strategy, solution)) in pair.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        write_solution(&mut out, heading(strategy), solution)?;
    }
    Ok(out)
}

/// Render one solution under `heading`.
pub fn render_solution(heading: &str, solution: &WorkflowSolution) -> Result<String, fmt::Error> {
    let mut out = String::with_capacity(1024);
    write_solution(&mut out, heading, solution)?;
    Ok(out)
}

fn write_solution(out: &mut impl Write, heading: &str, solution: &WorkflowSolution) -> fmt::Result {
    writeln!(out, "== {heading} ==")?;
    writeln!(out, "Title:   {}", solution.title)?;
    writeln!(out, "Summary: {}", solution.summary)?;
    writeln!(out)?;

    writeln!(
        out,
        "Diagram ({} nodes, depth {}):",
        diagram::count_nodes(&solution.diagram),
        diagram::max_depth(&solution.diagram)
    )?;
    if solution.diagram.is_empty() {
        writeln!(out, "  (none)")?;
    } else {
        for line in diagram::to_indented_text(&solution.diagram).lines() {
            writeln!(out, "  {line}")?;
        }
    }

    let components = solution
        .components
        .iter()
        .map(|c| format!("{} ({}): {}", c.name, c.package, c.description));
    write_section(out, "Components", components)?;

    let variables = solution.variables.iter().map(|v| match &v.default_value {
        Some(default) => format!("{}: {} [{}] = {default}", v.name, v.var_type, v.scope),
        None => format!("{}: {} [{}]", v.name, v.var_type, v.scope),
    });
    write_section(out, "Variables", variables)?;

    let arguments = solution
        .arguments
        .iter()
        .map(|a| format!("{} {}: {}  {}", a.direction, a.name, a.arg_type, a.description));
    write_section(out, "Arguments", arguments)
}

fn write_section(
    out: &mut impl Write,
    title: &str,
    items: impl Iterator<Item = String>,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{title}:")?;
    let mut empty = true;
    for item in items {
        empty = false;
        writeln!(out, "  - {item}")?;
    }
    if empty {
        writeln!(out, "  (none)")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
