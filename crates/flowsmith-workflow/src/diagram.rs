//! Indented workflow diagrams.
//!
//! Models describe a workflow as indented text rather than nested JSON:
//!
//! ```text
//! Sequence: Main Sequence
//!   Assign: Get User Credentials
//!   If: Credentials Found
//!     then:
//!       Log Message: Login Successful
//!     else:
//!       Throw: Credentials Invalid Exception
//!   For Each: Data Row in DataTable
//!     body:
//!       Type Into: Enter Row Data
//! ```
//!
//! Each line is `Type: Name`.  Deeper indentation nests a node under the
//! nearest shallower one.  The reserved lines `then:`, `else:` and `body:`
//! produce no node; they route the *next* node into that branch slot of its
//! parent.  After every node the routing falls back to `children`.
//!
//! [`parse`] is total: odd indentation degrades into a flatter tree, never an
//! error.  [`to_indented_text`] writes a forest back out in a form that
//! [`parse`] reads into an equal forest.

use serde::{Deserialize, Serialize};

/// Node type used when a line has nothing before its first colon.
pub const UNKNOWN_KIND: &str = "Unknown";

/// Indentation written per depth level by [`to_indented_text`].
const INDENT: &str = "  ";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named attachment point for child nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSlot {
    /// Default sequential nesting.
    #[default]
    Children,
    /// Branch taken when a condition holds.
    Then,
    /// Branch taken when a condition fails.
    Else,
    /// Loop body.
    Body,
}

impl BranchSlot {
    /// All slots in serialization order.
    pub const ALL: [Self; 4] = [Self::Children, Self::Then, Self::Else, Self::Body];

    /// Field name of this slot on [`DiagramNode`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Children => "children",
            Self::Then => "then",
            Self::Else => "else",
            Self::Body => "body",
        }
    }

    /// The reserved line that selects this slot.  `children` has none.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Children => None,
            Self::Then => Some("then:"),
            Self::Else => Some("else:"),
            Self::Body => Some("body:"),
        }
    }

    /// Recognise a reserved branch line.  `content` must already be trimmed.
    pub fn from_keyword(content: &str) -> Option<Self> {
        [Self::Then, Self::Else, Self::Body].into_iter().find(|slot| {
            slot.keyword()
                .is_some_and(|keyword| content.eq_ignore_ascii_case(keyword))
        })
    }
}

impl std::fmt::Display for BranchSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step or container in a workflow diagram.
///
/// Branch slots are sparse: a slot stays `None` until its first child is
/// attached.  `None` and `Some(vec![])` both mean "no content".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramNode {
    /// Activity category (e.g. `"If"`, `"Assign"`), kept verbatim.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DiagramNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Vec<DiagramNode>>,

    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<Vec<DiagramNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<DiagramNode>>,
}

impl DiagramNode {
    /// A node with no description and no branches.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Nodes in `slot`; empty when the slot is unset.
    pub fn slot(&self, slot: BranchSlot) -> &[DiagramNode] {
        let nodes = match slot {
            BranchSlot::Children => &self.children,
            BranchSlot::Then => &self.then,
            BranchSlot::Else => &self.else_branch,
            BranchSlot::Body => &self.body,
        };
        nodes.as_deref().unwrap_or_default()
    }

    fn slot_mut(&mut self, slot: BranchSlot) -> &mut Option<Vec<DiagramNode>> {
        match slot {
            BranchSlot::Children => &mut self.children,
            BranchSlot::Then => &mut self.then,
            BranchSlot::Else => &mut self.else_branch,
            BranchSlot::Body => &mut self.body,
        }
    }

    /// Append `child` to `slot`, creating the slot on first use.
    pub fn attach(&mut self, slot: BranchSlot, child: DiagramNode) {
        self.slot_mut(slot).get_or_insert_with(Vec::new).push(child);
    }

    /// Builder-style [`attach`](Self::attach).
    pub fn with(mut self, slot: BranchSlot, child: DiagramNode) -> Self {
        self.attach(slot, child);
        self
    }

    /// Non-empty slots in [`BranchSlot::ALL`] order.
    pub fn branches(&self) -> impl Iterator<Item = (BranchSlot, &[DiagramNode])> {
        BranchSlot::ALL
            .into_iter()
            .map(|slot| (slot, self.slot(slot)))
            .filter(|(_, nodes)| !nodes.is_empty())
    }

    /// Whether the node has no content in any slot.
    pub fn is_leaf(&self) -> bool {
        self.branches().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// A node whose subtree may still grow, with the slot it will occupy on its
/// parent.
#[derive(Debug)]
struct OpenNode {
    node: DiagramNode,
    indent: usize,
    slot: BranchSlot,
}

/// Line-at-a-time diagram parser.
///
/// Holds the chain of open ancestors (shallowest first) and the pending
/// branch slot.  A node is attached to its parent when it is closed, i.e.
/// when a line at the same or shallower indentation arrives or the input
/// ends; closing happens in input order, so sibling order is preserved.
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    roots: Vec<DiagramNode>,
    open: Vec<OpenNode>,
    pending: BranchSlot,
}

impl DiagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot the next node will be attached into.
    pub fn pending_slot(&self) -> BranchSlot {
        self.pending
    }

    /// Number of currently open ancestors.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Feed one line of diagram text.
    pub fn push_line(&mut self, line: &str) {
        let content = line.trim();
        if content.is_empty() {
            return;
        }

        // Keyword lines only steer the next node; their indentation is
        // irrelevant.
        if let Some(slot) = BranchSlot::from_keyword(content) {
            self.pending = slot;
            return;
        }

        let indent = indentation(line);
        self.close_to(indent);

        self.open.push(OpenNode {
            node: node_from_content(content),
            indent,
            slot: std::mem::take(&mut self.pending),
        });
    }

    /// Close every open node and return the forest.
    pub fn finish(mut self) -> Vec<DiagramNode> {
        self.close_to(0);
        self.roots
    }

    /// Close open nodes indented at least `indent`, deepest first.
    fn close_to(&mut self, indent: usize) {
        while self.open.last().is_some_and(|top| top.indent >= indent) {
            let Some(closed) = self.open.pop() else {
                break;
            };
            match self.open.last_mut() {
                Some(parent) => parent.node.attach(closed.slot, closed.node),
                None => self.roots.push(closed.node),
            }
        }
    }
}

/// Parse indented diagram text into a forest.
pub fn parse(text: &str) -> Vec<DiagramNode> {
    text.lines()
        .fold(DiagramBuilder::new(), |mut builder, line| {
            builder.push_line(line);
            builder
        })
        .finish()
}

/// Count of leading whitespace characters.
fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Split trimmed line content at its first colon into type and name.
fn node_from_content(content: &str) -> DiagramNode {
    let (kind, name) = content.split_once(':').unwrap_or((content, ""));
    let kind = kind.trim();
    let kind = if kind.is_empty() { UNKNOWN_KIND } else { kind };
    DiagramNode::new(kind, name.trim())
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// Write a forest in the indented micro-language.
///
/// Every member of a branch slot is written one level below its parent.
/// Because the pending slot falls back to `children` after each node, members
/// of `then`, `else` and `body` are each preceded by their own keyword line.
pub fn to_indented_text(forest: &[DiagramNode]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, forest, 0, BranchSlot::Children);
    out
}

fn write_nodes(out: &mut String, nodes: &[DiagramNode], depth: usize, slot: BranchSlot) {
    for node in nodes {
        if let Some(keyword) = slot.keyword() {
            write_line(out, depth, keyword);
        }

        write_line(out, depth, &node_line(node));

        for (child_slot, children) in node.branches() {
            write_nodes(out, children, depth + 1, child_slot);
        }
    }
}

/// `type: name`, or `type:` for an unnamed node.  An unnamed node whose type
/// spells a branch keyword gets a space before the colon so it is read back
/// as a node.
fn node_line(node: &DiagramNode) -> String {
    if !node.name.is_empty() {
        return format!("{}: {}", node.kind, node.name);
    }
    let line = format!("{}:", node.kind);
    if BranchSlot::from_keyword(&line).is_some() {
        format!("{} :", node.kind)
    } else {
        line
    }
}

fn write_line(out: &mut String, depth: usize, content: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(content);
    out.push('\n');
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Total number of nodes in the forest, across all slots.
pub fn count_nodes(forest: &[DiagramNode]) -> usize {
    forest
        .iter()
        .map(|node| {
            1 + node
                .branches()
                .map(|(_, children)| count_nodes(children))
                .sum::<usize>()
        })
        .sum()
}

/// Number of levels in the forest; 0 for an empty forest.
pub fn max_depth(forest: &[DiagramNode]) -> usize {
    forest
        .iter()
        .map(|node| {
            1 + node
                .branches()
                .map(|(_, children)| max_depth(children))
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
