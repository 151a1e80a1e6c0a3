//! Prompt construction for solution generation.
//!
//! Each strategy gets its own system instruction; both share the diagram
//! micro-language rules and the JSON-only output rules.  The response schema
//! is written in the Gemini `responseSchema` dialect.

use serde_json::{Value, json};

use crate::solution::SolutionStrategy;

const AI_CENTRIC_INSTRUCTION: &str = "This solution MUST leverage UiPath AI services (like AI Center, Document Understanding, Computer Vision, etc.) where appropriate.";

const TRADITIONAL_INSTRUCTION: &str = "This solution MUST AVOID AI services and use traditional, rule-based automation techniques (e.g., string manipulation, selectors, data scraping, Find Image, OCR).";

const DIAGRAM_RULES: &str = r#"**Diagram as Indented Text (CRITICAL):**
- The 'diagram' field in the final JSON output MUST be a STRING.
- This string must contain the workflow diagram represented as simple indented text.
- Use two spaces for each level of indentation.
- Each line should follow the format: `ActivityType: Display Name`
- For container activities like 'If', use special keywords on their own indented lines to denote branches: `then:`, `else:`.
- For loops like 'For Each', use the keyword `body:` on its own indented line.

**Example Diagram Format:**
```
Sequence: Main Sequence
  Assign: Get User Credentials
  If: Credentials Found
    then:
      Log Message: Login Successful
    else:
      Throw: Credentials Invalid Exception
  For Each: Data Row in DataTable
    body:
      Type Into: Enter Row Data
```
This text format is simple and less error-prone. Adhere to it strictly."#;

const DIFFICULT_REQUEST_GUIDANCE: &str = r#"**Crucial Guidance for difficult requests:**
- For the 'traditional' solution: If the user asks for a non-AI solution to a problem that is typically best solved with AI (like verifying handwriting, unstructured images, or complex PDFs), you MUST still provide a viable traditional workflow.
- Propose the best possible non-AI alternative using official packages. This might involve techniques like using OCR activities on specific screen regions to check for the presence of *any* text, or using 'Find Image' activities to locate anchors.
- You should acknowledge the potential brittleness or limitations of these non-AI methods in the 'summary' field of your response."#;

const OUTPUT_RULES: &str = r#"**Final Output Rules (ABSOLUTE):**
- Your ENTIRE response MUST be ONLY the JSON object itself.
- DO NOT include markdown fences (```json), explanations, introductions, or any text outside of the primary JSON structure.
- The output must be directly parsable by a standard JSON parser."#;

/// The technique restriction injected for `strategy`.
pub fn strategy_instruction(strategy: SolutionStrategy) -> &'static str {
    match strategy {
        SolutionStrategy::AiCentric => AI_CENTRIC_INSTRUCTION,
        SolutionStrategy::Traditional => TRADITIONAL_INSTRUCTION,
    }
}

/// Build the system instruction for one strategy.
pub fn system_instruction(strategy: SolutionStrategy) -> String {
    format!(
        "You are an expert UiPath RPA architect with deep knowledge of all official UiPath products, services, and best practices. \
Your knowledge is strictly based on official UiPath documentation and officially supported sources.\n\
Your task is to analyze a user's process description and design the optimal RPA workflow based on a specific approach.\n\
{instruction}\n\n{DIAGRAM_RULES}\n\n{DIFFICULT_REQUEST_GUIDANCE}\n\n{OUTPUT_RULES}\n",
        instruction = strategy_instruction(strategy),
    )
}

/// Build the user turn carrying the process description.
pub fn user_prompt(description: &str, allow_marketplace: bool) -> String {
    let preference = if allow_marketplace {
        "Allow Marketplace Packages"
    } else {
        "Official Packages Only"
    };

    format!(
        "Process Description: \"{description}\"\n\n\
Package Preference: {preference}\n\n\
Generate the specified workflow solution now.\n"
    )
}

/// JSON schema of a solution as the model must emit it.  `diagram` is a
/// string here; it is parsed after salvage.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "diagram": {
                "type": "STRING",
                "description": "The workflow diagram as indented text: two spaces per level, one `ActivityType: Display Name` per line, and `then:`, `else:`, `body:` on their own lines to open branches."
            },
            "components": {
                "type": "ARRAY",
                "description": "List of UiPath activities required.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "package": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["name", "package", "description"]
                }
            },
            "variables": {
                "type": "ARRAY",
                "description": "List of variables needed.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "type": { "type": "STRING" },
                        "scope": { "type": "STRING" },
                        "defaultValue": {
                            "type": "STRING",
                            "nullable": true,
                            "description": "Optional default value."
                        }
                    },
                    "required": ["name", "type", "scope"]
                }
            },
            "arguments": {
                "type": "ARRAY",
                "description": "List of in/out/in-out arguments.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "direction": {
                            "type": "STRING",
                            "enum": ["In", "Out", "InOut"]
                        },
                        "type": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["name", "direction", "type", "description"]
                }
            }
        },
        "required": ["title", "summary", "diagram", "components", "variables", "arguments"]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
