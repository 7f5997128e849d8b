//! Wire protocol for the AI instruction service.
//!
//! The service is vendor-neutral: one JSON POST carrying a model name, a
//! fixed system instruction, and the assembled prompt; one JSON response
//! with `reasoning`, `cellUpdates`, and optional `suggestions`. Anything
//! missing a required field — or not JSON at all — is a parse failure.

use serde::{Deserialize, Serialize};

use crate::client::AiError;

/// Role and response-shape instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "\
You are the calculation assistant behind a spreadsheet. Users interact with \
you through cells: cells starting with '=' are standard formulas, cells \
starting with '?' are natural-language instructions addressed to you. \
Given an instruction and a partial snapshot of the sheet, respond with a \
JSON object containing: reasoning (why you chose this approach), cellUpdates \
(a list of {id, value} updates to apply to the sheet), and suggestions \
(other things the user might want next).";

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_EXPLAIN_MODEL: &str = "gemini-3-flash-preview";

/// One cell the service wants to write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellUpdate {
    pub id: String,
    pub value: String,
}

/// A successfully parsed instruction response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub reasoning: String,
    #[serde(rename = "cellUpdates")]
    pub cell_updates: Vec<CellUpdate>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Response body of the explain endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ExplainResponse {
    pub text: String,
}

/// Request body for both endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct ServiceRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
}

/// Assemble the instruction prompt from the user's text and the sheet
/// context snapshot.
pub fn build_prompt(instruction: &str, context_snippet: &str) -> String {
    format!(
        "User Instruction: {}\nCurrent Sheet State (partial): {}",
        instruction, context_snippet
    )
}

/// Parse a response body into an [`InstructionOutcome`].
pub fn parse_outcome(body: &str) -> Result<InstructionOutcome, AiError> {
    serde_json::from_str(body).map_err(|e| AiError::Parse(e.to_string()))
}
