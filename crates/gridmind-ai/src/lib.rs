//! gridmind-ai - AI instruction service: wire protocol, HTTP client, settings.

mod client;
mod protocol;
mod settings;

pub use client::{AiError, HttpService, InstructionService};
pub use protocol::{
    CellUpdate, InstructionOutcome, SYSTEM_INSTRUCTION, build_prompt, parse_outcome,
};
pub use settings::{AiSettings, api_key_from_env, load_settings, settings_file_path};
