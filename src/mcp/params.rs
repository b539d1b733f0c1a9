//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct EnhanceContentParams {
    #[schemars(description = "Content kind: adventure, npc, monster, puzzle, encounter or other")]
    pub kind: Option<String>,
    #[schemars(description = "Title of the content")]
    pub title: String,
    #[schemars(description = "Markdown body to enhance")]
    pub body: String,
    #[schemars(description = "The prompt the content was generated from (must not be blank)")]
    pub prompt: String,
    #[schemars(description = "Rules system, e.g. '5e'")]
    pub game_system: Option<String>,
    pub party_level: Option<u8>,
    pub party_size: Option<u8>,
    #[schemars(description = "Performance mode preset: speed, balanced or quality")]
    pub mode: Option<String>,
    #[schemars(description = "Explicit stage names to run; overrides the mode preset")]
    pub stages: Option<Vec<String>>,
    #[schemars(description = "Fail the run if any stage fails")]
    pub strict: Option<bool>,
    #[schemars(description = "Per-stage timeout in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[schemars(description = "Session id to file the report under (generated if omitted)")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionIdParams {
    #[schemars(description = "Session id returned by enhance_content")]
    pub session_id: String,
}
