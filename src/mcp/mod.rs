//! MCP server for lorecraft: exposes the enhancement pipeline, stage
//! listing and adapter health via the Model Context Protocol.
//!
//! Tools: enhance_content, list_stages, adapter_health, get_report.

pub mod params;
mod reports;

pub use reports::{ReportCache, DEFAULT_REPORT_CAPACITY};

use crate::adapter::{
    AdapterRegistry, ContentItem, ContentKind, EnhancementInput, GenerationContext, StageId,
    UnknownStage,
};
use crate::backend::HeuristicBackend;
use crate::config::{
    ConfigStore, EnhancementConfig, FallbackBehavior, OpenStore, PerformanceMode,
    SqliteConfigStore,
};
use crate::pipeline::{EnhancementPipeline, PipelineError};
use params::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ok_text(text),
        Err(e) => err_text(format!("failed to encode result: {}", e)),
    }
}

/// Apply per-call overrides to the server's base configuration.
fn resolve_config(
    base: &EnhancementConfig,
    p: &EnhanceContentParams,
) -> Result<EnhancementConfig, String> {
    let mut config = match p.mode.as_deref() {
        Some(mode) => {
            let mode: PerformanceMode = mode.parse()?;
            base.clone().with_mode(mode)
        }
        None => base.clone(),
    };
    if let Some(stages) = &p.stages {
        let mut explicit = EnhancementConfig::none();
        for name in stages {
            let stage: StageId = name.parse().map_err(|e: UnknownStage| e.to_string())?;
            explicit = explicit.with_stage(stage, true);
        }
        config.stages = explicit.stages;
    }
    if let Some(strict) = p.strict {
        config.fallback_behavior = if strict {
            FallbackBehavior::Strict
        } else {
            FallbackBehavior::Graceful
        };
    }
    if let Some(timeout_ms) = p.timeout_ms {
        config.stage_timeout_ms = timeout_ms;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn build_input(p: &EnhanceContentParams) -> Result<EnhancementInput, String> {
    if p.prompt.trim().is_empty() {
        return Err("prompt must not be blank".to_string());
    }
    let kind: ContentKind = match p.kind.as_deref() {
        Some(kind) => kind.parse()?,
        None => ContentKind::Other,
    };
    let mut context = GenerationContext::new(p.prompt.clone());
    context.game_system = p.game_system.clone();
    context.party_level = p.party_level;
    context.party_size = p.party_size;
    Ok(EnhancementInput::new(
        ContentItem::new(kind, p.title.clone(), p.body.clone()),
        context,
    ))
}

#[derive(Serialize)]
struct StageListing {
    name: StageId,
    label: &'static str,
    base_impact: f64,
    registered: bool,
    available: bool,
}

// ---------------------------------------------------------------------------
// LorecraftMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct LorecraftMcpServer {
    pipeline: Arc<EnhancementPipeline>,
    base_config: EnhancementConfig,
    /// Finished runs of this server, by session id
    reports: Arc<ReportCache>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl LorecraftMcpServer {
    pub fn new(pipeline: Arc<EnhancementPipeline>, base_config: EnhancementConfig) -> Self {
        Self {
            pipeline,
            base_config,
            reports: Arc::new(ReportCache::default()),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Run the enhancement pipeline over a piece of generated content and return the scored enhancement")]
    async fn enhance_content(
        &self,
        Parameters(p): Parameters<EnhanceContentParams>,
    ) -> Result<CallToolResult, McpError> {
        let config = match resolve_config(&self.base_config, &p) {
            Ok(config) => config,
            Err(e) => return err_text(e),
        };
        let input = match build_input(&p) {
            Ok(input) => input,
            Err(e) => return err_text(e),
        };

        match self.pipeline.run(input, &config, p.session_id.clone()).await {
            Ok(enhancement) => {
                let response = ok_json(&enhancement);
                self.reports.insert(enhancement);
                response
            }
            Err(PipelineError::PartialFailure { report }) => {
                let report_json = serde_json::to_string_pretty(&report).unwrap_or_default();
                err_text(format!(
                    "strict mode: stages {:?} failed\n{}",
                    report.failed_stages(),
                    report_json
                ))
            }
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "List pipeline stages with their base impact, registration and availability")]
    async fn list_stages(&self) -> Result<CallToolResult, McpError> {
        let registry = self.pipeline.registry();
        let available = registry.list_available().await;
        let listing: Vec<StageListing> = self
            .pipeline
            .definition()
            .stages
            .iter()
            .map(|stage| StageListing {
                name: *stage,
                label: stage.label(),
                base_impact: stage.base_impact(),
                registered: registry.contains(*stage),
                available: available.contains(stage),
            })
            .collect();
        ok_json(&listing)
    }

    #[tool(description = "Health status and execution metrics for every registered adapter")]
    fn adapter_health(&self) -> Result<CallToolResult, McpError> {
        let registry = self.pipeline.registry();
        ok_json(&serde_json::json!({
            "health": registry.health_snapshot(),
            "metrics": registry.metrics_snapshot(),
        }))
    }

    #[tool(description = "Get the processing report and quality breakdown of an earlier enhance_content run")]
    fn get_report(
        &self,
        Parameters(p): Parameters<SessionIdParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.reports.get(&p.session_id) {
            Some(enhancement) => ok_json(&serde_json::json!({
                "session_id": enhancement.session_id,
                "grade": enhancement.grade,
                "quality_metrics": enhancement.quality_metrics,
                "breakdown": enhancement.breakdown,
                "report": enhancement.report,
            })),
            None => err_text(format!("no report for session {}", p.session_id)),
        }
    }
}

#[tool_handler]
impl ServerHandler for LorecraftMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "lorecraft MCP server: enhance generated tabletop-RPG content and score its quality"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(db_path: PathBuf, user: Option<String>) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let store = match SqliteConfigStore::open(&db_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to open database at {}: {}", db_path.display(), e);
                return 1;
            }
        };
        let config = match store.load(user.as_deref()) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                eprintln!("failed to load configuration: {}", e);
                return 1;
            }
        };

        let registry = AdapterRegistry::with_builtin_adapters(Arc::new(HeuristicBackend::new()));
        let summary = registry.initialize_all().await;
        if !summary.is_acceptable() {
            eprintln!(
                "warning: only {} of {} adapters initialized",
                summary.succeeded, summary.total
            );
        }
        let pipeline = Arc::new(EnhancementPipeline::new(Arc::new(registry)));
        let server = LorecraftMcpServer::new(pipeline, config);

        tracing::info!("lorecraft mcp server starting on stdio");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to start MCP server: {}", e);
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            eprintln!("MCP server error: {}", e);
            return 1;
        }

        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EnhanceContentParams {
        EnhanceContentParams {
            kind: Some("adventure".into()),
            title: "The Drowned Chapel".into(),
            body: concat!(
                "# The Drowned Chapel\n\n> Water laps at the pews.\n\n",
                "**Sister Maren** is the last priest here and needs help."
            )
            .into(),
            prompt: "a drowned chapel".into(),
            ..Default::default()
        }
    }

    fn server() -> LorecraftMcpServer {
        let registry = AdapterRegistry::with_builtin_adapters(Arc::new(HeuristicBackend::new()));
        LorecraftMcpServer::new(
            Arc::new(EnhancementPipeline::new(Arc::new(registry))),
            EnhancementConfig::default(),
        )
    }

    #[test]
    fn mode_override_keeps_base_fallback() {
        let base = EnhancementConfig::default().with_fallback(FallbackBehavior::Strict);
        let p = EnhanceContentParams {
            mode: Some("speed".into()),
            ..params()
        };
        let config = resolve_config(&base, &p).unwrap();
        assert_eq!(config.enabled_stages().unwrap().len(), 3);
        assert!(config.is_strict());
    }

    #[test]
    fn mode_override_keeps_global_switch_off() {
        let base = EnhancementConfig {
            enabled: false,
            ..EnhancementConfig::default()
        };
        let p = EnhanceContentParams {
            mode: Some("quality".into()),
            ..params()
        };
        let config = resolve_config(&base, &p).unwrap();
        assert!(!config.enabled);
        assert!(config.enabled_stages().unwrap().is_empty());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        for prompt in ["", "   \n"] {
            let p = EnhanceContentParams {
                prompt: prompt.into(),
                ..params()
            };
            assert!(build_input(&p).is_err());
        }
        assert!(build_input(&params()).is_ok());
    }

    #[test]
    fn explicit_stage_list_wins() {
        let p = EnhanceContentParams {
            mode: Some("quality".into()),
            stages: Some(vec!["accessibility".into()]),
            strict: Some(false),
            timeout_ms: Some(500),
            ..params()
        };
        let config = resolve_config(&EnhancementConfig::default(), &p).unwrap();
        assert_eq!(
            config.enabled_stages().unwrap().into_iter().collect::<Vec<_>>(),
            vec![StageId::Accessibility]
        );
        assert_eq!(config.stage_timeout_ms, 500);
    }

    #[test]
    fn bad_overrides_are_reported() {
        let base = EnhancementConfig::default();
        let unknown_stage = EnhanceContentParams {
            stages: Some(vec!["dragon-taming".into()]),
            ..params()
        };
        assert!(resolve_config(&base, &unknown_stage).is_err());

        let bad_mode = EnhanceContentParams {
            mode: Some("turbo".into()),
            ..params()
        };
        assert!(resolve_config(&base, &bad_mode).is_err());

        let bad_kind = EnhanceContentParams {
            kind: Some("spaceship".into()),
            ..params()
        };
        assert!(build_input(&bad_kind).is_err());
    }

    #[tokio::test]
    async fn enhance_files_report_under_session() {
        let server = server();
        let p = EnhanceContentParams {
            session_id: Some("session-42".into()),
            ..params()
        };
        server.enhance_content(Parameters(p)).await.unwrap();

        let stored = server.reports.get("session-42").unwrap();
        assert_eq!(stored.report.total_steps, 8);
        assert_eq!(stored.original_content.title, "The Drowned Chapel");
        assert!(stored
            .report
            .result(StageId::PromptAnalysis)
            .unwrap()
            .is_completed());
    }

    #[tokio::test]
    async fn blank_prompt_run_is_refused_and_not_filed() {
        let server = server();
        let p = EnhanceContentParams {
            prompt: String::new(),
            session_id: Some("session-blank".into()),
            ..params()
        };
        let result = server.enhance_content(Parameters(p)).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert!(server.reports.is_empty());
        let metrics = server.pipeline.registry().metrics_snapshot();
        assert_eq!(metrics[&StageId::PromptAnalysis].total_executions, 0);
    }
}
