//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to the MCP protocol. The same bridge backs
//! both transports (Streamable HTTP at `/mcp` and the legacy SSE transport
//! in [`crate::sse`]); every session gets a clone sharing the same
//! dataset.
//!
//! * **Tools** are exposed via `list_tools` / `call_tool`. Results carry the
//!   formatter markdown as text content and the tagged
//!   [`ToolOutput`](crate::output::ToolOutput) as structured content.
//! * **Resources** expose the widget template at [`WIDGET_URI`], which tool
//!   descriptors reference through `_meta["openai/outputTemplate"]`.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::traits::{validate_params, ToolContext, ToolRegistry};
use crate::widget::{render_widget_html, WIDGET_MIME, WIDGET_URI};

/// Bridges the tool registry and widget to the MCP JSON-RPC protocol.
#[derive(Clone)]
pub struct McpBridge {
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
    widget_dir: Arc<PathBuf>,
}

impl McpBridge {
    pub fn new(ctx: ToolContext, tools: Arc<ToolRegistry>, widget_dir: PathBuf) -> Self {
        Self {
            ctx,
            tools,
            widget_dir: Arc::new(widget_dir),
        }
    }

    fn to_object(value: serde_json::Value) -> Arc<JsonObject> {
        match value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(JsonObject::new()),
        }
    }

    /// Convert a registry tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let mut meta = JsonObject::new();
        meta.insert(
            "openai/outputTemplate".to_string(),
            serde_json::Value::String(WIDGET_URI.to_string()),
        );

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: Some(tool.title().to_string()),
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema: Self::to_object(tool.parameters_schema()),
            output_schema: tool.output_schema().map(Self::to_object),
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: Some(Meta(meta)),
        }
    }

    fn widget_resource() -> Resource {
        let mut raw = RawResource::new(WIDGET_URI, "odcaf-widget");
        raw.description =
            Some("Interactive view of ODCAF search, filter, and statistics results".to_string());
        raw.mime_type = Some(WIDGET_MIME.to_string());
        raw.no_annotation()
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "odcaf-mcp-server".to_string(),
                title: Some("ODCAF Cultural Facilities".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "Open Database of Cultural and Art Facilities (Statistics Canada)".to_string(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search Canadian cultural and art facilities. Use search for free text, \
                 filter for province/city/type criteria, fetch to get one facility by ID, \
                 and list_types, list_provinces, or stats for an overview of the dataset."
                    .to_string(),
            ),
        }
    }

    // ── Tools ────────────────────────────────────────────────────────────

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let outcome = match validate_params(&tool.parameters_schema(), &params) {
            Ok(validated) => tool.execute(validated, &self.ctx).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => {
                let mut result =
                    CallToolResult::success(vec![Content::text(output.render_markdown())]);
                result.structured_content = Some(output.structured());
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    // ── Resources (widget) ───────────────────────────────────────────────

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult::with_all_items(vec![
            Self::widget_resource(),
        ])))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri != WIDGET_URI {
            return Err(McpError::resource_not_found(
                format!("no resource with uri: {}", request.uri),
                None,
            ));
        }

        let html = render_widget_html(&self.widget_dir).await.map_err(|e| {
            tracing::error!(error = %e, "widget bundle unavailable");
            McpError::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None)
        })?;

        let mut contents = ResourceContents::text(html, WIDGET_URI);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(WIDGET_MIME.to_string());
        }

        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::traits::FilterTool;

    #[test]
    fn test_descriptor_carries_template_and_schemas() {
        let tool = McpBridge::to_mcp_tool(&FilterTool::new(50));
        assert_eq!(tool.name, "filter");
        assert_eq!(tool.title.as_deref(), Some("Filter Cultural Facilities"));
        assert!(tool.input_schema.contains_key("properties"));
        assert!(tool.output_schema.is_some());
        let meta = tool.meta.expect("meta");
        assert_eq!(
            meta.0.get("openai/outputTemplate"),
            Some(&serde_json::json!(WIDGET_URI))
        );
    }

    #[test]
    fn test_widget_resource() {
        let resource = McpBridge::widget_resource();
        assert_eq!(resource.raw.uri, WIDGET_URI);
        assert_eq!(resource.raw.mime_type.as_deref(), Some(WIDGET_MIME));
    }

    #[test]
    fn test_get_tool() {
        let ctx = ToolContext::new(
            Arc::new(odcaf_core::DatasetIndex::default()),
            LimitsConfig::default(),
        );
        let bridge = McpBridge::new(
            ctx,
            Arc::new(ToolRegistry::with_builtins(&LimitsConfig::default())),
            PathBuf::from("web/dist"),
        );
        assert!(bridge.get_tool("stats").is_some());
        assert!(bridge.get_tool("sources").is_none());
        assert!(bridge.get_info().capabilities.resources.is_some());
    }
}
