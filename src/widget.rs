//! Widget bundle rendering.
//!
//! The widget is a prebuilt JS/CSS bundle in `[widget].dist_dir`. Hosts load
//! it inside a sandboxed iframe that cannot fetch external scripts, so the
//! page is served as a single HTML document with both files inlined. The
//! same document backs `GET /widget` and the MCP resource
//! [`WIDGET_URI`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// MCP resource URI of the widget template.
pub const WIDGET_URI: &str = "ui://widget/odcaf.html";

/// MIME type hosts expect for widget templates.
pub const WIDGET_MIME: &str = "text/html+skybridge";

pub const JS_FILE: &str = "app.js";
pub const CSS_FILE: &str = "app.css";

/// Paths of the two bundle files under `dist_dir`.
pub fn bundle_paths(dist_dir: &Path) -> (PathBuf, PathBuf) {
    (dist_dir.join(JS_FILE), dist_dir.join(CSS_FILE))
}

/// Build the self-contained widget document from `dist_dir`.
pub async fn render_widget_html(dist_dir: &Path) -> Result<String> {
    let (js_path, css_path) = bundle_paths(dist_dir);

    let js = tokio::fs::read_to_string(&js_path)
        .await
        .with_context(|| format!("Widget bundle not found: {}", js_path.display()))?;
    let css = tokio::fs::read_to_string(&css_path)
        .await
        .with_context(|| format!("Widget stylesheet not found: {}", css_path.display()))?;

    tracing::debug!(js_bytes = js.len(), css_bytes = css.len(), "loaded widget bundle");

    Ok(inline_document(&js, &css))
}

fn inline_document(js: &str, css: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>ODCAF Cultural Facilities</title>
	<style>{css}</style>
</head>
<body>
	<div id="root"></div>
	<script type="module">{js}</script>
</body>
</html>"#
    )
}

/// Plain-text body for a missing bundle.
pub fn missing_bundle_message(dist_dir: &Path) -> String {
    let (js_path, css_path) = bundle_paths(dist_dir);
    format!(
        "Widget not built. Place the widget bundle in {}.\n\nExpected files:\n- {}\n- {}",
        dist_dir.display(),
        js_path.display(),
        css_path.display()
    )
}
