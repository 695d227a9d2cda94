//! # Folio
//!
//! Data-driven PDF generation from a JSON document descriptor.
//!
//! A descriptor lists page settings, fonts and a flat sequence of elements
//! (text, tables, grids, spacers, rules, images). Before it is parsed it can
//! be filled from a variables object with a small mustache-style syntax:
//! `{{path.to.value}}` substitutes a value and `{{#rows}}...{{/rows}}`
//! repeats a region once per item of a list, joining the copies with commas
//! so that loops can generate JSON arrays.
//!
//! ## Architecture
//!
//! ```text
//! Raw descriptor text + variables
//!       ↓
//!   [template]  Expand loops, substitute variables
//!       ↓
//!   [model]     Parse into a Document of typed elements
//!       ↓
//!   [layout]    Walk elements top to bottom against a cursor
//!       ↓
//!   [backend]   Drawing operations (cells, lines, images, page breaks)
//!       ↓
//!   [pdf]       Serialize to PDF bytes
//! ```
//!
//! Odd input degrades instead of failing: absent variables become empty
//! strings, unknown elements are skipped, missing fonts fall back to
//! Helvetica. Every such fallback is recorded as a
//! [`Diagnostic`](diagnostics::Diagnostic); the `_with` entry points return
//! them, and [`RenderOptions::strict`] turns them into an error.

pub mod backend;
pub mod diagnostics;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod template;

use serde::Deserialize;

use diagnostics::Diagnostics;
use error::FolioError;
use layout::LayoutEngine;
use model::Document;
use pdf::PdfBackend;
use template::{Scope, Value};

pub use diagnostics::{Diagnostic, Stage};

/// Build-wide switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Fail with [`FolioError::Strict`] if anything was dropped or replaced.
    pub strict: bool,
}

/// A finished PDF and everything that degraded on the way.
#[derive(Debug)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
}

/// Render a parsed document to PDF bytes.
pub fn render(document: &Document) -> Result<Vec<u8>, FolioError> {
    render_with(document, &RenderOptions::default()).map(|r| r.bytes)
}

pub fn render_with(document: &Document, options: &RenderOptions) -> Result<Rendered, FolioError> {
    build(document, Diagnostics::new(), options)
}

/// Render a bare descriptor given as JSON. No templating is applied.
pub fn render_json(json: &str) -> Result<Vec<u8>, FolioError> {
    render_json_with(json, &RenderOptions::default()).map(|r| r.bytes)
}

pub fn render_json_with(json: &str, options: &RenderOptions) -> Result<Rendered, FolioError> {
    let document: Document = serde_json::from_str(json)?;
    render_with(&document, options)
}

/// Render either a bare descriptor or a `{"pdf_template": ..., "pdfVars": ...}`
/// envelope. A non-null `pdf_template` is resolved against `pdfVars`
/// before parsing.
pub fn render_input(input: &str) -> Result<Vec<u8>, FolioError> {
    render_input_with(input, &RenderOptions::default()).map(|r| r.bytes)
}

pub fn render_input_with(input: &str, options: &RenderOptions) -> Result<Rendered, FolioError> {
    let envelope: Envelope = serde_json::from_str(input)?;
    match envelope.pdf_template {
        Some(template) if !template.is_null() => {
            log::debug!("input is a template envelope");
            let raw = serde_json::to_string(&template)?;
            let variables = envelope.pdf_vars.unwrap_or(serde_json::Value::Null);
            render_template_with(&raw, &variables, options)
        }
        _ => render_json_with(input, options),
    }
}

/// Resolve raw descriptor text against `variables`, then render it.
pub fn render_template(raw: &str, variables: &serde_json::Value) -> Result<Vec<u8>, FolioError> {
    render_template_with(raw, variables, &RenderOptions::default()).map(|r| r.bytes)
}

pub fn render_template_with(
    raw: &str,
    variables: &serde_json::Value,
    options: &RenderOptions,
) -> Result<Rendered, FolioError> {
    let scope = Scope::root(Value::from(variables.clone()));
    let mut diagnostics = Diagnostics::new();
    let resolved = template::resolve_with_diagnostics(raw, &scope, &mut diagnostics);
    let document: Document = serde_json::from_str(&resolved)?;
    build(&document, diagnostics, options)
}

/// Load a raw descriptor from `path` and render it like [`render_template`].
pub fn render_template_file(
    path: impl AsRef<std::path::Path>,
    variables: &serde_json::Value,
) -> Result<Vec<u8>, FolioError> {
    render_template_file_with(path, variables, &RenderOptions::default()).map(|r| r.bytes)
}

pub fn render_template_file_with(
    path: impl AsRef<std::path::Path>,
    variables: &serde_json::Value,
    options: &RenderOptions,
) -> Result<Rendered, FolioError> {
    let raw = template::load_file(path)?;
    render_template_with(&raw, variables, options)
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    pdf_template: Option<serde_json::Value>,
    #[serde(default, rename = "pdfVars")]
    pdf_vars: Option<serde_json::Value>,
}

fn build(
    document: &Document,
    mut diagnostics: Diagnostics,
    options: &RenderOptions,
) -> Result<Rendered, FolioError> {
    let setup = layout::page_setup(&document.page, &mut diagnostics);
    let rendered = LayoutEngine::new(document, PdfBackend::new(setup))
        .with_diagnostics(diagnostics)
        .build()?;

    if options.strict && !rendered.diagnostics.is_empty() {
        return Err(FolioError::Strict(rendered.diagnostics.into_vec()));
    }
    log::debug!(
        "rendered {} bytes with {} warning(s)",
        rendered.bytes.len(),
        rendered.diagnostics.len()
    );
    Ok(rendered)
}
