//! Warning collection for the silent-degrade paths.
//!
//! Resolution and layout never fail on bad input: a missing end marker, an
//! unknown element type or an undecodable image simply produce less output.
//! Each of those sites logs through `log::warn!` and records a
//! [`Diagnostic`] here, so callers can inspect what was dropped or opt into
//! strict mode.

use std::fmt;

/// Which part of the pipeline raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Template,
    Page,
    Font,
    Layout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Template => "template",
            Stage::Page => "page",
            Stage::Font => "font",
            Stage::Layout => "layout",
        };
        f.write_str(name)
    }
}

/// A single degraded-input warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// An append-only list of diagnostics gathered during one build.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and mirror it to the log.
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(stage, message);
        log::warn!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Move every diagnostic from `other` into `self`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_records_stage_and_message() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Stage::Layout, "grid has 0 columns");
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.stage, Stage::Layout);
        assert_eq!(first.to_string(), "[layout] grid has 0 columns");
    }

    #[test]
    fn extend_keeps_order() {
        let mut a = Diagnostics::new();
        a.warn(Stage::Template, "first");
        let mut b = Diagnostics::new();
        b.warn(Stage::Page, "second");
        a.extend(b);
        let messages: Vec<_> = a.into_vec().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
