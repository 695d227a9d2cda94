//! # Template Resolution
//!
//! Rewrites raw descriptor text before it is parsed. Two passes run in
//! order:
//!
//! 1. **Loop expansion.** `{{#name}} body {{/name}}` repeats `body` once
//!    per element of the sequence bound to `name`, substituting variables
//!    in each copy against a per-item [`Scope`]. Copies are joined with a
//!    comma, so a loop placed inside a JSON array literal (or inside a
//!    string that is later read as one) produces a valid list.
//! 2. **Scalar substitution.** Every remaining `{{ path }}` is replaced by
//!    the escaped text of the value at `path`. Loop markers are left alone.
//!
//! Resolution never fails. Missing variables become empty text, a loop over
//! something that is not a sequence emits nothing, and a start marker with
//! no matching end is dropped. Those last two cases are reported through
//! [`Diagnostics`].

pub mod scan;
pub mod scope;
pub mod value;

use std::io::Read;
use std::path::Path;

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::FolioError;

use self::scan::MarkerKind;
pub use self::scope::Scope;
pub use self::value::{Number, Value};

/// Loop output is expanded again for markers it contains. Values that
/// carry loop markers of their own can keep that going, so nesting stops
/// here and the remaining markers are left as text.
const MAX_LOOP_DEPTH: usize = 32;
/// Expansion stops once the resolved text grows past this size.
const MAX_RESOLVED_BYTES: usize = 64 * 1024 * 1024;

/// Resolve `raw` against `scope`, discarding diagnostics.
pub fn resolve(raw: &str, scope: &Scope<'_>) -> String {
    let mut diagnostics = Diagnostics::new();
    resolve_with_diagnostics(raw, scope, &mut diagnostics)
}

/// Resolve `raw` against `scope`, recording anything that was dropped.
pub fn resolve_with_diagnostics(
    raw: &str,
    scope: &Scope<'_>,
    diagnostics: &mut Diagnostics,
) -> String {
    let expanded = expand_loops(raw, scope, diagnostics);
    substitute(&expanded, scope)
}

/// Read raw descriptor text from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<String, FolioError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| FolioError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read raw descriptor text from any reader, such as stdin.
pub fn load_reader(mut reader: impl Read) -> Result<String, FolioError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| FolioError::Io {
            path: "<input>".to_string(),
            source,
        })?;
    Ok(text)
}

fn expand_loops(raw: &str, scope: &Scope<'_>, diagnostics: &mut Diagnostics) -> String {
    let mut expander = Expander {
        scope,
        diagnostics,
        depth_capped: false,
        exhausted: false,
    };
    let mut out = String::with_capacity(raw.len());
    expander.expand_into(raw, 0, &mut out);
    out
}

/// Single left-to-right pass over the text. Each loop's output is expanded
/// in turn (against the root scope) before scanning continues after the
/// loop's end marker.
struct Expander<'a, 'p> {
    scope: &'a Scope<'p>,
    diagnostics: &'a mut Diagnostics,
    depth_capped: bool,
    exhausted: bool,
}

impl Expander<'_, '_> {
    fn expand_into(&mut self, text: &str, depth: usize, out: &mut String) {
        let mut copied = 0;

        while let Some((start, name)) = scan::next_loop_start(text, copied) {
            if self.exhausted || out.len() > MAX_RESOLVED_BYTES {
                if !self.exhausted {
                    self.exhausted = true;
                    self.diagnostics.warn(
                        Stage::Template,
                        format!(
                            "resolved text passed {} bytes; remaining loop markers left as text",
                            MAX_RESOLVED_BYTES
                        ),
                    );
                }
                break;
            }

            out.push_str(&text[copied..start.start]);

            let Some(end) = scan::matching_loop_end(text, start.end, name) else {
                self.diagnostics.warn(
                    Stage::Template,
                    format!("loop '{}' has no end marker; start marker dropped", name),
                );
                copied = start.end;
                continue;
            };

            let body = &text[start.end..end.start];
            let replacement = expand_body(name, body, self.scope, self.diagnostics);
            if depth < MAX_LOOP_DEPTH {
                self.expand_into(&replacement, depth + 1, out);
            } else {
                if !self.depth_capped {
                    self.depth_capped = true;
                    self.diagnostics.warn(
                        Stage::Template,
                        format!(
                            "loops nested deeper than {}; inner loop markers left as text",
                            MAX_LOOP_DEPTH
                        ),
                    );
                }
                out.push_str(&replacement);
            }
            copied = end.end;
        }

        out.push_str(&text[copied..]);
    }
}

fn expand_body(name: &str, body: &str, scope: &Scope<'_>, diagnostics: &mut Diagnostics) -> String {
    let target = scope.lookup(name);
    let Some(items) = target.as_sequence() else {
        diagnostics.warn(
            Stage::Template,
            format!("loop '{}' does not refer to a list; emitting nothing", name),
        );
        return String::new();
    };

    log::debug!("expanding loop '{}' over {} item(s)", name, items.len());

    let separator = if body.trim().is_empty() { "" } else { "," };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| substitute(body, &scope.for_item(item, index)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn substitute(text: &str, scope: &Scope<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for marker in scan::markers(text) {
        let MarkerKind::Variable(path) = marker.kind() else {
            continue;
        };
        out.push_str(&text[copied..marker.start]);
        let value = scope.lookup(path);
        if value.is_absent() {
            log::debug!("variable '{}' is not bound", path);
        }
        out.push_str(&value.to_template_text());
        copied = marker.end;
    }
    out.push_str(&text[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolve_json(raw: &str, vars: serde_json::Value) -> String {
        resolve(raw, &Scope::root(vars))
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let raw = r#"{"elements":[{"type":"text","content":"a { b } c"}]}"#;
        assert_eq!(resolve_json(raw, json!({"x": 1})), raw);
    }

    #[test]
    fn absent_variable_becomes_empty() {
        assert_eq!(resolve_json("Hi {{x}}", json!({})), "Hi ");
    }

    #[test]
    fn scalar_formats() {
        let vars = json!({
            "s": "say \"hi\"\n",
            "i": 42,
            "f": 3.14159,
            "b": true,
            "whole": 2.0
        });
        assert_eq!(
            resolve_json("{{s}}|{{i}}|{{f}}|{{b}}|{{whole}}", vars),
            r#"say \"hi\"\n|42|3.14|true|2.00"#
        );
    }

    #[test]
    fn mapping_renders_as_escaped_json() {
        let out = resolve_json("{{m}}", json!({"m": {"k": "v"}}));
        assert_eq!(out, r#"{\"k\":\"v\"}"#);
    }

    #[test]
    fn nested_path_lookup() {
        let out = resolve_json(
            "{{ customer.address.city }}",
            json!({"customer": {"address": {"city": "Lyon"}}}),
        );
        assert_eq!(out, "Lyon");
    }

    #[test]
    fn loop_joins_items_with_commas() {
        let out = resolve_json(
            "[{{#items}}\"{{v}}\"{{/items}}]",
            json!({"items": [{"v": "a"}, {"v": "b"}, {"v": "c"}]}),
        );
        assert_eq!(out, r#"["a","b","c"]"#);
    }

    #[test]
    fn single_item_has_no_comma() {
        let out = resolve_json("{{#items}}{{v}}{{/items}}", json!({"items": [{"v": "x"}]}));
        assert_eq!(out, "x");
    }

    #[test]
    fn blank_body_is_not_comma_joined() {
        let out = resolve_json("[{{#items}} {{/items}}]", json!({"items": [1, 2, 3]}));
        assert_eq!(out, "[   ]");
    }

    #[test]
    fn loop_exposes_index_and_item() {
        let out = resolve_json(
            "{{#fruits}}{{index1}}:{{item}}{{/fruits}}",
            json!({"fruits": ["apple", "pear"]}),
        );
        assert_eq!(out, "1:apple,2:pear");
    }

    #[test]
    fn loop_body_sees_outer_variables() {
        let out = resolve_json(
            "{{#rows}}{{label}} {{currency}}{{/rows}}",
            json!({"currency": "EUR", "rows": [{"label": "a"}, {"label": "b"}]}),
        );
        assert_eq!(out, "a EUR,b EUR");
    }

    #[test]
    fn non_sequence_loop_emits_nothing() {
        let mut diagnostics = Diagnostics::new();
        let out = resolve_with_diagnostics(
            "[{{#items}}x{{/items}}]",
            &Scope::root(json!({"items": "nope"})),
            &mut diagnostics,
        );
        assert_eq!(out, "[]");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn missing_end_drops_only_the_start_marker() {
        let mut diagnostics = Diagnostics::new();
        let out = resolve_with_diagnostics(
            "before {{#items}} after {{v}}",
            &Scope::root(json!({"items": [1], "v": "z"})),
            &mut diagnostics,
        );
        assert_eq!(out, "before  after z");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn same_named_nested_loop_is_bounded_by_depth() {
        let out = resolve_json(
            "{{#a}}<{{#a}}{{/a}}>{{/a}}|tail",
            json!({"a": [1, 2]}),
        );
        // outer body is "<{{#a}}{{/a}}>", repeated twice; each inner copy then
        // expands against the root with a blank body
        assert_eq!(out, "<>,<>|tail");
    }

    #[test]
    fn inner_loop_of_other_name_expands_against_root() {
        let out = resolve_json(
            "{{#outer}}[{{#inner}}x{{/inner}}]{{/outer}}",
            json!({"outer": [1, 2], "inner": ["a", "b"]}),
        );
        assert_eq!(out, "[x,x],[x,x]");
    }

    #[test]
    fn inner_loop_variables_bind_in_the_outer_pass() {
        // the outer copy substitutes `{{item}}` before the inner loop runs
        let out = resolve_json(
            "{{#outer}}[{{#inner}}{{item}}{{/inner}}]{{/outer}}",
            json!({"outer": [1, 2], "inner": ["a", "b"]}),
        );
        assert_eq!(out, "[1,1],[2,2]");
    }

    #[test]
    fn large_lists_with_inner_loops_expand_fully() {
        let rows: Vec<_> = (0..12_000).map(|i| json!({"n": i})).collect();
        let mut diagnostics = Diagnostics::new();
        let out = resolve_with_diagnostics(
            "[{{#rows}}{{n}}:{{#tags}}t{{/tags}}{{/rows}}]",
            &Scope::root(json!({"rows": rows, "tags": ["t"]})),
            &mut diagnostics,
        );
        assert!(!out.contains("{{"));
        assert!(out.starts_with("[0:t,1:t,"));
        assert!(out.ends_with(",11999:t]"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn self_reproducing_values_stop_expanding() {
        // each copy of the body reintroduces the loop it came from
        let mut diagnostics = Diagnostics::new();
        let out = resolve_with_diagnostics(
            "{{#a}}{{x}}{{/a}}",
            &Scope::root(json!({"a": [{"x": "{{#a}}{{x}}{{/a}}"}]})),
            &mut diagnostics,
        );
        // the innermost copy is left as text; `x` is not bound at the root
        assert_eq!(out, "{{#a}}{{/a}}");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn unbalanced_same_named_start_is_dropped() {
        // the first `{{#a}}` never closes at depth 0, so only it is removed
        let mut diagnostics = Diagnostics::new();
        let out = resolve_with_diagnostics(
            "{{#a}}x{{#a}}y{{/a}}",
            &Scope::root(json!({"a": [1]})),
            &mut diagnostics,
        );
        assert_eq!(out, "xy");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn resolving_twice_is_stable() {
        let vars = json!({"items": [{"v": "x"}, {"v": "y"}], "title": "T"});
        let once = resolve_json("{{title}}: {{#items}}{{v}}{{/items}}", vars.clone());
        let twice = resolve_json(&once, vars);
        assert_eq!(once, twice);
    }

    #[test]
    fn table_rows_string_expands_to_row_list() {
        let raw = r#"{"rows":"{{#items}}{\"cells\":[\"{{v}}\"]}{{/items}}"}"#;
        let out = resolve_json(raw, json!({"items": [{"v": "x"}, {"v": "y"}]}));
        assert_eq!(
            out,
            r#"{"rows":"{\"cells\":[\"x\"]},{\"cells\":[\"y\"]}"}"#
        );
    }

    #[test]
    fn load_file_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{\"elements\":[]}").unwrap();
        assert_eq!(load_file(&path).unwrap(), "{\"elements\":[]}");
    }

    #[test]
    fn load_file_missing_is_io_error() {
        let err = load_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, FolioError::Io { .. }));
    }

    #[test]
    fn load_reader_reads_all() {
        let text = load_reader("abc".as_bytes()).unwrap();
        assert_eq!(text, "abc");
    }
}
