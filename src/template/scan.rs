//! Marker scanning over raw descriptor text.
//!
//! A marker is `{{`, at least one character that is not `}`, then `}}`.
//! Interior whitespace is free. `#name` opens a loop, `/name` closes one,
//! anything else is a variable path.

/// One `{{ ... }}` occurrence in the text, by byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'t> {
    /// Offset of the opening `{{`.
    pub start: usize,
    /// Offset just past the closing `}}`.
    pub end: usize,
    /// The raw text between the braces, untrimmed.
    pub inner: &'t str,
}

/// What a marker means once its interior is trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind<'t> {
    LoopStart(&'t str),
    LoopEnd(&'t str),
    Variable(&'t str),
}

impl<'t> Marker<'t> {
    pub fn kind(&self) -> MarkerKind<'t> {
        let trimmed = self.inner.trim();
        if let Some(name) = trimmed.strip_prefix('#') {
            MarkerKind::LoopStart(name.trim())
        } else if let Some(name) = trimmed.strip_prefix('/') {
            MarkerKind::LoopEnd(name.trim())
        } else {
            MarkerKind::Variable(trimmed)
        }
    }
}

/// Find the first marker starting at or after byte offset `from`.
pub fn next_marker(text: &str, from: usize) -> Option<Marker<'_>> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(rel) = text.get(pos..)?.find("{{") {
        let open = pos + rel;
        let body_start = open + 2;
        match text[body_start..].find('}') {
            Some(0) => {}
            Some(rel_close) => {
                let close = body_start + rel_close;
                if bytes.get(close + 1) == Some(&b'}') {
                    return Some(Marker {
                        start: open,
                        end: close + 2,
                        inner: &text[body_start..close],
                    });
                }
            }
            None => return None,
        }
        pos = open + 1;
    }
    None
}

/// Iterate over all markers in order.
pub fn markers(text: &str) -> impl Iterator<Item = Marker<'_>> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        let marker = next_marker(text, pos)?;
        pos = marker.end;
        Some(marker)
    })
}

/// Find the first loop-start marker at or after `from`.
pub fn next_loop_start(text: &str, from: usize) -> Option<(Marker<'_>, &str)> {
    let mut pos = from;
    while let Some(marker) = next_marker(text, pos) {
        if let MarkerKind::LoopStart(name) = marker.kind() {
            return Some((marker, name));
        }
        pos = marker.end;
    }
    None
}

/// Find the end marker that closes a loop named `name` whose body starts at
/// `from`.
///
/// Starts and ends of the same name are counted so that a nested loop over
/// the same collection does not close the outer one. Markers for other
/// names are ignored.
pub fn matching_loop_end<'t>(text: &'t str, from: usize, name: &str) -> Option<Marker<'t>> {
    let mut depth = 0usize;
    let mut pos = from;
    while let Some(marker) = next_marker(text, pos) {
        match marker.kind() {
            MarkerKind::LoopStart(n) if n == name => depth += 1,
            MarkerKind::LoopEnd(n) if n == name => {
                if depth == 0 {
                    return Some(marker);
                }
                depth -= 1;
            }
            _ => {}
        }
        pos = marker.end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_marker() {
        let m = next_marker("Hi {{ name }}!", 0).unwrap();
        assert_eq!((m.start, m.end), (3, 13));
        assert_eq!(m.kind(), MarkerKind::Variable("name"));
    }

    #[test]
    fn classifies_loop_markers() {
        let all: Vec<_> = markers("{{# items }}x{{ / items }}")
            .map(|m| m.kind())
            .collect();
        assert_eq!(
            all,
            vec![MarkerKind::LoopStart("items"), MarkerKind::LoopEnd("items")]
        );
    }

    #[test]
    fn empty_braces_are_not_markers() {
        assert!(next_marker("{{}} plain", 0).is_none());
    }

    #[test]
    fn single_brace_inside_breaks_marker() {
        // `{{a}b}}` has no `}}` right after the first `}`
        assert!(next_marker("{{a}b}}", 0).is_none());
    }

    #[test]
    fn json_braces_are_not_confused_for_markers() {
        let text = r#"{"cells":["{{v}}"]}"#;
        let all: Vec<_> = markers(text).map(|m| m.inner).collect();
        assert_eq!(all, vec!["v"]);
    }

    #[test]
    fn matching_end_counts_same_name_depth() {
        let text = "{{#a}}1{{#a}}2{{/a}}3{{/a}}4";
        let (start, name) = next_loop_start(text, 0).unwrap();
        let end = matching_loop_end(text, start.end, name).unwrap();
        assert_eq!(&text[start.end..end.start], "1{{#a}}2{{/a}}3");
    }

    #[test]
    fn matching_end_ignores_other_names() {
        let text = "{{#a}}{{#b}}{{/b}}{{/a}}";
        let (start, name) = next_loop_start(text, 0).unwrap();
        let end = matching_loop_end(text, start.end, name).unwrap();
        assert_eq!(end.start, text.len() - "{{/a}}".len());
    }

    #[test]
    fn unbalanced_same_name_leaves_outer_start_open() {
        // the inner start takes the only end, so the outer start has none
        let text = "{{#a}}x{{#a}}y{{/a}}";
        let (start, name) = next_loop_start(text, 0).unwrap();
        assert_eq!(start.start, 0);
        assert!(matching_loop_end(text, start.end, name).is_none());

        let (inner, name) = next_loop_start(text, start.end).unwrap();
        let end = matching_loop_end(text, inner.end, name).unwrap();
        assert_eq!(&text[inner.end..end.start], "y");
    }

    #[test]
    fn unmatched_start_has_no_end() {
        let text = "{{#a}} never closed {{/b}}";
        let (start, name) = next_loop_start(text, 0).unwrap();
        assert!(matching_loop_end(text, start.end, name).is_none());
    }
}
