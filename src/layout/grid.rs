//! Grid layout: children placed `columns` to a row in equal-width columns.
//!
//! Every row of children shares one height, the height of its tallest
//! child. Children cannot report a height without being laid out, so each
//! row is laid out twice:
//!
//! 1. In measurement mode, each child at its column's x from the row's
//!    top. The backend moves the cursor but draws nothing; the distance the
//!    cursor travelled is the child's height.
//! 2. For real, at the same positions.
//!
//! A grid nested in another grid's row measures inside the outer
//! measurement pass, and its own second pass stays in measurement mode
//! until the outer grid draws.
//!
//! The next row then starts below the tallest child plus a 2 mm gutter.
//! Text children are confined to their column. Other children fall back
//! to the ordinary element path and use the full content width.

use crate::backend::{Border, Cell, DrawingBackend, LineFeed};
use crate::error::FolioError;
use crate::model::{Element, ElementKind};

use super::{LayoutEngine, EMPTY_STYLE};

/// Space between columns, taken from each column's width.
const COLUMN_GUTTER: f64 = 2.0;
/// Space between rows.
const ROW_GUTTER: f64 = 2.0;
/// Default line height of text inside a grid cell.
const GRID_TEXT_HEIGHT: f64 = 5.0;

impl<'d, B: DrawingBackend> LayoutEngine<'d, B> {
    pub(super) fn render_grid(
        &mut self,
        columns: i64,
        children: &'d [Element],
    ) -> Result<(), FolioError> {
        if columns <= 0 || children.is_empty() {
            log::debug!("grid with {} column(s) and {} child(ren) skipped", columns, children.len());
            return Ok(());
        }
        let columns = columns as usize;
        let left = self.backend.page_setup().margins.left;
        let column_width = self.available_width() / columns as f64;
        let inner_width = column_width - COLUMN_GUTTER;

        for row in children.chunks(columns) {
            let (_, top) = self.backend.cursor();

            let outer = self.measuring;
            self.set_measuring(true);
            let measured = self.measure_row(row, left, top, column_width, inner_width);
            self.set_measuring(outer);
            let height = measured?;

            for (i, child) in row.iter().enumerate() {
                self.backend.set_cursor(left + i as f64 * column_width, top);
                self.render_in_column(child, inner_width)?;
            }

            self.backend.set_cursor(left, top + height + ROW_GUTTER);
        }
        Ok(())
    }

    /// Height of the tallest child in `row`. The cursor is left at `top`.
    fn measure_row(
        &mut self,
        row: &'d [Element],
        left: f64,
        top: f64,
        column_width: f64,
        inner_width: f64,
    ) -> Result<f64, FolioError> {
        let mut tallest: f64 = 0.0;
        for (i, child) in row.iter().enumerate() {
            let x = left + i as f64 * column_width;
            self.backend.set_cursor(x, top);
            self.render_in_column(child, inner_width)?;
            let (_, bottom) = self.backend.cursor();
            tallest = tallest.max(bottom - top);
            self.backend.set_cursor(x, top);
        }
        Ok(tallest)
    }

    fn render_in_column(&mut self, child: &'d Element, width: f64) -> Result<(), FolioError> {
        let ElementKind::Text { content } = &child.kind else {
            return self.render_element(child);
        };

        self.apply_style(child.style.as_ref());
        let style = child.style.as_ref().unwrap_or(&EMPTY_STYLE);
        let height = style.height_or(GRID_TEXT_HEIGHT);
        let cell = Cell::new(width, height, content)
            .border(Border::parse(style.border().unwrap_or("")))
            .align(style.align())
            .fill(style.is_filled());

        if content.contains('\n') {
            self.backend.multi_cell(cell);
        } else {
            self.backend
                .cell(Cell { height: height * 1.5, ..cell }.feed(LineFeed::NextLine));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{cell_at, run};
    use crate::backend::recording::Call;
    use crate::backend::DrawingBackend;
    use crate::diagnostics::Stage;
    use serde_json::json;

    fn text(content: &str) -> serde_json::Value {
        json!({"type": "text", "content": content})
    }

    #[test]
    fn rows_start_below_tallest_child() {
        let (rec, _) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 2,
            "children": [text("a\nb\nc"), text("short"), text("next")]
        }]}));
        let cells: Vec<_> = rec.cells().into_iter().map(cell_at).collect();
        assert_eq!(
            cells,
            vec![
                (15.0, 12.0, 88.0, 5.0),
                (15.0, 17.0, 88.0, 5.0),
                (15.0, 22.0, 88.0, 5.0),
                (105.0, 12.0, 88.0, 7.5),
                // three 5 mm lines plus the row gutter
                (15.0, 29.0, 88.0, 7.5),
            ]
        );
        assert_eq!(rec.texts(), vec!["a", "b", "c", "short", "next"]);
        assert_eq!(rec.cursor(), (15.0, 29.0 + 7.5 + 2.0));
    }

    #[test]
    fn measurement_pass_draws_nothing() {
        let (rec, _) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 3,
            "children": [text("one"), text("two"), text("three")]
        }]}));
        assert_eq!(rec.cells().len(), 3);
        assert_eq!(rec.pages(), 1);
    }

    #[test]
    fn cell_style_applies_inside_column() {
        let (rec, _) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 1,
            "children": [{"type": "text", "content": "boxed", "style": {"height": 4, "border": "1"}}]
        }]}));
        assert_eq!(cell_at(rec.cells()[0]), (15.0, 12.0, 178.0, 6.0));
        assert_eq!(rec.cursor().1, 12.0 + 6.0 + 2.0);
    }

    #[test]
    fn non_text_children_use_the_element_path() {
        let (rec, _) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 2,
            "children": [{"type": "space", "style": {"height": 10}}, text("x")]
        }]}));
        assert_eq!(rec.texts(), vec!["x"]);
        assert_eq!(rec.cursor().1, 12.0 + 10.0 + 2.0);
    }

    #[test]
    fn nested_grid_is_drawn_once() {
        let (rec, _) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 2,
            "children": [
                {"type": "grid", "gridColumns": 1, "children": [text("inner")]},
                text("outer")
            ]
        }]}));
        assert_eq!(rec.texts(), vec!["inner", "outer"]);
        assert_eq!(rec.pages(), 1);
    }

    #[test]
    fn nested_grid_measurement_never_breaks_the_page() {
        let (rec, _) = run(json!({"elements": [
            {"type": "space", "style": {"height": 255}},
            {
                "type": "grid",
                "gridColumns": 2,
                "children": [
                    {"type": "grid", "gridColumns": 1, "children": [text("a\nb\nc\nd")]},
                    text("side")
                ]
            }
        ]}));
        // only the drawing pass crosses the bottom margin, once
        let pages: Vec<usize> = rec
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Cell { page, .. } => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(rec.texts(), vec!["a", "b", "c", "d", "side"]);
        assert_eq!(pages, vec![1, 1, 2, 2, 2]);
        assert_eq!(rec.pages(), 2);
    }

    #[test]
    fn grid_children_report_warnings_once() {
        let (_, diagnostics) = run(json!({"elements": [{
            "type": "grid",
            "gridColumns": 2,
            "children": [
                {"type": "chart"},
                {"type": "table", "columns": [{"header": "H", "width": 20}], "rows": 7},
                {"type": "image", "content": "not a data uri"},
                {"type": "text", "content": "x", "style": {"font": "DejaVu"}}
            ]
        }]}));
        let stages: Vec<Stage> = diagnostics.iter().map(|d| d.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::Layout, Stage::Layout, Stage::Layout, Stage::Font]
        );
    }

    #[test]
    fn empty_or_columnless_grid_is_a_no_op() {
        let (rec, _) = run(json!({"elements": [
            {"type": "grid", "gridColumns": 0, "children": [text("x")]},
            {"type": "grid", "gridColumns": 2, "children": []}
        ]}));
        assert!(rec.cells().is_empty());
        assert_eq!(rec.cursor(), (15.0, 12.0));
    }
}
