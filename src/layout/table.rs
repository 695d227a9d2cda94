//! Fixed-width tables.
//!
//! A header row, then one row per data entry, every cell 8 mm tall. The
//! table is placed as a block: its total column width is aligned within
//! the content area and every row starts at that same x.

use crate::backend::{Border, Cell, DrawingBackend};
use crate::diagnostics::Stage;
use crate::model::Table;
use crate::style::{Align, Style};

use super::LayoutEngine;

const ROW_HEIGHT: f64 = 8.0;

impl<B: DrawingBackend> LayoutEngine<'_, B> {
    pub(super) fn render_table(&mut self, table: &Table, style: Option<&Style>) {
        if let Some(error) = &table.rows_error {
            self.report(Stage::Layout, format!("table rows ignored: {}", error));
        }
        if table.columns.is_empty() {
            log::debug!("table without columns skipped");
            return;
        }

        let setup = self.backend.page_setup();
        let total: f64 = table.columns.iter().map(|c| c.width).sum();
        let available = setup.available_width();
        let start_x = match style.map(Style::align).unwrap_or_default() {
            Align::Left => setup.margins.left,
            Align::Center => setup.margins.left + (available - total) / 2.0,
            Align::Right => setup.margins.left + (available - total),
        };

        if table.rows.is_empty() {
            log::debug!("table without rows skipped");
            return;
        }

        let (_, y) = self.backend.cursor();
        self.backend.set_cursor(start_x, y);

        if style.is_some() {
            self.apply_style(style);
        }
        let border = Border::parse(style.and_then(Style::border).unwrap_or("1"));
        let fill = style.is_some_and(Style::is_filled);
        for column in &table.columns {
            self.backend.cell(
                Cell::new(column.width, ROW_HEIGHT, &column.header)
                    .border(border)
                    .align(column.align.unwrap_or_default())
                    .fill(fill),
            );
        }
        self.next_row(start_x);

        for row in &table.rows {
            self.apply_style(row.style.as_ref());
            for (text, column) in row.cells.iter().zip(&table.columns) {
                self.backend.cell(
                    Cell::new(column.width, ROW_HEIGHT, text)
                        .border(Border::ALL)
                        .align(column.align.unwrap_or_default()),
                );
            }
            self.next_row(start_x);
        }

        let (_, y) = self.backend.cursor();
        self.backend.set_cursor(setup.margins.left, y);
    }

    fn next_row(&mut self, start_x: f64) {
        let (_, y) = self.backend.cursor();
        self.backend.set_cursor(start_x, y + ROW_HEIGHT);
    }
}
