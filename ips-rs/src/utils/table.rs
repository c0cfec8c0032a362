//! Report tables

use prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE;
use prettytable::{Cell, Row, Table};

/// One row of a report table
pub trait TableRow {
    /// Column titles shared by every row of this type
    const HEADERS: &'static [&'static str];

    /// Formatted cells, one per header
    fn cells(&self) -> Vec<String>;
}

impl<T: TableRow> TableRow for &T {
    const HEADERS: &'static [&'static str] = T::HEADERS;

    fn cells(&self) -> Vec<String> {
        (**self).cells()
    }
}

/// Build a table with bold titles from `R::HEADERS` and one line per row
pub fn report_table<R: TableRow>(rows: impl IntoIterator<Item = R>) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        R::HEADERS
            .iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));

    for row in rows {
        table.add_row(Row::new(row.cells().iter().map(|c| Cell::new(c)).collect()));
    }
    table
}
