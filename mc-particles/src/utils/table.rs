//! Table helpers for command output
//!
//! Numeric cells are right-aligned so counters and sizes line up.

use prettytable::format::{Alignment, consts::FORMAT_NO_LINESEP_WITH_TITLE};
use prettytable::{Cell, Row, Table};

pub fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
    ));
    table
}

pub fn add_table_row(table: &mut Table, cells: Vec<String>) {
    table.add_row(Row::new(cells.iter().map(|text| cell(text)).collect()));
}

fn cell(text: &str) -> Cell {
    if !text.is_empty() && text.parse::<f64>().is_ok() {
        Cell::new_align(text, Alignment::RIGHT)
    } else {
        Cell::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_align_right() {
        let mut table = create_table(&["Counter", "Value"]);
        add_table_row(&mut table, vec!["spawned".to_string(), "7".to_string()]);
        add_table_row(&mut table, vec!["long name".to_string(), "12345".to_string()]);
        add_table_row(&mut table, vec!["mean".to_string(), "-0.5".to_string()]);

        let rendered = table.to_string();
        assert!(rendered.contains("| spawned   |     7 |"), "{rendered}");
        assert!(rendered.contains("| long name | 12345 |"), "{rendered}");
        assert!(rendered.contains("| mean      |  -0.5 |"), "{rendered}");
    }
}
