use std::io::{self, Write};

use comfy_table::{Cell, Color, Table};

use super::BomTable;

/// Columns identifying the part itself; a row with none of them filled is
/// hard to order.
const PART_COLUMNS: [&str; 3] = ["P/N", "MPN", "SPN"];

impl BomTable {
    /// Write the BOM as a formatted terminal table.
    ///
    /// Designators of rows without any part number are highlighted.
    pub fn write_table<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(comfy_table::ContentArrangement::DynamicFullWidth);
        table.set_header(&self.header);

        let designators = self.column("Designators");
        let part_columns: Vec<usize> = PART_COLUMNS
            .iter()
            .filter_map(|name| self.column(name))
            .collect();

        for row in &self.rows {
            let unsourced = part_columns
                .iter()
                .all(|&index| row.get(index).is_none_or(String::is_empty));

            let cells = row.iter().enumerate().map(|(index, value)| {
                let cell = Cell::new(value);
                if unsourced && Some(index) == designators {
                    cell.fg(Color::Red)
                } else {
                    cell
                }
            });
            table.add_row(cells);
        }

        writeln!(writer, "{table}")
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }
}
