//! Table builder wrapper around comfy-table for condition state display.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

/// Create a borderless table with the given headers.
///
/// comfy-table honours `NO_COLOR` on its own.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_upper_cased() {
        let mut table = list_table(&["Condition", "State"]);
        table.add_row(vec!["c1", "Valid"]);
        let rendered = table.to_string();
        assert!(rendered.contains("CONDITION"));
        assert!(rendered.contains("Valid"));
    }
}
