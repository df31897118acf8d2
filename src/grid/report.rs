//! Grid rows and their terminal formatting.

use serde::Serialize;
use std::fmt;

use crate::ir::{CropRegion, NodeId};
use crate::text::truncate;

pub(super) const DEFAULT_CELL_WIDTH: usize = 32;

/// All grid rows for a document.
#[derive(Clone, Debug, Serialize)]
pub struct GridReport {
    pub rows: Vec<GridRow>,
    #[serde(skip)]
    pub(crate) max_cell_width: usize,
}

/// One node joined with its display value and lineage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridRow {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub data: String,
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
    pub crop_region: Option<CropRegion>,
    #[serde(rename = "displaySourceId")]
    pub display_source_id: Option<NodeId>,
    pub reason: String,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
    pub locked: bool,
}

const HEADERS: [&str; 7] = ["ID", "TYPE", "DISPLAY", "SOURCE", "LOCKED", "PARENTS", "CHILDREN"];

impl GridRow {
    fn cells(&self, width: usize) -> [String; 7] {
        [
            truncate(self.id.as_str(), width),
            truncate(&self.node_type, width),
            truncate(self.display_value.as_deref().unwrap_or("-"), width),
            truncate(
                self.display_source_id.as_ref().map_or("", NodeId::as_str),
                width,
            ),
            if self.locked { "yes" } else { "" }.to_string(),
            truncate(&join_ids(&self.parents), width),
            truncate(&join_ids(&self.children), width),
        ]
    }
}

impl fmt::Display for GridReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "No nodes found.");
        }

        let table: Vec<[String; 7]> = self
            .rows
            .iter()
            .map(|row| row.cells(self.max_cell_width))
            .collect();

        let mut widths = HEADERS.map(|h| h.chars().count());
        for cells in &table {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_line(f, &HEADERS.map(str::to_string), &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("  "))?;
        for cells in &table {
            write_line(f, cells, &widths)?;
        }

        writeln!(f)?;
        writeln!(f, "{} row(s)", self.rows.len())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String; 7], widths: &[usize; 7]) -> fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    writeln!(f, "{}", padded.join("  ").trim_end())
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, display: Option<&str>) -> GridRow {
        GridRow {
            id: NodeId::from(id),
            node_type: "collectra.Text".to_string(),
            data: "x".to_string(),
            display_value: display.map(str::to_string),
            crop_region: None,
            display_source_id: Some(NodeId::from(id)),
            reason: "Text element: display data".to_string(),
            parents: vec![NodeId::from("c1"), NodeId::from("c2")],
            children: vec![],
            locked: false,
        }
    }

    #[test]
    fn empty_report_says_so() {
        let report = GridReport {
            rows: vec![],
            max_cell_width: DEFAULT_CELL_WIDTH,
        };
        assert_eq!(report.to_string(), "No nodes found.\n");
    }

    #[test]
    fn table_has_header_and_rows() {
        let report = GridReport {
            rows: vec![row("t1", Some("Hello")), row("t2", None)],
            max_cell_width: DEFAULT_CELL_WIDTH,
        };
        let text = report.to_string();
        assert!(text.starts_with("ID"));
        assert!(text.contains("Hello"));
        assert!(text.contains("c1, c2"));
        assert!(text.ends_with("2 row(s)\n"));
    }
}
