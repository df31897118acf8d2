//! Inspect report types and terminal formatting.

use serde::Serialize;
use std::fmt;

use crate::ir::{NodeId, NodeKind};
use crate::text::truncate;

/// The result of inspecting a document.
#[derive(Clone, Debug, Serialize)]
pub struct InspectReport {
    pub summary: SummarySection,
    pub crops: CropSection,
    /// Top labels by node count.
    pub labels: Vec<LabelCount>,
    /// Nodes whose label fell outside the top N.
    pub other_labels: usize,
    /// Empty unless lineage was requested.
    pub lineage: Vec<LineageEntry>,
    /// Parent ids referenced by some node but never defined.
    pub dangling_parents: Vec<NodeId>,
    /// Whether the adjacency index matches the nodes' declared parents.
    pub adjacency_ok: bool,
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// Node and edge counts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub nodes: usize,
    pub edges: usize,
    pub images: usize,
    pub crops: usize,
    pub texts: usize,
    pub other: usize,
    pub metadata_version: Option<String>,
}

/// How crop nodes resolve.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CropSection {
    /// Crops with crop children.
    pub container: usize,
    /// Leaf crops showing a Text value.
    pub annotated: usize,
    /// Annotated crops whose value comes from a correction below the first Text.
    pub corrected: usize,
    /// Leaf crops with no Text child.
    pub blank: usize,
    /// Crops whose region extends past the image frame.
    pub out_of_frame: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Immediate parents and children of one node.
#[derive(Clone, Debug, Serialize)]
pub struct LineageEntry {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

const BOX_WIDTH: usize = 59;

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "╭─────────────────────────────────────────────────────────────╮")?;
        writeln!(f, "│              📊  Annotation Inspection Report               │")?;
        writeln!(f, "╰─────────────────────────────────────────────────────────────╯")?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_crops(f)?;
        writeln!(f)?;
        self.fmt_labels(f)?;

        if !self.lineage.is_empty() {
            writeln!(f)?;
            self.fmt_lineage(f)?;
        }

        Ok(())
    }
}

impl InspectReport {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        section_top(f, "Summary")?;
        row(f, &format!("Nodes:         {:>8}", format_number(s.nodes)))?;
        row(f, &format!("Edges:         {:>8}", format_number(s.edges)))?;
        blank(f)?;
        row(f, &format!("Images:        {:>8}", format_number(s.images)))?;
        row(f, &format!("Crops:         {:>8}", format_number(s.crops)))?;
        row(f, &format!("Texts:         {:>8}", format_number(s.texts)))?;
        if s.other > 0 {
            row(f, &format!("Other:         {:>8}", format_number(s.other)))?;
        }
        if let Some(version) = &s.metadata_version {
            blank(f)?;
            row(f, &format!("Version:       {:>8}", version))?;
        }
        section_bottom(f)
    }

    fn fmt_crops(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.crops;
        let total = self.summary.crops;
        section_top(f, "Crops")?;

        if total == 0 {
            row(f, "No crops found.")?;
            return section_bottom(f);
        }

        row(f, &count_line("Container:", c.container, total))?;
        row(f, &count_line("Annotated:", c.annotated, total))?;
        row(f, &count_line("  corrected:", c.corrected, total))?;
        row(f, &count_line("Blank:", c.blank, total))?;
        blank(f)?;

        let has_issues =
            c.out_of_frame > 0 || !self.dangling_parents.is_empty() || !self.adjacency_ok;
        if has_issues {
            row(f, "Issues found:")?;
            if c.out_of_frame > 0 {
                row(f, &format!("  ⚠ Out of frame:   {:>7}", format_number(c.out_of_frame)))?;
            }
            if !self.dangling_parents.is_empty() {
                let ids: Vec<&str> = self.dangling_parents.iter().map(NodeId::as_str).collect();
                row(f, &format!("  ✗ Missing parents: {}", truncate(&ids.join(", "), 34)))?;
            }
            if !self.adjacency_ok {
                row(f, "  ✗ Adjacency index out of step with nodes")?;
            }
        } else {
            row(f, "✓ No issues detected")?;
        }

        section_bottom(f)
    }

    fn fmt_labels(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, &format!("Labels ({})", self.labels.len()))?;

        if self.labels.is_empty() {
            row(f, "No nodes found.")?;
            return section_bottom(f);
        }

        let total = self.summary.nodes;
        let max_count = self.labels.iter().map(|e| e.count).max().unwrap_or(1);
        for entry in &self.labels {
            row(
                f,
                &format!(
                    "{:<16} {:>7}  {}",
                    truncate(&entry.label, 16),
                    format_number(entry.count),
                    render_bar(entry.count, max_count, self.bar_width)
                ),
            )?;
        }
        if self.other_labels > 0 {
            row(
                f,
                &format!(
                    "{:<16} {:>7}  ({})",
                    "(other)",
                    format_number(self.other_labels),
                    fmt_percent(self.other_labels, total)
                ),
            )?;
        }

        section_bottom(f)
    }

    fn fmt_lineage(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lineage:")?;
        for entry in &self.lineage {
            let parents: Vec<&str> = entry.parents.iter().map(NodeId::as_str).collect();
            let children: Vec<&str> = entry.children.iter().map(NodeId::as_str).collect();
            writeln!(
                f,
                "  {} [{}]  parents: [{}]  children: [{}]",
                entry.id,
                entry.kind,
                parents.join(", "),
                children.join(", ")
            )?;
        }
        Ok(())
    }
}

fn section_top(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let fill = BOX_WIDTH.saturating_sub(title.chars().count() + 3);
    writeln!(f, "┌─ {} {}┐", title, "─".repeat(fill))?;
    blank(f)
}

fn section_bottom(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    blank(f)?;
    writeln!(f, "└{}┘", "─".repeat(BOX_WIDTH))
}

fn blank(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "│{}│", " ".repeat(BOX_WIDTH))
}

/// One boxed line, padded to the box width.
fn row(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let padding = BOX_WIDTH.saturating_sub(text.chars().count() + 3);
    writeln!(f, "│   {}{}│", text, " ".repeat(padding))
}

fn count_line(name: &str, count: usize, total: usize) -> String {
    format!(
        "{:<13}{:>8}  ({:>5})",
        name,
        format_number(count),
        fmt_percent(count, total)
    )
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }
    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}
