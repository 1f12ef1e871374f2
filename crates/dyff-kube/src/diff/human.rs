//! Human readable rendering of a diff report

use console::Style;
use serde_yaml::Value;
use similar::{ChangeTag, TextDiff};
use std::io::{self, Write};

use super::compare::{Detail, DetailKind, Diff, DiffReport};

const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve",
];

/// `one map entry`, `three list entries`, `42 documents`
fn count(n: usize, singular: &str, plural: &str) -> String {
    let number = NUMBER_WORDS
        .get(n)
        .map(|w| w.to_string())
        .unwrap_or_else(|| n.to_string());
    format!("{} {}", number, if n == 1 { singular } else { plural })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}

fn to_yaml(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

/// Writes a [`DiffReport`] in the style of `dyff between`
pub struct HumanReport<'a> {
    report: &'a DiffReport,
    indent: usize,
    omit_header: bool,
    color: bool,
}

impl<'a> HumanReport<'a> {
    pub fn new(report: &'a DiffReport) -> Self {
        Self {
            report,
            indent: 2,
            omit_header: false,
            color: false,
        }
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn omit_header(mut self, omit: bool) -> Self {
        self.omit_header = omit;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, style: &Style) -> String {
        if self.color {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if !self.omit_header {
            self.write_header(out)?;
        }

        for diff in &self.report.diffs {
            self.write_diff(out, diff)?;
        }

        out.flush()
    }

    fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let bold = Style::new().bold();
        writeln!(out, "between {}", self.paint(&self.report.from_location, &bold))?;
        writeln!(out, "    and {}", self.paint(&self.report.to_location, &bold))?;
        writeln!(out)?;
        writeln!(
            out,
            "returned {}",
            self.paint(&count(self.report.len(), "difference", "differences"), &bold)
        )?;
        writeln!(out)
    }

    fn write_diff<W: Write>(&self, out: &mut W, diff: &Diff) -> io::Result<()> {
        let path = diff
            .path
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "(root level)".to_string());

        writeln!(
            out,
            "{}  {}",
            self.paint(&path, &Style::new().bold()),
            self.paint(&format!("({})", diff.document), &Style::new().dim())
        )?;

        let whole_document = diff.path.is_none();
        for detail in &diff.details {
            self.write_detail(out, detail, whole_document)?;
        }

        writeln!(out)
    }

    fn write_detail<W: Write>(&self, out: &mut W, detail: &Detail, whole_document: bool) -> io::Result<()> {
        let pad = " ".repeat(self.indent);
        let body_pad = " ".repeat(self.indent * 2);
        let green = Style::new().green();
        let red = Style::new().red();
        let yellow = Style::new().yellow();

        match (detail.kind, &detail.from, &detail.to) {
            (DetailKind::Addition, _, Some(value)) => {
                let title = format!("+ {} added:", describe(value, whole_document));
                writeln!(out, "{}{}", pad, self.paint(&title, &yellow))?;
                self.write_block(out, &body_pad, &to_yaml(value), &green)
            }
            (DetailKind::Removal, Some(value), _) => {
                let title = format!("- {} removed:", describe(value, whole_document));
                writeln!(out, "{}{}", pad, self.paint(&title, &yellow))?;
                self.write_block(out, &body_pad, &to_yaml(value), &red)
            }
            (DetailKind::Modification, Some(from), Some(to)) => {
                if let (Value::String(a), Value::String(b)) = (from, to) {
                    if a.contains('\n') || b.contains('\n') {
                        return self.write_text_diff(out, &pad, &body_pad, a, b);
                    }
                }

                let title = if type_name(from) == type_name(to) {
                    "± value change".to_string()
                } else {
                    format!("± type change from {} to {}", type_name(from), type_name(to))
                };
                writeln!(out, "{}{}", pad, self.paint(&title, &yellow))?;
                self.write_prefixed(out, &body_pad, "- ", &to_yaml(from), &red)?;
                self.write_prefixed(out, &body_pad, "+ ", &to_yaml(to), &green)
            }
            (DetailKind::OrderChange, Some(from), Some(to)) => {
                writeln!(out, "{}{}", pad, self.paint("⇆ order changed", &yellow))?;
                self.write_prefixed(out, &body_pad, "- ", &inline_list(from), &red)?;
                self.write_prefixed(out, &body_pad, "+ ", &inline_list(to), &green)
            }
            _ => Ok(()),
        }
    }

    fn write_block<W: Write>(&self, out: &mut W, pad: &str, text: &str, style: &Style) -> io::Result<()> {
        for line in text.lines() {
            writeln!(out, "{}{}", pad, self.paint(line, style))?;
        }
        Ok(())
    }

    /// First line carries `marker`, continuation lines are aligned under it
    fn write_prefixed<W: Write>(
        &self,
        out: &mut W,
        pad: &str,
        marker: &str,
        text: &str,
        style: &Style,
    ) -> io::Result<()> {
        let continuation = " ".repeat(marker.len());
        for (i, line) in text.lines().enumerate() {
            let prefix = if i == 0 { marker } else { continuation.as_str() };
            writeln!(out, "{}{}", pad, self.paint(&format!("{}{}", prefix, line), style))?;
        }
        Ok(())
    }

    fn write_text_diff<W: Write>(
        &self,
        out: &mut W,
        pad: &str,
        body_pad: &str,
        from: &str,
        to: &str,
    ) -> io::Result<()> {
        let diff = TextDiff::from_lines(from, to);
        let inserts = diff.iter_all_changes().filter(|c| c.tag() == ChangeTag::Insert).count();
        let deletes = diff.iter_all_changes().filter(|c| c.tag() == ChangeTag::Delete).count();

        let title = format!(
            "± value change in multiline text ({}, {})",
            count(inserts, "insert", "inserts"),
            count(deletes, "deletion", "deletions")
        );
        writeln!(out, "{}{}", pad, self.paint(&title, &Style::new().yellow()))?;

        for (index, group) in diff.grouped_ops(3).iter().enumerate() {
            if index > 0 {
                writeln!(out, "{}{}", body_pad, self.paint("...", &Style::new().dim()))?;
            }
            for op in group {
                for change in diff.iter_changes(op) {
                    let (sign, style) = match change.tag() {
                        ChangeTag::Delete => ("- ", Style::new().red()),
                        ChangeTag::Insert => ("+ ", Style::new().green()),
                        ChangeTag::Equal => ("  ", Style::new().dim()),
                    };
                    let line = format!("{}{}", sign, change.value().trim_end_matches('\n'));
                    writeln!(out, "{}{}", body_pad, self.paint(&line, &style))?;
                }
            }
        }
        Ok(())
    }
}

/// `one map entry`, `two list entries`, `one document`
fn describe(value: &Value, whole_document: bool) -> String {
    if whole_document {
        return count(1, "document", "documents");
    }
    match value {
        Value::Mapping(m) => count(m.len(), "map entry", "map entries"),
        Value::Sequence(s) => count(s.len(), "list entry", "list entries"),
        _ => "value".to_string(),
    }
}

/// Order changes are shown on one line: `web, sidecar`
fn inline_list(value: &Value) -> String {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim_end().replace('\n', " "))
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => to_yaml(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compare::{CompareOptions, compare};
    use crate::diff::document::parse_documents;

    fn render(from: &str, to: &str, omit_header: bool, ignore_order_changes: bool) -> String {
        let report = compare(
            &parse_documents("from.yaml", from).unwrap(),
            &parse_documents("to.yaml", to).unwrap(),
            CompareOptions {
                ignore_order_changes,
            },
        );
        let mut out = Vec::new();
        HumanReport::new(&report)
            .indent(2)
            .omit_header(omit_header)
            .write_report(&mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    const FROM: &str = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: app\nspec:\n  replicas: 3\n";

    #[test]
    fn test_value_change() {
        let output = render(FROM, &FROM.replace("replicas: 3", "replicas: 5"), true, true);

        assert_eq!(
            output,
            "spec.replicas  (apps/v1/Deployment/app)\n  ± value change\n    - 3\n    + 5\n\n"
        );
    }

    #[test]
    fn test_header() {
        let output = render(FROM, FROM, false, true);
        assert!(output.starts_with("between from.yaml\n    and to.yaml\n"));
        assert!(output.contains("returned zero differences"));

        assert_eq!(render(FROM, FROM, true, true), "");
    }

    #[test]
    fn test_entries_added() {
        let to = format!("{}  paused: true\n  minReadySeconds: 5\n", FROM);
        let output = render(FROM, &to, true, true);

        assert!(output.starts_with("spec  (apps/v1/Deployment/app)\n  + two map entries added:\n"));
        assert!(output.contains("    paused: true\n"));
        assert!(output.contains("    minReadySeconds: 5\n"));
    }

    #[test]
    fn test_document_removed() {
        let cm = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n";
        let output = render(&format!("{}---\n{}", FROM, cm), FROM, true, true);

        assert!(output.starts_with("(root level)  (v1/ConfigMap/cfg)\n  - one document removed:\n    apiVersion: v1\n"));
    }

    #[test]
    fn test_type_change() {
        let output = render("a: 1\n", "a: one\n", true, true);
        assert!(output.contains("± type change from int to string"));
    }

    #[test]
    fn test_multiline_text() {
        let from = "data: |\n  line1\n  line2\n";
        let to = "data: |\n  line1\n  line2 changed\n  line3\n";
        let output = render(from, to, true, true);

        assert!(output.contains("± value change in multiline text (two inserts, one deletion)"));
        assert!(output.contains("    - line2\n"));
        assert!(output.contains("    + line2 changed\n"));
        assert!(output.contains("      line1\n"));
    }

    #[test]
    fn test_order_change() {
        let output = render("l: [a, b]\n", "l: [b, a]\n", true, false);
        assert!(output.contains("  ⇆ order changed\n    - a, b\n    + b, a\n"));
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count(1, "entry", "entries"), "one entry");
        assert_eq!(count(12, "entry", "entries"), "twelve entries");
        assert_eq!(count(13, "entry", "entries"), "13 entries");
    }
}
