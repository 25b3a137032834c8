use std::io::{self, IsTerminal};

use crate::app::{InsertionReport, RepairReport, SeedReport};
use crate::reconcile::{Conflict, Edit};
use crate::validate::{Defect, ValidationReport};

pub fn print_validation(report: &ValidationReport) {
    print!("{}", format_validation(report, &Palette::auto()));
}

pub fn print_repair(report: &RepairReport) {
    print!("{}", format_repair(report, &Palette::auto()));
}

pub fn print_insertion(report: &InsertionReport) {
    print!("{}", format_insertion(report, &Palette::auto()));
}

pub fn print_seed(report: &SeedReport) {
    print!("{}", format_seed(report, &Palette::auto()));
}

fn format_validation(report: &ValidationReport, palette: &Palette) -> String {
    let mut out = String::new();
    push_line(&mut out, palette.heading("Series"));
    if report.series.is_empty() {
        push_line(&mut out, palette.dim("no series found"));
    }
    for series in &report.series {
        let status = if series.defects.is_empty() {
            palette.ok("[OK]")
        } else {
            palette.bad(&format!("[{} DEFECT(S)]", series.defects.len()))
        };
        push_line(
            &mut out,
            format!(
                "{} {} {}",
                palette.name(&series.name),
                status,
                palette.dim(&format!("{} of {} part(s)", series.members.len(), series.total))
            ),
        );
        for defect in &series.defects {
            push_line(&mut out, format!("  {}", format_defect(defect, palette)));
        }
    }
    push_warnings(&mut out, report, palette);
    push_line(
        &mut out,
        palette.dim(&format!(
            "{} guide(s), {} series, {} defect(s)",
            report.documents_scanned,
            report.series.len(),
            report.defect_count()
        )),
    );
    out
}

fn push_warnings(out: &mut String, report: &ValidationReport, palette: &Palette) {
    for issue in &report.load_issues {
        push_line(
            out,
            format!("{} {}: {}", palette.warn("warning"), issue.path, issue.message),
        );
    }
    for issue in &report.parse_issues {
        push_line(
            out,
            format!("{} {}: {}", palette.warn("warning"), issue.id, issue.message),
        );
    }
}

fn format_defect(defect: &Defect, palette: &Palette) -> String {
    format!("{} {}", palette.kind(defect.kind().as_str()), defect.describe())
}

fn format_edit(edit: &Edit, palette: &Palette) -> String {
    let change = match (&edit.old_value, &edit.new_value) {
        (_, None) => "removed".to_string(),
        (None, Some(new)) => format!("= \"{new}\""),
        (Some(old), Some(new)) => format!("\"{old}\" -> \"{new}\""),
    };
    format!("{}.{} {}", palette.id(&edit.document_id), edit.field, change)
}

fn format_conflict(conflict: &Conflict, palette: &Palette) -> String {
    format!(
        "{} {}.{}: {}",
        palette.bad("conflict"),
        palette.id(&conflict.document_id),
        conflict.field,
        conflict.detail
    )
}

fn written_summary(dry_run: bool, written: &[String]) -> String {
    if dry_run {
        "dry run, nothing written".to_string()
    } else {
        format!("{} file(s) written", written.len())
    }
}

fn format_repair(report: &RepairReport, palette: &Palette) -> String {
    let mut out = String::new();
    push_line(&mut out, palette.heading("Repair"));
    for edit in &report.edits {
        push_line(&mut out, format!("  {}", format_edit(edit, palette)));
    }
    for conflict in &report.conflicts {
        push_line(&mut out, format!("  {}", format_conflict(conflict, palette)));
    }
    for defect in report.remaining.defects() {
        push_line(
            &mut out,
            format!(
                "  {} {} in \"{}\"",
                palette.warn("unresolved"),
                format_defect(defect, palette),
                defect.series()
            ),
        );
    }
    if !report.converged {
        push_line(
            &mut out,
            palette.warn(&format!("stopped after {} pass(es) without settling", report.passes)),
        );
    }
    push_warnings(&mut out, &report.remaining, palette);
    push_line(
        &mut out,
        palette.dim(&format!(
            "{} fixed, {} skipped, {} conflicted, {} unresolved; {}",
            report.edits.len(),
            report.skipped.len(),
            report.conflicts.len(),
            report.remaining.defect_count(),
            written_summary(report.dry_run, &report.written)
        )),
    );
    out
}

fn format_insertion(report: &InsertionReport, palette: &Palette) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{} {}", palette.heading("Insert navigation"), palette.id(&report.id)),
    );
    if report.edits.is_empty() && report.conflicts.is_empty() {
        push_line(&mut out, palette.dim("neighbors already link to this guide"));
    }
    for edit in &report.edits {
        push_line(&mut out, format!("  {}", format_edit(edit, palette)));
    }
    for conflict in &report.conflicts {
        push_line(&mut out, format!("  {}", format_conflict(conflict, palette)));
    }
    push_line(
        &mut out,
        palette.dim(&format!(
            "{} edit(s), {} conflict(s); {}",
            report.edits.len(),
            report.conflicts.len(),
            written_summary(report.dry_run, &report.written)
        )),
    );
    out
}

fn format_seed(report: &SeedReport, palette: &Palette) -> String {
    let mut out = String::new();
    push_line(&mut out, palette.heading("Seed"));
    for seeded in &report.seeded {
        push_line(
            &mut out,
            format!(
                "  {} {} (part {}/{})",
                palette.id(&seeded.id),
                palette.name(&seeded.series),
                seeded.part,
                seeded.total
            ),
        );
    }
    for title in &report.not_found {
        push_line(&mut out, format!("  {} {}", palette.warn("not found"), title));
    }
    for id in &report.unparsed {
        push_line(
            &mut out,
            format!("  {} {}: no metadata block", palette.warn("skipped"), id),
        );
    }
    push_line(
        &mut out,
        palette.dim(&format!(
            "{} seeded, {} already present, {} not found, {} unparsed; {}",
            report.seeded.len(),
            report.already_present.len(),
            report.not_found.len(),
            report.unparsed.len(),
            written_summary(report.dry_run, &report.written)
        )),
    );
    out
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn name(&self, text: &str) -> String {
        self.paint("1", text)
    }

    fn kind(&self, text: &str) -> String {
        self.paint(kind_color_code(text), &format!("[{}]", text.to_ascii_uppercase()))
    }

    fn ok(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn bad(&self, text: &str) -> String {
        self.paint("31", text)
    }
}

fn kind_color_code(kind: &str) -> &'static str {
    match kind {
        "duplicate_part" | "part_out_of_range" => "31",
        "dangling_reference" => "35",
        "asymmetric_link" => "33",
        "missing_previous" | "missing_next" => "36",
        _ => "37",
    }
}

#[cfg(test)]
#[path = "ui_tests_ext.rs"]
mod tests_ext;
