//! Run reports.
//!
//! A report is rebuilt entirely from the rows stored for one run id, so a
//! past run can be re-rendered at any time. Three views share the same
//! rows:
//!
//! - partner-level summary, bucketed by partner status (empty buckets are
//!   left out);
//! - detailed file report, one line per evaluated file;
//! - exceptions-only file report, the detailed report minus unchanged files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::models::{FileRunStatus, FileStatus, PartnerRunStatus, PartnerStatus, Run, RunId};
use crate::registry::PartnerRegistry;
use crate::store::Store;

const RULE: &str = "--------------------";

/// Which file rows a file report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Every evaluated file.
    Full,
    /// Everything except files with an unchanged header.
    ExceptionsOnly,
}

impl Detail {
    fn includes(self, status: &FileStatus) -> bool {
        match self {
            Detail::Full => true,
            Detail::ExceptionsOnly => status.is_exception(),
        }
    }
}

/// All stored rows of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: Run,
    pub partners: Vec<PartnerRunStatus>,
    pub files: Vec<FileRunStatus>,
}

/// Load the rows of `run_id` from the store.
pub async fn load_run_report(store: &dyn Store, run_id: RunId) -> Result<RunReport> {
    let run = store
        .run(run_id)
        .await?
        .with_context(|| format!("Run {} not found", run_id))?;
    let partners = store.partner_statuses(run_id).await?;
    let files = store.file_statuses(run_id).await?;
    debug!(run_id, partners = partners.len(), files = files.len(), "loaded run rows");
    Ok(RunReport {
        run,
        partners,
        files,
    })
}

impl RunReport {
    /// Partner names grouped under their status, in status-code order.
    pub fn partner_summary(&self, registry: &PartnerRegistry) -> String {
        let mut out = String::from("Partner-level summaries\n-----------------------\n\n");
        for status in PartnerStatus::ALL {
            let names: Vec<String> = self
                .partners
                .iter()
                .filter(|p| p.status == status)
                .map(|p| registry.display_name(p.partner_id))
                .collect();
            if names.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}\n{}", status.description(), RULE);
            for name in names {
                let _ = writeln!(out, "{}", name);
            }
            out.push('\n');
        }
        out
    }

    /// Per-partner file lines for partners that had new files. Partners
    /// with nothing to show under `detail` are left out.
    pub fn file_report(&self, registry: &PartnerRegistry, detail: Detail) -> String {
        let mut out = String::new();
        let with_files = self
            .partners
            .iter()
            .filter(|p| p.status == PartnerStatus::HasNewFiles);

        for partner in with_files {
            let lines: Vec<String> = self
                .files
                .iter()
                .filter(|f| f.partner_id == partner.partner_id && detail.includes(&f.status))
                .map(file_status_line)
                .collect();
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}", registry.display_name(partner.partner_id));
            let _ = writeln!(out, "-----------------------");
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
            out.push('\n');
        }
        out
    }

    /// The full report: title, exceptions, partner summary, details.
    pub fn render(&self, registry: &PartnerRegistry, title: &str) -> String {
        let started = self.run.started_at.with_timezone(&Local);
        let mut out = format!(
            "{} for {} (run {})\n\n\n",
            title,
            started.format("%Y-%m-%d %H:%M:%S"),
            self.run.id
        );

        let _ = writeln!(out, " :: Exceptions ::\n{}", RULE);
        let exceptions = self.file_report(registry, Detail::ExceptionsOnly);
        if exceptions.is_empty() {
            out.push_str("None noted.\n\n");
        } else {
            out.push_str(&exceptions);
        }

        out.push_str("\n\n");
        out.push_str(&self.partner_summary(registry));

        let _ = write!(out, "\n\nDetailed report\n{}\n\n", RULE);
        out.push_str(&self.file_report(registry, Detail::Full));
        let _ = writeln!(
            out,
            "\nThis report generated by version {} of data-inbox.",
            env!("CARGO_PKG_VERSION")
        );
        out
    }
}

fn format_columns(columns: &[String]) -> String {
    format!("[{}]", columns.join(", "))
}

/// Human-readable line for one file row.
pub fn file_status_line(row: &FileRunStatus) -> String {
    let name = &row.filename;
    match &row.status {
        FileStatus::NoHeaderChange => format!("{} has no change in header. OK to process.", name),
        FileStatus::ColumnsAdded { added } => format!(
            "{} has new column(s) {}. Check before processing.",
            name,
            format_columns(added)
        ),
        FileStatus::ColumnsRemoved { removed } => format!(
            "{} is missing previously existing column(s) {}. Check before processing.",
            name,
            format_columns(removed)
        ),
        FileStatus::HeaderMissing => format!(
            "{} may be missing a header. No previous column names matched. Check before processing.",
            name
        ),
        FileStatus::UnidentifiedFiletype => format!(
            "{} is a new or unidentified filetype. Update the partner's fileset to match.",
            name
        ),
        FileStatus::ColumnsAddedAndRemoved { added, removed } => format!(
            "{} has missing column(s) {} and new column(s) {}. Check before processing.",
            name,
            format_columns(removed),
            format_columns(added)
        ),
        FileStatus::NoPriorFileset => format!(
            "{}: No previous fileset stored for partner. Header(s) have not been checked.",
            name
        ),
    }
}

/// `YYYYMMDD_report.txt`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("{}_report.txt", date.format("%Y%m%d"))
}

/// Write the report into `dir`, replacing a report from earlier the same day.
pub fn write_report(dir: &Path, date: NaiveDate, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    let path = dir.join(report_file_name(date));
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Partner;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn registry() -> PartnerRegistry {
        let p = |id, full: &str| Partner {
            id,
            name: full.to_lowercase(),
            full_name: full.to_string(),
            directory: "/x".into(),
            stored_directory: None,
            enabled: true,
        };
        PartnerRegistry::new(vec![p(1, "Alpha Health"), p(2, "Beta Clinic"), p(3, "Gamma")])
    }

    fn file(partner_id: i64, name: &str, status: FileStatus) -> FileRunStatus {
        FileRunStatus {
            run_id: 4,
            partner_id,
            filename: name.into(),
            filetype_id: None,
            status,
        }
    }

    fn report() -> RunReport {
        let p = |partner_id, status| PartnerRunStatus {
            run_id: 4,
            partner_id,
            status,
        };
        RunReport {
            run: Run {
                id: 4,
                started_at: Utc::now(),
            },
            partners: vec![
                p(1, PartnerStatus::HasNewFiles),
                p(2, PartnerStatus::DirectoryNotFound),
                p(3, PartnerStatus::HasNewFiles),
            ],
            files: vec![
                file(1, "LABS_02.csv", FileStatus::NoHeaderChange),
                file(
                    1,
                    "DX_02.csv",
                    FileStatus::ColumnsAdded {
                        added: vec!["units".into(), "flag".into()],
                    },
                ),
                file(3, "VITAL.csv", FileStatus::NoHeaderChange),
            ],
        }
    }

    #[test]
    fn test_partner_summary_omits_empty_buckets() {
        let summary = report().partner_summary(&registry());
        assert_eq!(
            summary,
            "Partner-level summaries\n-----------------------\n\n\
             Directory not found\n--------------------\nBeta Clinic\n\n\
             New data\n--------------------\nAlpha Health\nGamma\n\n"
        );
        assert!(!summary.contains("No new data"));
        assert!(!summary.contains("Not checked"));
    }

    #[test]
    fn test_detailed_vs_exceptions() {
        let r = report();
        let reg = registry();
        let full = r.file_report(&reg, Detail::Full);
        assert!(full.contains("LABS_02.csv has no change in header"));
        assert!(full.contains("Gamma"));

        let exceptions = r.file_report(&reg, Detail::ExceptionsOnly);
        assert_eq!(
            exceptions,
            "Alpha Health\n-----------------------\n\
             DX_02.csv has new column(s) [units, flag]. Check before processing.\n\n"
        );
    }

    #[test]
    fn test_status_lines_interpolate_columns() {
        let line = file_status_line(&file(
            1,
            "LABS.csv",
            FileStatus::ColumnsAddedAndRemoved {
                added: vec!["units".into()],
                removed: vec!["date".into()],
            },
        ));
        assert_eq!(
            line,
            "LABS.csv has missing column(s) [date] and new column(s) [units]. Check before processing."
        );
        let line = file_status_line(&file(1, "X.csv", FileStatus::NoPriorFileset));
        assert!(line.contains("Header(s) have not been checked"));
    }

    #[test]
    fn test_render_sections_in_order() {
        let text = report().render(&registry(), "Partner file check");
        let exc = text.find(":: Exceptions ::").unwrap();
        let summary = text.find("Partner-level summaries").unwrap();
        let detail = text.find("Detailed report").unwrap();
        assert!(text.starts_with("Partner file check for "));
        assert!(text.contains("(run 4)"));
        assert!(exc < summary && summary < detail);
        assert!(text.trim_end().ends_with("of data-inbox."));
    }

    #[test]
    fn test_render_without_exceptions() {
        let mut r = report();
        r.files.retain(|f| !f.status.is_exception());
        assert!(r.render(&registry(), "t").contains("None noted."));
    }

    #[test]
    fn test_write_report_dated_name() {
        let tmp = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 2, 15).unwrap();
        let path = write_report(&tmp.path().join("reports"), date, "body").unwrap();
        assert!(path.ends_with("20230215_report.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "body");
    }
}
