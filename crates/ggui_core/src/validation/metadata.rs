//! Commit history queries per VCS.
//!
//! Each backend runs read-only log commands and folds their output into a
//! `LogSummary`. A failing tool never aborts validation: the affected fields
//! stay empty and a warning is recorded on the `RepositoryInfo`.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;

use super::runner::CommandRunner;
use crate::models::{RepositoryInfo, VcsKind};

/// Commit facts gathered from log output.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct LogSummary {
    pub commits: u64,
    pub authors: BTreeSet<String>,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

impl LogSummary {
    fn add_author(&mut self, author: &str) {
        let author = strip_email(author);
        if !author.is_empty() && author != "(no author)" {
            self.authors.insert(author.to_string());
        }
    }

    fn add_date(&mut self, date: NaiveDate) {
        self.first = Some(self.first.map_or(date, |d| d.min(date)));
        self.last = Some(self.last.map_or(date, |d| d.max(date)));
    }

    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first?, self.last?))
    }

    /// Merge into `info`; the commit count is only set when `with_count`.
    fn apply_to(self, info: &mut RepositoryInfo, with_count: bool) {
        if with_count {
            info.commit_count = self.commits;
        }
        if let Some(range) = self.date_range() {
            info.date_range = Some(range);
        }
        info.contributors.extend(self.authors);
    }
}

/// Fill commit count, contributors and date range for `info.kind`.
pub(crate) fn collect<R: CommandRunner + ?Sized>(runner: &R, git: &str, info: &mut RepositoryInfo) {
    let path = info.path.clone();
    match info.kind {
        VcsKind::Git => collect_git(runner, git, &path, info),
        VcsKind::Mercurial => {
            if let Some(out) = query(runner, &path, "hg", &["log", "--template", HG_TEMPLATE], info) {
                parse_hg_log(&out).apply_to(info, true);
            }
        }
        VcsKind::Svn => {
            if let Some(out) = query(runner, &path, "svn", &["log", "--quiet"], info) {
                parse_svn_log(&out).apply_to(info, true);
            }
        }
        VcsKind::Bazaar => {
            if let Some(out) = query(runner, &path, "bzr", &["log", "--long"], info) {
                parse_bzr_log(&out).apply_to(info, true);
            }
        }
        VcsKind::Cvs => {
            if let Some(out) = query(runner, &path, "cvs", &["-q", "log"], info) {
                parse_cvs_log(&out).apply_to(info, true);
            }
        }
        VcsKind::Invalid => {}
    }
}

const HG_TEMPLATE: &str = "{author|person}\\t{date|shortdate}\\n";

fn collect_git<R: CommandRunner + ?Sized>(
    runner: &R,
    git: &str,
    path: &Path,
    info: &mut RepositoryInfo,
) {
    if let Some(out) = query(runner, path, git, &["rev-list", "--count", "HEAD"], info) {
        match out.trim().parse::<u64>() {
            Ok(count) => info.commit_count = count,
            Err(_) => record_warning(info, format!("unexpected commit count output: {:?}", out.trim())),
        }
    }

    if let Some(out) = query(runner, path, git, &["log", "--format=%an", "--all"], info) {
        let mut summary = LogSummary::default();
        for line in out.lines() {
            summary.add_author(line);
        }
        summary.apply_to(info, false);
    }

    if let Some(out) = query(runner, path, git, &["log", "--format=%cs", "--reverse", "--all"], info) {
        let mut summary = LogSummary::default();
        for date in out.lines().filter_map(parse_date) {
            summary.add_date(date);
        }
        summary.apply_to(info, false);
    }
}

/// Run one query, turning any failure into a warning on `info`.
fn query<R: CommandRunner + ?Sized>(
    runner: &R,
    path: &Path,
    program: &str,
    args: &[&str],
    info: &mut RepositoryInfo,
) -> Option<String> {
    match runner.run(program, args, path) {
        Ok(output) if output.success => Some(output.stdout),
        Ok(output) => {
            record_warning(
                info,
                format!("`{} {}` failed: {}", program, args.join(" "), output.error_summary()),
            );
            None
        }
        Err(e) => {
            record_warning(info, format!("could not run {}: {}", program, e));
            None
        }
    }
}

fn record_warning(info: &mut RepositoryInfo, message: String) {
    tracing::warn!("{}: {}", info.path.display(), message);
    info.warnings.push(message);
}

/// `author<TAB>date` per changeset.
pub(crate) fn parse_hg_log(output: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let (author, date) = line.split_once('\t').unwrap_or((line, ""));
        summary.commits += 1;
        summary.add_author(author);
        if let Some(date) = parse_date(date) {
            summary.add_date(date);
        }
    }
    summary
}

/// `r12 | alice | 2021-03-04 10:00:00 +0000 (Thu, 04 Mar 2021)` lines.
pub(crate) fn parse_svn_log(output: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in output.lines() {
        let fields: Vec<&str> = line.split(" | ").collect();
        if fields.len() < 3 || !is_svn_revision(fields[0]) {
            continue;
        }
        summary.commits += 1;
        summary.add_author(fields[1]);
        if let Some(date) = parse_date(fields[2]) {
            summary.add_date(date);
        }
    }
    summary
}

fn is_svn_revision(field: &str) -> bool {
    field
        .strip_prefix('r')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// `revno:` / `committer:` / `timestamp:` blocks, merged revisions included.
pub(crate) fn parse_bzr_log(output: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in output.lines().map(str::trim) {
        if line.starts_with("revno:") {
            summary.commits += 1;
        } else if let Some(committer) = line.strip_prefix("committer:") {
            summary.add_author(committer);
        } else if let Some(stamp) = line.strip_prefix("timestamp:") {
            if let Some(date) = stamp.split_whitespace().find_map(parse_date) {
                summary.add_date(date);
            }
        }
    }
    summary
}

/// `date: 2021/03/04 10:00:00;  author: alice;  state: Exp;` lines.
pub(crate) fn parse_cvs_log(output: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in output.lines().map(str::trim) {
        if !line.starts_with("date:") {
            continue;
        }
        summary.commits += 1;
        for field in line.split(';').map(str::trim) {
            if let Some(date) = field.strip_prefix("date:") {
                if let Some(date) = parse_date(date) {
                    summary.add_date(date);
                }
            } else if let Some(author) = field.strip_prefix("author:") {
                summary.add_author(author);
            }
        }
    }
    summary
}

/// Parse the leading `YYYY-MM-DD` or `YYYY/MM/DD` of `text`.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let token = text.split_whitespace().next()?;
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(token, "%Y/%m/%d"))
        .ok()
}

/// `Alice Smith <alice@example.com>` -> `Alice Smith`.
fn strip_email(author: &str) -> &str {
    let author = author.trim();
    match author.find('<') {
        Some(idx) if idx > 0 => author[..idx].trim_end(),
        _ => author,
    }
}
