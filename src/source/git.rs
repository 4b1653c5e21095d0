//! Change events from merge commits in a git repository
//!
//! A merge is a deployment signal when one of the tags pointing at it
//! matches the configured pattern (e.g. `build-*`); untagged merges are
//! failures.

use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::retry::ExponentialBackoff;
use super::{ensure_chronological, EventSource, LeadTimeResolver};
use crate::classifier::TagMatcher;
use crate::error::{ReportError, Result};
use crate::model::ChangeEvent;

const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S +0000";

/// Run `git -C <repo> <args>` and return trimmed stdout
fn run_git(repo: &Path, args: &[String]) -> std::result::Result<String, String> {
    log::debug!("Running git command: git -C {} {}", repo.display(), args.join(" "));

    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|e| format!("failed to run git: {}", e))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        return Err(format!("git {} exited with {}: {}", args.join(" "), output.status, stderr.trim()));
    }
    if !stderr.trim().is_empty() {
        log::warn!("git stderr: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    s.trim().parse::<i64>().ok().and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// One line of `git log --pretty=format:%H|%ct|%s`
#[derive(Debug, Clone, PartialEq)]
pub struct MergeLine {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
}

impl MergeLine {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, '|');
        let hash = parts.next()?.trim();
        let timestamp = parse_epoch(parts.next()?)?;
        let subject = parts.next().unwrap_or_default();

        if hash.is_empty() {
            return None;
        }

        Some(Self {
            hash: hash.to_string(),
            timestamp,
            subject: subject.to_string(),
        })
    }
}

pub struct GitMergeSource {
    repo: PathBuf,
    branch: Option<String>,
    tags: TagMatcher,
    backoff: RefCell<ExponentialBackoff>,
}

impl GitMergeSource {
    pub fn new(repo: impl Into<PathBuf>, tags: TagMatcher) -> Self {
        Self {
            repo: repo.into(),
            branch: None,
            tags,
            backoff: RefCell::new(ExponentialBackoff::default()),
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = RefCell::new(backoff);
        self
    }

    /// Run git, retrying transient failures before giving up
    fn git(&self, args: &[String]) -> Result<String> {
        self.backoff
            .borrow_mut()
            .retry(|| run_git(&self.repo, args))
            .map_err(ReportError::upstream)
    }

    fn log_args(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<String> {
        let mut cmd = args(&["log", "--merges", "--pretty=format:%H|%ct|%s", "--reverse"]);
        if let Some(ref branch) = self.branch {
            cmd.push(branch.clone());
        }
        cmd.push(format!("--since={}", since.format(GIT_DATE_FORMAT)));
        cmd.push(format!("--until={}", until.format(GIT_DATE_FORMAT)));
        cmd
    }

    pub fn tags_for_commit(&self, hash: &str) -> Result<Vec<String>> {
        let out = self.git(&args(&["tag", "--points-at", hash]))?;
        let tags: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        log::debug!("Tags for {}: {:?}", hash, tags);
        Ok(tags)
    }

    pub fn merge_commits(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<MergeLine>> {
        log::debug!(
            "Getting merge commits in {} branch={:?} since={} until={} tag_pattern={}",
            self.repo.display(),
            self.branch,
            since,
            until,
            self.tags.as_str()
        );

        let out = self.git(&self.log_args(since, until))?;
        let merges: Vec<MergeLine> = out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| {
                let parsed = MergeLine::parse(line);
                if parsed.is_none() {
                    log::error!("Failed to parse git log line: {}", line);
                }
                parsed
            })
            .collect();

        log::debug!("Found {} merge commits", merges.len());
        Ok(merges)
    }
}

impl EventSource for GitMergeSource {
    fn name(&self) -> &'static str {
        "git"
    }

    fn collect_events(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<ChangeEvent>> {
        let mut events = Vec::new();
        for merge in self.merge_commits(since, until)? {
            let tags = self.tags_for_commit(&merge.hash)?;
            let signal = self.tags.signal_for(&tags);
            let matching = self.tags.filter(&tags).into_iter().cloned().collect();
            events.push(ChangeEvent::new(merge.hash, merge.timestamp, signal).with_tags(matching));
        }
        ensure_chronological(&mut events, "git log");
        Ok(events)
    }

    /// Commit time of the repository's root commit
    fn first_event_time(&self) -> Result<Option<DateTime<Utc>>> {
        let cmd = args(&["rev-list", "--max-parents=0", "--reverse", "--timestamp", "HEAD"]);
        match run_git(&self.repo, &cmd) {
            Ok(out) => Ok(out
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().next())
                .and_then(parse_epoch)),
            Err(e) => {
                log::warn!("Could not determine first commit: {}", e);
                Ok(None)
            }
        }
    }
}

/// Lead time of a merge: from the first commit on the merged branch to the
/// merge commit itself
pub struct GitLeadTimeResolver {
    repo: PathBuf,
}

impl GitLeadTimeResolver {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn commit_time(&self, rev: &str) -> Option<DateTime<Utc>> {
        match run_git(&self.repo, &args(&["show", "-s", "--format=%ct", rev])) {
            Ok(out) => parse_epoch(&out),
            Err(e) => {
                log::error!("Failed to get commit time for {}: {}", rev, e);
                None
            }
        }
    }

    /// First commit reachable from the merged branch tip but not from the
    /// first parent
    fn branch_root(&self, merge_hash: &str) -> Option<String> {
        let parents = match run_git(&self.repo, &args(&["rev-list", "--parents", "-n", "1", merge_hash])) {
            Ok(out) => out,
            Err(e) => {
                log::error!("Failed to get parents for {}: {}", merge_hash, e);
                return None;
            }
        };

        let parts: Vec<&str> = parents.split_whitespace().collect();
        if parts.len() < 3 {
            log::warn!("Merge commit {} does not have two parents", merge_hash);
            return None;
        }

        let exclude = format!("^{}", parts[1]);
        let range = args(&["rev-list", "--reverse", parts[2], exclude.as_str()]);
        match run_git(&self.repo, &range) {
            Ok(out) => out.lines().next().map(str::to_string),
            Err(e) => {
                log::error!("Failed to get root commit for branch tip {}: {}", parts[2], e);
                None
            }
        }
    }
}

impl LeadTimeResolver for GitLeadTimeResolver {
    fn resolve(&self, identifier: &str) -> Option<Duration> {
        let root = self.branch_root(identifier)?;
        let started = self.commit_time(&root)?;
        let merged = self.commit_time(identifier)?;
        Some(merged - started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_merge_line() {
        let line = "3f2a9c0d|1752310800|Merge pull request #12 from feature|with-pipe";

        let merge = MergeLine::parse(line).unwrap();
        assert_eq!(merge.hash, "3f2a9c0d");
        assert_eq!(merge.timestamp, Utc.with_ymd_and_hms(2025, 7, 12, 9, 0, 0).unwrap());
        assert_eq!(merge.subject, "Merge pull request #12 from feature|with-pipe");
    }

    #[test]
    fn test_parse_merge_line_rejects_garbage() {
        assert!(MergeLine::parse("not a log line").is_none());
        assert!(MergeLine::parse("abc|notanumber|subject").is_none());
        assert!(MergeLine::parse("|1752310800|subject").is_none());
    }

    #[test]
    fn test_log_args_include_branch_and_range() {
        let source = GitMergeSource::new("/tmp/repo", TagMatcher::new("build-*").unwrap())
            .with_branch(Some("main".to_string()));
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 2, 1, 12, 30, 0).unwrap();

        let cmd = source.log_args(since, until);

        assert_eq!(&cmd[..4], &["log", "--merges", "--pretty=format:%H|%ct|%s", "--reverse"]);
        assert_eq!(cmd[4], "main");
        assert_eq!(cmd[5], "--since=2024-01-01 00:00:00 +0000");
        assert_eq!(cmd[6], "--until=2024-02-01 12:30:00 +0000");
    }

    #[test]
    fn test_missing_repository_is_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = GitMergeSource::new(dir.path().join("nope"), TagMatcher::new("build-*").unwrap())
            .with_backoff(ExponentialBackoff::none());
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let err = source.collect_events(since, since + Duration::days(1)).unwrap_err();
        assert!(matches!(err, ReportError::UpstreamUnavailable(_)));
    }
}
