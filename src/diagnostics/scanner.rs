//! Log scanning against the pattern table

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::pattern::{LogKind, LogSource, Pattern, Severity};

/// A log source that could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind} not found at: {}", .path.display())]
pub struct SourceUnavailable {
    pub kind: LogKind,
    pub path: PathBuf,
    pub reason: String,
}

/// Matches of one pattern in one source
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanFinding {
    pub pattern_id: String,
    pub severity: Severity,
    pub match_count: usize,
    pub sample_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Only patterns with at least one match produce a finding
    Scanned { findings: Vec<ScanFinding> },
    Unavailable(SourceUnavailable),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: LogSource,
    pub outcome: SourceOutcome,
}

/// Result of one scan invocation
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub scanned_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
}

impl ScanReport {
    /// All findings in source order
    pub fn findings(&self) -> impl Iterator<Item = &ScanFinding> {
        self.sources
            .iter()
            .filter_map(|s| match &s.outcome {
                SourceOutcome::Scanned { findings } => Some(findings),
                SourceOutcome::Unavailable(_) => None,
            })
            .flatten()
    }

    #[cfg(test)]
    pub fn finding(&self, pattern_id: &str) -> Option<&ScanFinding> {
        self.findings().find(|f| f.pattern_id == pattern_id)
    }

    /// Set when the agent log could not be read
    pub fn primary_unavailable(&self) -> Option<&SourceUnavailable> {
        self.sources.iter().find_map(|s| match &s.outcome {
            SourceOutcome::Unavailable(u) if u.kind.is_primary() => Some(u),
            _ => None,
        })
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings()
            .filter(|f| f.severity == severity)
            .map(|f| f.match_count)
            .sum()
    }
}

struct CompiledPattern {
    pattern: Pattern,
    regex: Regex,
}

/// Applies a pattern table to log sources
pub struct DiagnosticScanner {
    patterns: Vec<CompiledPattern>,
}

impl DiagnosticScanner {
    pub fn new(patterns: Vec<Pattern>) -> Result<Self, regex::Error> {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let regex = pattern.compile()?;
                Ok(CompiledPattern { pattern, regex })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new(Pattern::builtin())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().map(|c| &c.pattern)
    }

    /// Patterns applicable to a given kind of source, in table order
    pub fn patterns_for(&self, kind: LogKind) -> impl Iterator<Item = &Pattern> {
        self.patterns().filter(move |p| p.applies_to == kind)
    }

    pub fn scan(&self, sources: &[LogSource]) -> ScanReport {
        let sources = sources
            .iter()
            .map(|source| SourceReport {
                source: source.clone(),
                outcome: self.scan_source(source),
            })
            .collect();

        ScanReport {
            scanned_at: Utc::now(),
            sources,
        }
    }

    /// Scan the standard sources of a run's log directory
    pub fn scan_dir(&self, dir: &Path) -> ScanReport {
        self.scan(&LogSource::discover(dir))
    }

    fn scan_source(&self, source: &LogSource) -> SourceOutcome {
        let content = match std::fs::read(&source.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    debug!("{} absent: {}", source.kind, source.path.display());
                } else {
                    warn!("Cannot read {}: {}", source.path.display(), e);
                }
                return SourceOutcome::Unavailable(SourceUnavailable {
                    kind: source.kind,
                    path: source.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let findings = self
            .patterns
            .iter()
            .filter(|c| c.pattern.applies_to == source.kind)
            .filter_map(|c| Self::match_lines(c, &content))
            .collect::<Vec<_>>();

        debug!(
            "Scanned {}: {} finding(s)",
            source.path.display(),
            findings.len()
        );
        SourceOutcome::Scanned { findings }
    }

    fn match_lines(compiled: &CompiledPattern, content: &str) -> Option<ScanFinding> {
        let pattern = &compiled.pattern;
        let mut match_count = 0;
        let mut sample_lines = Vec::new();

        for line in content.lines().filter(|l| compiled.regex.is_match(l)) {
            match_count += 1;
            if sample_lines.len() < pattern.sample_limit {
                sample_lines.push(line.to_string());
            }
        }

        (match_count > 0).then(|| ScanFinding {
            pattern_id: pattern.id.clone(),
            severity: pattern.severity,
            match_count,
            sample_lines,
            advisory: pattern.advisory.clone(),
        })
    }
}
