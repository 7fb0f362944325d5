// src/detection/process_matcher.rs

//! Process-signature matching
//!
//! Tests a recipe's `processMatch` regular expressions against the
//! command lines of running processes. Walking the OS process table is
//! comparatively expensive, so the snapshot is loaded once per run and
//! reused. The orchestrator's own `install` invocation is excluded so a
//! recipe can never match the installer process running it.

use crate::discovery::{DiscoveryManifest, ProcessInfo};
use crate::recipe::Recipe;
use regex::Regex;
use std::cell::OnceCell;
use tracing::{debug, trace};

/// Command-line pattern identifying this CLI's own install invocation.
const SELF_INVOCATION_PATTERN: &str = r"outfitter(\.exe)?\s+(.*\s)?install";

/// A process that matched one of a recipe's patterns.
#[derive(Debug, Clone)]
pub struct MatchedProcess {
    pub pattern: String,
    pub recipe_name: String,
    pub process: ProcessInfo,
}

type ProcessProvider = Box<dyn Fn() -> Vec<ProcessInfo>>;

pub struct ProcessMatcher {
    provider: ProcessProvider,
    snapshot: OnceCell<Vec<ProcessInfo>>,
    self_invocation: Regex,
}

impl ProcessMatcher {
    pub fn new(provider: impl Fn() -> Vec<ProcessInfo> + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            snapshot: OnceCell::new(),
            self_invocation: Regex::new(SELF_INVOCATION_PATTERN)
                .expect("valid self-invocation pattern"),
        }
    }

    /// Matcher over the process snapshot already captured in a manifest.
    pub fn from_manifest(manifest: &DiscoveryManifest) -> Self {
        let processes = manifest.processes.clone();
        Self::new(move || processes.clone())
    }

    /// The memoized process snapshot. The first call pays for process
    /// enumeration; subsequent calls reuse it.
    pub fn processes(&self) -> &[ProcessInfo] {
        self.snapshot.get_or_init(|| {
            let processes = (self.provider)();
            debug!("captured {} running processes", processes.len());
            processes
        })
    }

    /// Match the recipe's patterns against the cached snapshot.
    pub fn matches_for(&self, recipe: &Recipe) -> Vec<MatchedProcess> {
        self.find_matches(self.processes(), recipe)
    }

    /// Match the recipe's patterns against an explicit process list.
    ///
    /// Every process is examined; for one process the first pattern that
    /// matches wins and the remaining patterns are skipped.
    pub fn find_matches(
        &self,
        processes: &[ProcessInfo],
        recipe: &Recipe,
    ) -> Vec<MatchedProcess> {
        let mut matches = Vec::new();

        for process in processes {
            if self.self_invocation.is_match(&process.command) {
                trace!(pid = process.pid, "skipping installer's own process");
                continue;
            }

            for pattern in &recipe.process_match {
                let regex = match Regex::new(pattern) {
                    Ok(regex) => regex,
                    Err(e) => {
                        debug!(
                            pattern = %pattern,
                            recipe = %recipe.name,
                            "could not compile process match pattern: {}", e
                        );
                        continue;
                    }
                };

                if regex.is_match(&process.command) {
                    trace!(
                        pattern = %pattern,
                        command = %process.command,
                        recipe = %recipe.name,
                        "process matched"
                    );
                    matches.push(MatchedProcess {
                        pattern: pattern.clone(),
                        recipe_name: recipe.name.clone(),
                        process: process.clone(),
                    });
                    break;
                }
            }
        }

        if !matches.is_empty() {
            debug!(
                recipe = %recipe.name,
                count = matches.len(),
                "finished matching recipe against running processes"
            );
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn process(pid: u32, command: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: command.split('/').next_back().unwrap_or("").to_string(),
            command: command.to_string(),
        }
    }

    fn recipe_matching(patterns: &[&str]) -> Recipe {
        Recipe {
            name: "test-recipe".to_string(),
            process_match: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_match() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![process(10, "/usr/sbin/nginx -g daemon off;")];
        let matches = matcher.find_matches(&processes, &recipe_matching(&["nginx"]));

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "nginx");
        assert_eq!(matches[0].process.pid, 10);
    }

    #[test]
    fn test_no_match_for_unrelated_process() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![process(10, "/usr/bin/postgres -D /data")];
        let matches = matcher.find_matches(&processes, &recipe_matching(&["mysqld"]));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_first_matching_pattern_wins_per_process() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![process(10, "/usr/sbin/mysqld --port=3306")];
        let matches =
            matcher.find_matches(&processes, &recipe_matching(&["mysqld", "mysql"]));

        // One match per process even though both patterns apply
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "mysqld");
    }

    #[test]
    fn test_all_processes_are_examined() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![
            process(10, "/usr/sbin/mysqld --port=3306"),
            process(11, "/usr/sbin/mysqld --port=3307"),
        ];
        let matches = matcher.find_matches(&processes, &recipe_matching(&["mysqld"]));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_installer_self_invocation_is_excluded() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![process(10, "/usr/local/bin/outfitter install --recipe mysql")];
        let matches = matcher.find_matches(&processes, &recipe_matching(&["mysql"]));
        assert!(matches.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let matcher = ProcessMatcher::new(Vec::new);
        let processes = vec![process(10, "/usr/sbin/mysqld")];
        let matches =
            matcher.find_matches(&processes, &recipe_matching(&["[unclosed", "mysqld"]));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "mysqld");
    }

    #[test]
    fn test_process_snapshot_is_memoized() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let matcher = ProcessMatcher::new(move || {
            counter.set(counter.get() + 1);
            vec![process(1, "/bin/sleep 100")]
        });

        matcher.processes();
        matcher.processes();
        matcher.matches_for(&recipe_matching(&["sleep"]));

        assert_eq!(calls.get(), 1);
    }
}
