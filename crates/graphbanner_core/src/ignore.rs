//! Ignore-rule evaluation for document paths.
//!
//! # Responsibility
//! - Compile ordered ignore-pattern lines into match rules.
//! - Decide whether a document path is excluded from banner placement.
//!
//! # Invariants
//! - Rules are evaluated in order and the last matching rule wins.
//! - A leading `!` negates a rule (matching re-includes the path); the rest of the
//!   line is the pattern verbatim.
//! - Patterns containing `*` match the whole path, `*` spanning any run of characters.
//!   Other patterns match by substring containment.
//! - Empty lines and `#` comments are skipped; malformed patterns are skipped
//!   without failing the evaluation.

use log::warn;
use regex::Regex;

const COMMENT_PREFIX: char = '#';
const NEGATION_PREFIX: char = '!';
const WILDCARD: char = '*';

#[derive(Debug, Clone)]
enum PathMatcher {
    Wildcard(Regex),
    Contains(String),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Wildcard(regex) => regex.is_match(path),
            Self::Contains(needle) => path.contains(needle.as_str()),
        }
    }
}

/// One compiled ignore line.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    negated: bool,
    matcher: PathMatcher,
}

impl IgnoreRule {
    /// Parses one raw line. Returns `None` for blank, comment or malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            return None;
        }

        let (negated, pattern) = match trimmed.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if pattern.is_empty() {
            return None;
        }

        let matcher = if pattern.contains(WILDCARD) {
            match Regex::new(&wildcard_to_regex(pattern)) {
                Ok(regex) => PathMatcher::Wildcard(regex),
                Err(err) => {
                    warn!(
                        "event=ignore_compile module=ignore status=skip error_code=malformed_pattern error={}",
                        err
                    );
                    return None;
                }
            }
        } else {
            PathMatcher::Contains(pattern.to_string())
        };

        Some(Self { negated, matcher })
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Ordered, compiled ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// Compiles raw pattern lines, dropping blanks, comments and malformed lines.
    pub fn compile<S: AsRef<str>>(lines: &[S]) -> Self {
        let rules = lines
            .iter()
            .filter_map(|line| IgnoreRule::parse(line.as_ref()))
            .collect();
        Self { rules }
    }

    /// Returns whether `path` is ignored; the last matching rule decides.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.rules.iter().fold(false, |ignored, rule| {
            if rule.matches(path) {
                !rule.is_negated()
            } else {
                ignored
            }
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One-shot evaluation over raw lines.
pub fn is_ignored<S: AsRef<str>>(path: &str, lines: &[S]) -> bool {
    IgnoreRules::compile(lines).is_ignored(path)
}

fn wildcard_to_regex(pattern: &str) -> String {
    let body = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("^{body}$")
}

#[cfg(test)]
mod tests {
    use super::{is_ignored, wildcard_to_regex, IgnoreRule, IgnoreRules};

    #[test]
    fn negated_rule_after_wildcard_reincludes_path() {
        let patterns = ["Archive/*", "!Archive/keep.md"];
        assert!(!is_ignored("Archive/keep.md", &patterns));
        assert!(is_ignored("Archive/x.md", &patterns));
    }

    #[test]
    fn empty_pattern_list_never_ignores() {
        let patterns: [&str; 0] = [];
        assert!(!is_ignored("Archive/x.md", &patterns));
        assert!(!is_ignored("", &patterns));
    }

    #[test]
    fn last_matching_rule_wins_over_earlier_negation() {
        let patterns = ["!Archive/keep.md", "Archive/*"];
        assert!(is_ignored("Archive/keep.md", &patterns));
    }

    #[test]
    fn plain_pattern_matches_by_substring() {
        let rules = IgnoreRules::compile(&["templates"]);
        assert!(rules.is_ignored("meta/templates/daily.md"));
        assert!(!rules.is_ignored("meta/daily.md"));
    }

    #[test]
    fn wildcard_pattern_is_anchored_to_whole_path() {
        let rules = IgnoreRules::compile(&["*.excalidraw.md"]);
        assert!(rules.is_ignored("drawings/plan.excalidraw.md"));
        assert!(!rules.is_ignored("drawings/plan.excalidraw.md.bak"));

        let prefix = IgnoreRules::compile(&["Archive/*"]);
        assert!(!prefix.is_ignored("Old/Archive/x.md"));
    }

    #[test]
    fn wildcard_escapes_regex_metacharacters() {
        assert_eq!(wildcard_to_regex("a.b/*"), r"^a\.b/.*$");
        let rules = IgnoreRules::compile(&["(draft)*"]);
        assert!(rules.is_ignored("(draft) plan.md"));
        assert!(!rules.is_ignored("draft plan.md"));
    }

    #[test]
    fn skips_blank_comment_and_bare_negation_lines() {
        let rules = IgnoreRules::compile(&["", "   ", "# Archive/*", "!", "  journal  "]);
        assert_eq!(rules.len(), 1);
        assert!(rules.is_ignored("journal/2024-01-01.md"));
        assert!(!rules.is_ignored("Archive/x.md"));
    }

    #[test]
    fn parse_trims_and_detects_negation() {
        let rule = IgnoreRule::parse("  !Archive/keep.md ").expect("rule should parse");
        assert!(rule.is_negated());
        assert!(rule.matches("Archive/keep.md"));
        assert!(IgnoreRule::parse("#comment").is_none());
    }

    #[test]
    fn negation_keeps_the_rest_of_the_line_verbatim() {
        let patterns = ["Archive", "! keep.md"];
        assert!(is_ignored("Archive/keep.md", &patterns));
        assert!(!is_ignored("Archive/ keep.md", &patterns));
    }
}
