use std::borrow::Cow;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::FilterError;

/// A single compiled exclusion pattern.
///
/// The rule remembers the pattern exactly as supplied so skip events can name
/// it, and matches root-relative paths through a [`GlobSet`] that covers the
/// entry itself together with its whole subtree.
#[derive(Clone, Debug)]
pub struct ExclusionRule {
    pattern: String,
    anchored: bool,
    matcher: GlobSet,
}

impl ExclusionRule {
    /// Compiles `pattern` into a rule.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Empty`] when nothing but separators remain and
    /// [`FilterError::Glob`] when the expanded expression is not a valid glob.
    pub fn new(pattern: impl Into<String>) -> Result<Self, FilterError> {
        let pattern = pattern.into();
        let (anchored, body) = {
            let normalized = normalize_separators(&pattern);
            let trimmed = normalized.trim_end_matches('/');
            match trimmed.strip_prefix('/') {
                Some(rest) => (true, rest.trim_start_matches('/').to_owned()),
                None => (false, trimmed.to_owned()),
            }
        };

        if body.is_empty() {
            return Err(FilterError::Empty { pattern });
        }

        let rooted = if anchored || body == "**" || body.starts_with("**/") {
            body
        } else {
            format!("**/{body}")
        };
        let mut expressions = vec![rooted.clone()];
        if !rooted.ends_with("/**") && rooted != "**" {
            expressions.push(format!("{rooted}/**"));
        }

        let mut builder = GlobSetBuilder::new();
        for expression in &expressions {
            let glob = GlobBuilder::new(expression)
                .literal_separator(true)
                .case_insensitive(true)
                .backslash_escape(false)
                .build()
                .map_err(|source| FilterError::Glob {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let matcher = builder.build().map_err(|source| FilterError::Glob {
            pattern: pattern.clone(),
            source,
        })?;

        Ok(Self {
            pattern,
            anchored,
            matcher,
        })
    }

    /// Returns the pattern text as supplied by the user.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Reports whether the pattern is anchored to the synchronization root.
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Returns `true` when `relative_path` or one of its ancestors matches.
    ///
    /// Separators are normalised and leading separators ignored, so
    /// `\site\a.txt`, `/site/a.txt` and `site/a.txt` are equivalent.
    #[must_use]
    pub fn is_match(&self, relative_path: &str) -> bool {
        let normalized = normalize_separators(relative_path);
        let candidate = normalized.trim_start_matches('/');
        !candidate.is_empty() && self.matcher.is_match(candidate)
    }
}

/// Rewrites every `\` into `/`, borrowing when no rewrite is needed.
///
/// # Examples
///
/// ```
/// use filters::normalize_separators;
///
/// assert_eq!(normalize_separators(r"site\img\a.png"), "site/img/a.png");
/// assert_eq!(normalize_separators("site/img"), "site/img");
/// ```
#[must_use]
pub fn normalize_separators(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanchored_rule_matches_segment_runs_at_any_depth() {
        let rule = ExclusionRule::new("build/out").unwrap();
        assert!(!rule.is_anchored());
        assert!(rule.is_match("build/out"));
        assert!(rule.is_match("crate/build/out"));
        assert!(rule.is_match("crate/build/out/bin/tool"));
        assert!(!rule.is_match("crate/build/output"));
        assert!(!rule.is_match("rebuild/out"));
    }

    #[test]
    fn anchored_rule_matches_only_from_root() {
        let rule = ExclusionRule::new("/cache").unwrap();
        assert!(rule.is_anchored());
        assert!(rule.is_match("cache"));
        assert!(rule.is_match("cache/a/b"));
        assert!(!rule.is_match("web/cache"));
    }

    #[test]
    fn trailing_separator_is_ignored() {
        let rule = ExclusionRule::new("logs/").unwrap();
        assert!(rule.is_match("logs"));
        assert!(rule.is_match("app/logs/today.txt"));
        assert_eq!(rule.pattern(), "logs/");
    }

    #[test]
    fn backslash_pattern_is_a_separator() {
        let rule = ExclusionRule::new(r"assets\raw").unwrap();
        assert!(rule.is_match("assets/raw/a.psd"));
        assert!(rule.is_match(r"site\assets\raw"));
    }

    #[test]
    fn empty_root_path_never_matches() {
        let rule = ExclusionRule::new("*").unwrap();
        assert!(!rule.is_match(""));
        assert!(!rule.is_match("/"));
        assert!(rule.is_match("anything"));
    }

    #[test]
    fn separator_only_pattern_is_rejected() {
        for pattern in ["", "/", "//", r"\"] {
            let error = ExclusionRule::new(pattern).unwrap_err();
            assert!(matches!(error, FilterError::Empty { .. }), "{pattern:?}");
            assert_eq!(error.pattern(), pattern);
        }
    }

    #[test]
    fn normalize_borrows_when_clean() {
        assert!(matches!(normalize_separators("a/b"), Cow::Borrowed(_)));
        assert!(matches!(normalize_separators(r"a\b"), Cow::Owned(_)));
    }
}
