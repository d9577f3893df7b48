use std::sync::Arc;

use crate::{ExclusionRule, FilterError};

/// Compiled, immutable list of exclusion rules.
///
/// A `ExclusionSet` is built once per run from the user's ordered patterns
/// and consulted for every local and remote entry. Evaluation is
/// first-match-wins; the winning rule is returned so callers can report the
/// pattern responsible for a skip.
///
/// `ExclusionSet` is cheaply cloneable (the rules live behind an [`Arc`]).
///
/// # Examples
///
/// ```
/// use filters::ExclusionSet;
///
/// let set = ExclusionSet::compile(["*.tmp", "tmp*"]).unwrap();
///
/// // first-match-wins: "*.tmp" is declared first
/// assert_eq!(set.matches("tmp1.tmp").unwrap().pattern(), "*.tmp");
/// assert_eq!(set.matches("tmp1.txt").unwrap().pattern(), "tmp*");
/// assert!(set.matches("notes.txt").is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExclusionSet {
    rules: Arc<[ExclusionRule]>,
}

impl ExclusionSet {
    /// Compiles `patterns` in iteration order.
    ///
    /// # Errors
    ///
    /// Fails fast with the first [`FilterError`]; no partially compiled set is
    /// returned.
    pub fn compile<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = patterns
            .into_iter()
            .map(ExclusionRule::new)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(target: "ftpush::filter", rules = rules.len(), "compiled exclusion rules");

        Ok(Self {
            rules: rules.into(),
        })
    }

    /// Returns the first rule matching `relative_path`, if any.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> Option<&ExclusionRule> {
        let rule = self.rules.iter().find(|rule| rule.is_match(relative_path));
        if let Some(rule) = rule {
            tracing::trace!(
                target: "ftpush::filter",
                path = relative_path,
                pattern = rule.pattern(),
                "path excluded"
            );
        }
        rule
    }

    /// Returns `true` when any rule matches `relative_path`.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.matches(relative_path).is_some()
    }

    /// Returns the compiled rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// Returns `true` if the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
