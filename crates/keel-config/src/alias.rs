//! Import specifier aliasing.
//!
//! Rules are kept as an ordered list and walked once per lookup. The longest
//! matching prefix wins; equal-length matches go to the rule declared first.
//! Resolution is purely textual and never touches the filesystem.

use std::borrow::Cow;
use std::path::Path;

use path_clean::PathClean;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    find: String,
    replacement: String,
}

impl AliasRule {
    pub fn new(find: impl Into<String>, replacement: impl AsRef<Path>) -> Self {
        Self {
            find: find.into(),
            replacement: replacement.as_ref().to_string_lossy().into_owned(),
        }
    }

    pub fn find(&self) -> &str {
        &self.find
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    fn matches(&self, specifier: &str) -> bool {
        !self.find.is_empty() && specifier.starts_with(&self.find)
    }

    /// Anchor a relative replacement onto `root`.
    fn anchored(self, root: &Path) -> Self {
        let replacement = Path::new(&self.replacement);
        if replacement.is_absolute() {
            return self;
        }
        Self {
            replacement: root.join(replacement).clean().to_string_lossy().into_owned(),
            find: self.find,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    rules: Vec<AliasRule>,
}

impl AliasResolver {
    pub fn new(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    /// Build a resolver whose relative replacements are joined onto `root`.
    pub fn anchored(rules: Vec<AliasRule>, root: &Path) -> Self {
        Self {
            rules: rules.into_iter().map(|rule| rule.anchored(root)).collect(),
        }
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    /// The rule that applies to `specifier`, if any.
    pub fn matching_rule(&self, specifier: &str) -> Option<&AliasRule> {
        let mut best: Option<&AliasRule> = None;
        for rule in self.rules.iter().filter(|rule| rule.matches(specifier)) {
            // strictly longer only, so the earlier rule keeps a tie
            if best.is_none_or(|current| rule.find.len() > current.find.len()) {
                best = Some(rule);
            }
        }
        best
    }

    /// Rewrite `specifier` through the matching alias.
    ///
    /// Unmatched specifiers pass through unchanged for the bundler's default
    /// lookup.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_config::{AliasResolver, AliasRule};
    ///
    /// let resolver = AliasResolver::new(vec![AliasRule::new("@", "/proj/src")]);
    /// assert_eq!(resolver.resolve("@/App"), "/proj/src/App");
    /// assert_eq!(resolver.resolve("react"), "react");
    /// ```
    pub fn resolve<'a>(&self, specifier: &'a str) -> Cow<'a, str> {
        match self.matching_rule(specifier) {
            Some(rule) => {
                let rest = &specifier[rule.find.len()..];
                tracing::trace!(specifier, alias = %rule.find, "alias matched");
                Cow::Owned(format!("{}{}", rule.replacement, rest))
            }
            None => Cow::Borrowed(specifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn resolves_scenario_a() {
        let resolver = AliasResolver::new(vec![AliasRule::new("@", "/proj/src")]);
        assert_eq!(resolver.resolve("@/App"), "/proj/src/App");
    }

    #[test]
    fn longer_prefix_wins_regardless_of_order() {
        let resolver = AliasResolver::new(vec![
            AliasRule::new("@", "/proj/src"),
            AliasRule::new("@components", "/proj/src/components"),
        ]);
        assert_eq!(
            resolver.resolve("@components/Button"),
            "/proj/src/components/Button"
        );
        assert_eq!(resolver.resolve("@/main"), "/proj/src/main");
    }

    #[test]
    fn equal_length_prefers_first_declared() {
        let resolver = AliasResolver::new(vec![
            AliasRule::new("~", "/first"),
            AliasRule::new("~", "/second"),
        ]);
        assert_eq!(resolver.resolve("~/x"), "/first/x");
    }

    #[test]
    fn unmatched_passes_through_borrowed() {
        let resolver = AliasResolver::new(vec![AliasRule::new("@", "/proj/src")]);
        assert!(matches!(resolver.resolve("lodash/fp"), Cow::Borrowed("lodash/fp")));
    }

    #[test]
    fn does_not_check_existence() {
        let resolver = AliasResolver::new(vec![AliasRule::new("#", "/definitely/not/here")]);
        assert_eq!(resolver.resolve("#/x"), "/definitely/not/here/x");
    }

    #[test]
    fn anchors_relative_replacements() {
        let root = PathBuf::from("/proj");
        let resolver = AliasResolver::anchored(
            vec![
                AliasRule::new("@", "./src"),
                AliasRule::new("#lib", "/opt/lib"),
            ],
            &root,
        );
        assert_eq!(resolver.resolve("@/App"), "/proj/src/App");
        assert_eq!(resolver.resolve("#lib/a"), "/opt/lib/a");
    }

    #[test]
    fn empty_find_never_matches() {
        let resolver = AliasResolver::new(vec![AliasRule::new("", "/x")]);
        assert_eq!(resolver.resolve("anything"), "anything");
    }
}
