//! Property-based tests for alias precedence.

use keel_config::{AliasResolver, AliasRule};
use proptest::prelude::*;

fn find_strategy() -> impl Strategy<Value = String> {
    "[@~#][a-z]{0,6}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The applied rule is always a longest matching prefix.
    #[test]
    fn longest_prefix_always_wins(
        finds in prop::collection::vec(find_strategy(), 1..8),
        tail in "[a-z/]{0,10}",
        pick in any::<prop::sample::Index>(),
    ) {
        let rules: Vec<_> = finds
            .iter()
            .enumerate()
            .map(|(i, find)| AliasRule::new(find.clone(), format!("/r{i}")))
            .collect();
        let resolver = AliasResolver::new(rules);

        let specifier = format!("{}{}", pick.get(&finds), tail);
        let rule = resolver.matching_rule(&specifier).expect("picked prefix matches");

        let longest = finds
            .iter()
            .filter(|find| specifier.starts_with(find.as_str()))
            .map(String::len)
            .max()
            .unwrap_or(0);
        prop_assert_eq!(rule.find().len(), longest);
    }

    /// Among equal-length matches, the earliest declaration wins.
    #[test]
    fn ties_go_to_first_declared(
        find in find_strategy(),
        copies in 2usize..5,
        tail in "[a-z/]{0,10}",
    ) {
        let rules: Vec<_> = (0..copies)
            .map(|i| AliasRule::new(find.clone(), format!("/r{i}")))
            .collect();
        let resolver = AliasResolver::new(rules);

        let specifier = format!("{find}{tail}");
        prop_assert_eq!(resolver.resolve(&specifier).into_owned(), format!("/r0{tail}"));
    }

    /// Specifiers no rule matches pass through unchanged.
    #[test]
    fn unmatched_is_identity(
        finds in prop::collection::vec(find_strategy(), 0..6),
        specifier in "[a-z][a-z/]{0,12}",
    ) {
        let rules: Vec<_> = finds.iter().map(|find| AliasRule::new(find.clone(), "/x")).collect();
        let resolver = AliasResolver::new(rules);
        prop_assert_eq!(resolver.resolve(&specifier).into_owned(), specifier);
    }
}
