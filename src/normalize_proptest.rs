//! Property-based tests for the normalizer and the patch engine.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::manifest::{PatchKind, PatchRule};
    use crate::normalize::{normalize, Language, NormalizeOptions};
    use crate::patch::{apply_to, remove_from};
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn language() -> impl Strategy<Value = Language> {
        prop_oneof![
            Just(Language::Python),
            Just(Language::C),
            Just(Language::Plain),
        ]
    }

    fn rule(kind: PatchKind) -> PatchRule {
        let (payload, marker) = match kind {
            PatchKind::InsertAfter => ("src-y += extra.c\nsrc-y += more.c", "@@graft-marker@@"),
            PatchKind::Replace => ("call_new() #@@graft-marker@@", "@@graft-marker@@"),
        };
        PatchRule {
            name: "prop-rule".to_string(),
            target: PathBuf::from("target.txt"),
            anchor: "ANCHOR".to_string(),
            payload: payload.to_string(),
            marker: marker.to_string(),
            kind,
            optional: false,
            comment: "#".to_string(),
        }
    }

    // ============================================================================
    // normalize property tests
    // ============================================================================

    proptest! {
        /// Property: normalization never adds, drops, or reorders visible characters
        #[test]
        fn normalize_preserves_non_whitespace(input in "[ -~\t\r\n]{0,400}", lang in language()) {
            let output = normalize(&input, lang, &NormalizeOptions::default());
            prop_assert_eq!(squash(&output), squash(&input));
        }

        /// Property: output has no trailing whitespace and no CR characters
        #[test]
        fn normalize_output_is_clean(input in "[ -~\t\r\n]{0,400}", lang in language()) {
            let output = normalize(&input, lang, &NormalizeOptions::default());
            prop_assert!(!output.contains('\r'));
            for line in output.lines() {
                prop_assert_eq!(line, line.trim_end());
            }
            prop_assert!(output.is_empty() || (output.ends_with('\n') && !output.ends_with("\n\n")));
        }

        /// Property: whitespace-only cleanup is idempotent
        #[test]
        fn normalize_plain_is_idempotent(input in "[ -~\t\r\n]{0,400}") {
            let options = NormalizeOptions::default();
            let once = normalize(&input, Language::Plain, &options);
            prop_assert_eq!(normalize(&once, Language::Plain, &options), once.clone());
        }

        /// Property: normalize is deterministic (same input = same output)
        #[test]
        fn normalize_is_deterministic(input in "[ -~\t\r\n]{0,400}", lang in language()) {
            let options = NormalizeOptions::default();
            prop_assert_eq!(normalize(&input, lang, &options), normalize(&input, lang, &options));
        }
    }

    // ============================================================================
    // patch round-trip property tests
    // ============================================================================

    proptest! {
        /// Property: apply then remove restores the original bytes
        #[test]
        fn patch_round_trip(
            before in "[a-z \n\r]{0,80}",
            after in "[a-z \n\r]{0,80}",
            replace in any::<bool>(),
        ) {
            let kind = if replace { PatchKind::Replace } else { PatchKind::InsertAfter };
            let rule = rule(kind);
            let original = format!("{before}ANCHOR{after}");

            let patched = apply_to(&original, &rule).unwrap();
            prop_assert_eq!(patched.matches(rule.marker.as_str()).count(), 1);

            let restored = remove_from(&patched, &rule, &rule.target).unwrap();
            prop_assert_eq!(restored, original);
        }
    }
}
