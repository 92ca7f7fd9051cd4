//! Compound parameter names.
//!
//! A name may carry its output key in front of an arrow:
//! `"user_name->n"` reads the input entry `n` and emits it as `user_name`.

const ARROW: &str = "->";

/// Split a compound name into `(output key override, canonical name)`.
///
/// Only the first arrow splits; both sides are trimmed. An empty left side
/// means no override.
pub fn arrow_extract(name: &str) -> (Option<String>, String) {
    match name.split_once(ARROW) {
        Some((yield_name, canonical)) => {
            let yield_name = yield_name.trim();
            let yield_name = (!yield_name.is_empty()).then(|| yield_name.to_string());
            (yield_name, canonical.trim().to_string())
        }
        None => (None, name.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_name_has_no_override() {
        assert_eq!(arrow_extract("age"), (None, "age".to_string()));
    }

    #[test]
    fn arrow_splits_output_key_and_canonical() {
        assert_eq!(
            arrow_extract("user_name -> n"),
            (Some("user_name".to_string()), "n".to_string())
        );
    }

    #[test]
    fn only_first_arrow_splits() {
        assert_eq!(
            arrow_extract("a->b->c"),
            (Some("a".to_string()), "b->c".to_string())
        );
    }

    #[test]
    fn empty_left_side_is_ignored() {
        assert_eq!(arrow_extract("->x"), (None, "x".to_string()));
    }
}
