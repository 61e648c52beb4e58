use crate::reason::SkipRule;
use crate::types::DuplicationContext;

const TRIVIAL_LINES: u32 = 5;
const WEAK_SIMILARITY: f64 = 0.80;
const WEAK_MATCH_LINES: u32 = 20;
const SMALL_VARIABLE_LINES: u32 = 10;

/// First skip rule matching `ctx`, checked in a fixed order.
pub fn skip_rule(ctx: &DuplicationContext) -> Option<SkipRule> {
    if ctx.total_line_count < TRIVIAL_LINES {
        return Some(SkipRule::TrivialSize);
    }
    if ctx.similarity_score < WEAK_SIMILARITY && ctx.total_line_count < WEAK_MATCH_LINES {
        return Some(SkipRule::WeakSmallMatch);
    }
    if ctx.only_symbol_type("variable") && ctx.total_line_count < SMALL_VARIABLE_LINES {
        return Some(SkipRule::SmallVariable);
    }
    if is_test_scaffolding(ctx) {
        return Some(SkipRule::TestScaffolding);
    }
    None
}

fn is_test_scaffolding(ctx: &DuplicationContext) -> bool {
    !ctx.symbol_types.is_empty()
        && ctx
            .symbol_types
            .iter()
            .all(|kind| kind.contains("test") || kind.contains("fixture"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextDefaults, ContextOptions};

    fn ctx(options: ContextOptions) -> DuplicationContext {
        options.resolve(&ContextDefaults::default())
    }

    #[test]
    fn tiny_duplicates_are_skipped_regardless_of_similarity() {
        let c = ctx(ContextOptions::new().similarity_score(1.0).total_line_count(4));
        assert_eq!(skip_rule(&c), Some(SkipRule::TrivialSize));
    }

    #[test]
    fn weak_small_match_boundaries() {
        let c = ctx(ContextOptions::new().similarity_score(0.79).total_line_count(19));
        assert_eq!(skip_rule(&c), Some(SkipRule::WeakSmallMatch));

        let c = ctx(ContextOptions::new().similarity_score(0.80).total_line_count(19));
        assert_eq!(skip_rule(&c), None);

        let c = ctx(ContextOptions::new().similarity_score(0.5).total_line_count(20));
        assert_eq!(skip_rule(&c), None);
    }

    #[test]
    fn variable_only_rule_needs_exactly_variables() {
        let c = ctx(ContextOptions::new()
            .similarity_score(0.9)
            .total_line_count(9)
            .symbol_types(["variable"]));
        assert_eq!(skip_rule(&c), Some(SkipRule::SmallVariable));

        let c = ctx(ContextOptions::new()
            .similarity_score(0.9)
            .total_line_count(9)
            .symbol_types(["variable", "function"]));
        assert_eq!(skip_rule(&c), None);
    }

    #[test]
    fn test_and_fixture_kinds_are_scaffolding() {
        let c = ctx(ContextOptions::new()
            .similarity_score(0.99)
            .total_line_count(80)
            .symbol_types(["test_function", "pytest_fixture"]));
        assert_eq!(skip_rule(&c), Some(SkipRule::TestScaffolding));

        let c = ctx(ContextOptions::new()
            .similarity_score(0.99)
            .total_line_count(80)
            .symbol_types(["test_function", "class"]));
        assert_eq!(skip_rule(&c), None);
    }

    #[test]
    fn empty_type_set_is_not_scaffolding() {
        let mut c = ctx(ContextOptions::new().similarity_score(0.99));
        c.symbol_types.clear();
        assert_eq!(skip_rule(&c), None);
    }
}
