//! Guard conditions for workflow transitions
//!
//! A transition may carry a condition string that must hold before an actor
//! can take it. Conditions are written in a small, side-effect-free
//! expression language:
//!
//! ```text
//! user.is_staff and entity.status == 'ready'
//! entity.pages > 10 or 'urgent' in entity.tags
//! not (transition.destination == null)
//! ```
//!
//! Three bindings are visible: `entity` (alias `obj`), `actor` (alias
//! `user`) and `transition`. There is no function call syntax, no
//! assignment and no access beyond one attribute level, so a condition can
//! never reach into the host.
//!
//! The engine talks to conditions through the [`GuardEvaluator`] trait;
//! [`ExpressionGuard`] is the built-in implementation.

#![deny(unsafe_code)]

pub mod errors;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use errors::{GuardError, GuardResult};
pub use eval::{eval, ExpressionGuard, GuardConfig, GuardContext, GuardEvaluator};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{Binding, CompareOp, Expr, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use workflow_types::{Actor, Transition, Value};

    fn context_eval(condition: &str, n: i64) -> GuardResult<bool> {
        let mut entity = BTreeMap::new();
        entity.insert("n".to_string(), Value::from(n));
        let actor = Actor::new("alice");
        let transition = Transition::new("t", "T", "wf");
        let ctx = GuardContext::new(&entity, &actor, &transition);
        ExpressionGuard::default().evaluate(condition, &ctx)
    }

    proptest! {
        #[test]
        fn prop_arbitrary_input_never_panics(input in ".{0,64}") {
            let _ = context_eval(&input, 0);
        }

        #[test]
        fn prop_integer_comparison_matches_native(n in -1000i64..1000, m in -1000i64..1000) {
            prop_assert_eq!(context_eval(&format!("entity.n < {}", m), n), Ok(n < m));
            prop_assert_eq!(context_eval(&format!("entity.n >= {}", m), n), Ok(n >= m));
            prop_assert_eq!(context_eval(&format!("entity.n == {}", m), n), Ok(n == m));
        }

        #[test]
        fn prop_negation_inverts(n in -1000i64..1000, m in -1000i64..1000) {
            let plain = context_eval(&format!("entity.n > {}", m), n);
            let negated = context_eval(&format!("not (entity.n > {})", m), n);
            prop_assert_eq!(plain.map(|b| !b), negated);
        }
    }
}
