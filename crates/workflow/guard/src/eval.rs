//! Guard evaluation
//!
//! Conditions are evaluated against exactly three bindings: the entity, the
//! actor and the transition under consideration. Evaluation never touches
//! anything beyond what those bindings expose through [`Attributes`].

use crate::errors::{GuardError, GuardResult};
use crate::parser::{Binding, CompareOp, Expr, Parser};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use workflow_types::{Attributes, Transition, Value};

/// Limits applied to every condition before it is parsed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Maximum condition length in characters
    pub max_expression_len: usize,
    /// Maximum nesting depth of parentheses, lists and negations
    pub max_depth: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_expression_len: 1024,
            max_depth: 32,
        }
    }
}

/// The bindings visible to a condition
#[derive(Clone, Copy)]
pub struct GuardContext<'a> {
    pub entity: &'a dyn Attributes,
    pub actor: &'a dyn Attributes,
    pub transition: &'a Transition,
}

impl<'a> GuardContext<'a> {
    pub fn new(
        entity: &'a dyn Attributes,
        actor: &'a dyn Attributes,
        transition: &'a Transition,
    ) -> Self {
        Self {
            entity,
            actor,
            transition,
        }
    }

    fn lookup(&self, binding: Binding, name: &str) -> GuardResult<Value> {
        let source: &dyn Attributes = match binding {
            Binding::Entity => self.entity,
            Binding::Actor => self.actor,
            Binding::Transition => self.transition,
        };
        source
            .attribute(name)
            .ok_or_else(|| GuardError::UnknownAttribute {
                binding: binding.name().to_string(),
                attribute: name.to_string(),
            })
    }
}

/// Pluggable evaluator for transition guard conditions.
///
/// An `Err` result means "condition not met"; callers fail closed.
pub trait GuardEvaluator: Send + Sync {
    /// Evaluate `condition` as a boolean in `ctx`
    fn evaluate(&self, condition: &str, ctx: &GuardContext<'_>) -> GuardResult<bool>;

    /// Check a condition for syntax errors without evaluating it
    fn check(&self, _condition: &str) -> GuardResult<()> {
        Ok(())
    }
}

/// The built-in evaluator for the restricted expression language
#[derive(Clone, Debug, Default)]
pub struct ExpressionGuard {
    config: GuardConfig,
}

impl ExpressionGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Parse a condition, applying the configured limits
    pub fn compile(&self, condition: &str) -> GuardResult<Expr> {
        let len = condition.chars().count();
        if len > self.config.max_expression_len {
            return Err(GuardError::TooLong {
                len,
                max: self.config.max_expression_len,
            });
        }
        Parser::parse(condition, self.config.max_depth)
    }
}

impl GuardEvaluator for ExpressionGuard {
    fn evaluate(&self, condition: &str, ctx: &GuardContext<'_>) -> GuardResult<bool> {
        let expr = self.compile(condition)?;
        let value = eval(&expr, ctx)?;
        tracing::trace!(
            transition = %ctx.transition.id,
            condition,
            result = %value,
            "Guard evaluated"
        );
        Ok(value.is_truthy())
    }

    fn check(&self, condition: &str) -> GuardResult<()> {
        self.compile(condition).map(|_| ())
    }
}

/// Evaluate a parsed expression
pub fn eval(expr: &Expr, ctx: &GuardContext<'_>) -> GuardResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Attribute { binding, name } => ctx.lookup(*binding, name),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<GuardResult<Vec<_>>>()
            .map(Value::List),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, ctx)?.is_truthy())),
        Expr::And(left, right) => {
            if !eval(left, ctx)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(right, ctx)?.is_truthy()))
        }
        Expr::Or(left, right) => {
            if eval(left, ctx)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(right, ctx)?.is_truthy()))
        }
        Expr::Compare { op, left, right } => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> GuardResult<bool> {
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::Ne => Ok(!values_equal(left, right)),
        CompareOp::In => contains(op, right, left),
        CompareOp::NotIn => contains(op, right, left).map(|found| !found),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = order(op, left, right)?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Int(a), Value::Int(b)) => a == b,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
    }
}

fn order(op: CompareOp, left: &Value, right: &Value) -> GuardResult<Ordering> {
    let mismatch = || GuardError::TypeMismatch {
        op: op.to_string(),
        left: left.type_name(),
        right: right.type_name(),
    };

    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
    }
}

fn contains(op: CompareOp, haystack: &Value, needle: &Value) -> GuardResult<bool> {
    match (haystack, needle) {
        (Value::List(items), _) => Ok(items.iter().any(|item| values_equal(item, needle))),
        (Value::Str(text), Value::Str(part)) => Ok(text.contains(part.as_str())),
        _ => Err(GuardError::TypeMismatch {
            op: op.to_string(),
            left: needle.type_name(),
            right: haystack.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use workflow_types::{Actor, EntityRef};

    fn document() -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("status".to_string(), Value::from("ready"));
        attrs.insert("pages".to_string(), Value::from(12));
        attrs.insert("score".to_string(), Value::from(7.5));
        attrs.insert(
            "tags".to_string(),
            Value::List(vec![Value::from("legal"), Value::from("urgent")]),
        );
        attrs.insert("owner".to_string(), Value::from("alice"));
        attrs.insert("serial".to_string(), Value::Int(9_007_199_254_740_993));
        attrs
    }

    fn publish() -> Transition {
        Transition::new("publish", "Publish", "review")
            .with_destination("published")
            .with_permission("can_publish")
    }

    fn check(condition: &str) -> GuardResult<bool> {
        let entity = document();
        let actor = Actor::new("alice").with_attribute("is_staff", true);
        let transition = publish();
        let ctx = GuardContext::new(&entity, &actor, &transition);
        ExpressionGuard::default().evaluate(condition, &ctx)
    }

    #[test]
    fn test_literals_and_truthiness() {
        assert_eq!(check("true"), Ok(true));
        assert_eq!(check("False"), Ok(false));
        assert_eq!(check("None"), Ok(false));
        assert_eq!(check("0"), Ok(false));
        assert_eq!(check("'x'"), Ok(true));
        assert_eq!(check("[]"), Ok(false));
    }

    #[test]
    fn test_attribute_comparisons() {
        assert_eq!(check("entity.status == 'ready'"), Ok(true));
        assert_eq!(check("obj.status != 'ready'"), Ok(false));
        assert_eq!(check("entity.pages > 10"), Ok(true));
        assert_eq!(check("entity.pages <= 11"), Ok(false));
        assert_eq!(check("entity.score >= 7.5"), Ok(true));
        assert_eq!(check("entity.pages == 12.0"), Ok(true));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // Both sides round to the same f64
        assert_eq!(check("entity.serial == 9007199254740993"), Ok(true));
        assert_eq!(check("entity.serial == 9007199254740992"), Ok(false));
        assert_eq!(check("entity.serial > 9007199254740992"), Ok(true));
        assert_eq!(check("entity.serial in [9007199254740992]"), Ok(false));
    }

    #[test]
    fn test_cross_binding_comparison() {
        assert_eq!(check("entity.owner == actor.id"), Ok(true));
        assert_eq!(check("user.is_staff and entity.owner == user.id"), Ok(true));
    }

    #[test]
    fn test_transition_binding() {
        assert_eq!(check("transition.codename == 'publish'"), Ok(true));
        assert_eq!(check("transition.destination == 'published'"), Ok(true));
        assert_eq!(check("transition.permission == 'can_publish'"), Ok(true));
        assert_eq!(check("transition.workflow == 'review'"), Ok(true));
    }

    #[test]
    fn test_membership() {
        assert_eq!(check("'urgent' in entity.tags"), Ok(true));
        assert_eq!(check("'draft' not in entity.tags"), Ok(true));
        assert_eq!(check("entity.status in ['ready', 'done']"), Ok(true));
        assert_eq!(check("'ead' in entity.status"), Ok(true));
    }

    #[test]
    fn test_short_circuit_skips_failing_branch() {
        // entity.missing would fail, but it is never evaluated
        assert_eq!(check("false and entity.missing"), Ok(false));
        assert_eq!(check("true or entity.missing"), Ok(true));
        assert_eq!(check("!false && (entity.pages > 1 || entity.missing)"), Ok(true));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            check("entity.missing"),
            Err(GuardError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            check("entity.status > 3"),
            Err(GuardError::TypeMismatch { .. })
        ));
        assert!(matches!(
            check("entity.pages in 3"),
            Err(GuardError::TypeMismatch { .. })
        ));
        assert!(matches!(
            check("os.system('rm -rf /')"),
            Err(GuardError::UnknownBinding(_))
        ));
    }

    #[test]
    fn test_mixed_type_equality_is_false_not_error() {
        assert_eq!(check("entity.pages == '12'"), Ok(false));
        assert_eq!(check("entity.owner == null"), Ok(false));
    }

    #[test]
    fn test_length_limit() {
        let guard = ExpressionGuard::new(GuardConfig {
            max_expression_len: 10,
            max_depth: 32,
        });
        let entity = EntityRef::new("document", "1");
        let actor = Actor::new("bob");
        let transition = publish();
        let ctx = GuardContext::new(&entity, &actor, &transition);

        assert_eq!(guard.evaluate("true", &ctx), Ok(true));
        assert!(matches!(
            guard.evaluate("entity.id == 'abcdef'", &ctx),
            Err(GuardError::TooLong { max: 10, .. })
        ));
    }

    #[test]
    fn test_check_reports_syntax_only() {
        let guard = ExpressionGuard::default();
        assert!(guard.check("entity.anything == 1").is_ok());
        assert!(guard.check("entity.anything = 1").is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: GuardConfig = toml::from_str("max_depth = 4").unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_expression_len, 1024);
    }
}
