//! Path expression evaluator and template engine (§4.1, §4.2).
//!
//! `$`-prefixed path expressions (`$input.user.email`) and the
//! `{{ }}`/`{% %}`/`{# #}` template surface both compile through the same
//! lexer/parser/evaluator; [`render`] additionally applies the
//! single-expression-returns-typed-value rule.

pub mod ast;
pub mod builtins;
pub mod context;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod template;

pub use context::EvaluationContext;
pub use error::ExpressionError;
pub use eval::Evaluator;
pub use template::{ErrorMode, Template, TemplateEngineConfig};

use prana_value::Value;
use std::sync::Arc;

/// Evaluates a single `$`-prefixed path/expression string (§4.1 contract).
pub fn evaluate(src: &str, ctx: &EvaluationContext) -> Result<Value, ExpressionError> {
    let expr = parser::parse(src)?;
    let evaluator = Evaluator::new(Arc::new(builtins::BuiltinRegistry::standard()));
    evaluator.eval(&expr, ctx)
}

/// Renders a template string against `ctx`, honoring the single-expression
/// typed-value special case (§4.2).
pub fn render(src: &str, ctx: &EvaluationContext, config: &TemplateEngineConfig) -> Result<Value, ExpressionError> {
    let evaluator = Evaluator::new(Arc::new(builtins::BuiltinRegistry::standard()));
    let tpl = Template::parse(src, config)?;
    tpl.render(&evaluator, ctx, config)
}

/// Recursively renders a structured parameter tree (map/list whose string
/// leaves are templates), per §4.2 "structured parameter tree" and §4.4
/// step 3 ("Parameter rendering").
pub fn render_tree(value: &Value, ctx: &EvaluationContext, config: &TemplateEngineConfig) -> Result<Value, ExpressionError> {
    match value {
        Value::String(s) => render(s, ctx, config),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(render_tree(item, ctx, config)?);
            }
            Ok(Value::List(out))
        }
        Value::Map(map) => {
            let mut out = indexmap::IndexMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), render_tree(v, ctx, config)?);
            }
            Ok(Value::Map(out))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_resolves_path() {
        let ctx = EvaluationContext::builder().input(Value::Int(7)).build();
        assert_eq!(evaluate("$input", &ctx).unwrap(), Value::Int(7));
    }

    #[test]
    fn render_tree_preserves_structure_and_types() {
        let ctx = EvaluationContext::builder().input(Value::Int(3)).build();
        let mut tree = indexmap::IndexMap::new();
        tree.insert("count".to_string(), Value::string("{{ $input }}"));
        tree.insert("label".to_string(), Value::string("n={{ $input }}"));
        let rendered = render_tree(&Value::Map(tree), &ctx, &TemplateEngineConfig::default()).unwrap();
        let map = rendered.as_map().unwrap();
        assert_eq!(map.get("count"), Some(&Value::Int(3)));
        assert_eq!(map.get("label"), Some(&Value::string("n=3")));
    }
}
