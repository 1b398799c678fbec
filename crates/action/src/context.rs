//! The execution context handed to `Action::execute`/`resume` (§4.3:
//! "`context` carries `$input, $nodes, $vars, $env, $workflow, $execution`").
//!
//! This is exactly the shape `prana_expression::EvaluationContext` already
//! carries (§4.4 step 2, "context assembly"), so actions are evaluated
//! against the same named-root structure expressions are — no separate
//! context type to keep in sync.
pub use prana_expression::EvaluationContext as ActionContext;
