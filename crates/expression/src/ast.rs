//! Expression AST (§4.2 "Expression AST").
//!
//! Conceptually a uniform `{type, metadata, children}` shape; represented
//! here as a closed Rust enum instead, since a statically typed target gains
//! nothing from reifying that uniformity and loses exhaustiveness checking.

use prana_value::Value;

/// The root a path expression resolves against (§4.1, §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Input,
    Nodes,
    Vars,
    Env,
    Workflow,
    Execution,
    Preparation,
}

impl PathRoot {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "input" => Some(PathRoot::Input),
            "nodes" => Some(PathRoot::Nodes),
            "vars" => Some(PathRoot::Vars),
            "env" => Some(PathRoot::Env),
            "workflow" => Some(PathRoot::Workflow),
            "execution" => Some(PathRoot::Execution),
            "preparation" => Some(PathRoot::Preparation),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PathRoot::Input => "input",
            PathRoot::Nodes => "nodes",
            PathRoot::Vars => "vars",
            PathRoot::Env => "env",
            PathRoot::Workflow => "workflow",
            PathRoot::Execution => "execution",
            PathRoot::Preparation => "preparation",
        }
    }
}

pub use prana_value::access::PathSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    /// List concatenation (`a ++ b`).
    Concat,
    /// List difference: elements of `a` not present in `b`.
    Difference,
    /// Membership test: `x in list_or_string`.
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A `$`-prefixed path expression, e.g. `$input.user.email`, `$nodes.api.output.items[0]`.
    Path { root: PathRoot, segments: Vec<PathSegment> },
    /// A bare (non-`$`) identifier used in filter-argument position, e.g.
    /// `default(fallback)` or `default(config.currency)`; resolved as a
    /// dotted lookup into `$vars` (see DESIGN.md open question).
    Identifier(Vec<String>),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `function_atom(args…)`.
    Call { name: String, args: Vec<Expr> },
    /// `a | f(x)`, already desugared to `Call{name: f, args: [a, x]}` by the
    /// parser (§8 property 5: pipe equivalence) — kept as a distinct node
    /// only long enough for the parser to build it; `desugar_pipes` folds it.
    Pipe { value: Box<Expr>, call: Box<Expr> },
    Grouped(Box<Expr>),
}

impl Expr {
    /// Rewrites `Pipe{value, call}` into `Call{name, args: [value, ...args]}`,
    /// recursively, so evaluation never needs to special-case pipes (§4.2).
    #[must_use]
    pub fn desugar_pipes(self) -> Expr {
        match self {
            Expr::Pipe { value, call } => {
                let value = value.desugar_pipes();
                match call.desugar_pipes() {
                    Expr::Call { name, mut args } => {
                        args.insert(0, value);
                        Expr::Call { name, args }
                    }
                    Expr::Identifier(mut segments) if segments.len() == 1 => {
                        Expr::Call { name: segments.remove(0), args: vec![value] }
                    }
                    other => Expr::Call { name: "__pipe_target__".into(), args: vec![value, other] },
                }
            }
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.desugar_pipes()),
                right: Box::new(right.desugar_pipes()),
            },
            Expr::Not(e) => Expr::Not(Box::new(e.desugar_pipes())),
            Expr::Negate(e) => Expr::Negate(Box::new(e.desugar_pipes())),
            Expr::Grouped(e) => Expr::Grouped(Box::new(e.desugar_pipes())),
            Expr::Call { name, args } => {
                Expr::Call { name, args: args.into_iter().map(Expr::desugar_pipes).collect() }
            }
            other => other,
        }
    }
}
