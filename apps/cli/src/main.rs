//! `prana`: loads a workflow definition, compiles it, executes it once with
//! a JSON input/vars/env triple, and prints the resulting execution.
//!
//! The ambient "does it run" surface every donor-family repo ships
//! alongside its engine crate — not a product deliverable.

mod builtin;

use anyhow::Context;
use clap::Parser;
use prana_core::{NodeKey, WorkflowId};
use prana_engine::{Engine, ExecutionLimits, ExecutionResult};
use prana_workflow::Workflow;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "prana", version, about = "Run a Prana workflow once")]
struct Cli {
    /// Path to a workflow definition, JSON-serialized `Workflow`.
    workflow: PathBuf,

    /// Key of the node to start execution from.
    trigger: String,

    /// JSON value delivered as the trigger node's `$input`.
    #[arg(long, default_value = "null")]
    input: String,

    /// JSON object merged into `$vars` in addition to the workflow's own
    /// `variables` field.
    #[arg(long, default_value = "{}")]
    vars: String,

    /// JSON object exposed as `$env`.
    #[arg(long, default_value = "{}")]
    env: String,

    /// Trigger type recorded on the execution (`$execution` context has no
    /// use for it today, but it is part of the public `Execute` signature).
    #[arg(long = "trigger-type", default_value = "manual")]
    trigger_type: String,

    /// Safety bound on total scheduler steps (§8's "safety bound").
    #[arg(long = "max-iterations", default_value_t = 1000)]
    max_iterations: u32,
}

fn main() -> anyhow::Result<()> {
    let _guard = prana_log::init_from_env().context("failed to initialize logging")?;
    let cli = Cli::parse();

    let workflow_json = std::fs::read_to_string(&cli.workflow)
        .with_context(|| format!("reading workflow file {}", cli.workflow.display()))?;
    let mut workflow: Workflow = serde_json::from_str(&workflow_json).context("parsing workflow JSON")?;
    if workflow.id == WorkflowId::nil() {
        workflow.id = WorkflowId::v4();
    }

    let trigger_key = NodeKey::new(cli.trigger.as_str()).with_context(|| format!("invalid trigger node key {:?}", cli.trigger))?;

    let input = prana_value::from_json(&serde_json::from_str(&cli.input).context("parsing --input")?);
    let vars = prana_value::from_json(&serde_json::from_str(&cli.vars).context("parsing --vars")?);
    let env = prana_value::from_json(&serde_json::from_str(&cli.env).context("parsing --env")?);

    let engine = Engine::new();
    builtin::register(&engine);

    let compiled = engine.compile(&workflow, trigger_key).context("compiling workflow")?;
    let limits = ExecutionLimits { max_iterations: cli.max_iterations };
    let result = engine.execute(&compiled, workflow.id, cli.trigger_type, input, vars, env, limits);

    match result {
        ExecutionResult::Completed(execution) => {
            println!("completed\n{execution:#?}");
            Ok(())
        }
        ExecutionResult::Suspended(execution, suspension_type, suspension_data) => {
            println!("suspended ({})\n{execution:#?}\nsuspension_data: {suspension_data:?}", suspension_type.as_str());
            Ok(())
        }
        ExecutionResult::Failed(execution, error) => {
            println!("failed: {error}\n{execution:#?}");
            anyhow::bail!(error);
        }
    }
}
