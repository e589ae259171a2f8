use scopedb_core::{
    AsyncBackend, AsyncDbManager, AsyncEngineManager, Backend, ConnectionConfig, DbManager,
    EngineManager, Result,
};
use tracing::debug;

use crate::{
    RunArgs,
    error_presentation::{CliError, CliResult},
    output::{StatementOutput, returns_rows},
};

/// Runs every statement in one scope, then disposes the engine.
pub(crate) fn run_blocking(
    backend: &dyn Backend,
    config: ConnectionConfig,
    args: &RunArgs,
) -> CliResult<Vec<StatementOutput>> {
    let mut manager = EngineManager::new(backend, config)?;
    let outcome = run_scope(&manager, &args.execute, args.rollback);
    let cleaned = manager.clean_up();
    let outputs = outcome?;
    cleaned?;
    Ok(outputs)
}

pub(crate) fn run_async(
    backend: Box<dyn AsyncBackend>,
    config: ConnectionConfig,
    args: &RunArgs,
) -> CliResult<Vec<StatementOutput>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        let mut manager = AsyncEngineManager::new(backend.as_ref(), config).await?;
        let outcome = run_async_scope(&manager, &args.execute, args.rollback).await;
        let cleaned = manager.clean_up().await;
        let outputs = outcome?;
        cleaned?;
        Ok::<_, CliError>(outputs)
    })
}

fn run_scope(
    manager: &EngineManager,
    statements: &[String],
    rollback: bool,
) -> Result<Vec<StatementOutput>> {
    let mut scope = manager.get_db()?;
    let outcome = statements
        .iter()
        .map(|sql| {
            if returns_rows(sql) {
                scope.query(sql).map(StatementOutput::Rows)
            } else {
                scope.execute(sql).map(StatementOutput::Affected)
            }
        })
        .collect::<Result<Vec<_>>>();

    match outcome {
        Ok(outputs) if rollback => {
            debug!("rolling back on request");
            scope.rollback()?;
            Ok(outputs)
        }
        outcome => scope.finish(outcome),
    }
}

async fn run_async_scope(
    manager: &AsyncEngineManager,
    statements: &[String],
    rollback: bool,
) -> Result<Vec<StatementOutput>> {
    let mut scope = manager.get_db().await?;
    let mut outputs = Vec::with_capacity(statements.len());
    let mut failure = None;
    for sql in statements {
        let output = if returns_rows(sql) {
            scope.query(sql).await.map(StatementOutput::Rows)
        } else {
            scope.execute(sql).await.map(StatementOutput::Affected)
        };
        match output {
            Ok(output) => outputs.push(output),
            Err(error) => {
                failure = Some(error);
                break;
            }
        }
    }
    let outcome = match failure {
        Some(error) => Err(error),
        None => Ok(outputs),
    };

    match outcome {
        Ok(outputs) if rollback => {
            debug!("rolling back on request");
            scope.rollback().await?;
            Ok(outputs)
        }
        outcome => scope.finish(outcome).await,
    }
}
