use std::{collections::BTreeMap, error::Error as StdError};

use serde::Deserialize;
use scopedb_core::{AsyncDbManager, DbManager, Error, Result, Row};

const TESTCASE_SOURCE_LABEL: &str = "yaml testcase";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestCase {
    /// Committed in its own scope before `statements` run.
    pub setup: Vec<String>,
    pub statements: Vec<String>,
    /// Substring of the rendered error chain the `statements` scope must fail with.
    pub error: Option<String>,
    pub verify: Option<Verification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Verification {
    pub query: String,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed(String),
}

pub fn load_test_cases_from_str(yaml: &str) -> Result<BTreeMap<String, TestCase>> {
    serde_yaml::from_str(yaml).map_err(|source| Error::Config {
        origin: TESTCASE_SOURCE_LABEL.to_string(),
        source: source.into(),
    })
}

pub fn run_test(manager: &dyn DbManager, test: &TestCase) -> TestResult {
    let outcome = run_statements(manager, &test.setup)
        .map_err(|error| format!("setup failed: {}", render_error_chain(&error)))
        .and_then(|()| evaluate_expected_error(test, run_statements(manager, &test.statements)))
        .and_then(|()| match &test.verify {
            Some(verification) => verify_rows(manager, verification),
            None => Ok(()),
        });

    into_test_result(outcome)
}

pub async fn run_async_test(manager: &dyn AsyncDbManager, test: &TestCase) -> TestResult {
    let outcome = match run_statements_async(manager, &test.setup).await {
        Ok(()) => {
            let outcome = run_statements_async(manager, &test.statements).await;
            evaluate_expected_error(test, outcome)
        }
        Err(error) => Err(format!("setup failed: {}", render_error_chain(&error))),
    };
    let outcome = match (outcome, &test.verify) {
        (Ok(()), Some(verification)) => verify_rows_async(manager, verification).await,
        (outcome, _) => outcome,
    };

    into_test_result(outcome)
}

/// `Display` of `error` followed by each of its sources, joined by `: `.
#[must_use]
pub fn render_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

fn run_statements(manager: &dyn DbManager, statements: &[String]) -> Result<()> {
    if statements.is_empty() {
        return Ok(());
    }

    let mut scope = manager.get_db()?;
    let outcome = statements
        .iter()
        .try_for_each(|sql| scope.execute(sql).map(drop));
    scope.finish(outcome)
}

async fn run_statements_async(manager: &dyn AsyncDbManager, statements: &[String]) -> Result<()> {
    if statements.is_empty() {
        return Ok(());
    }

    let mut scope = manager.get_db().await?;
    let mut outcome = Ok(());
    for sql in statements {
        if let Err(error) = scope.execute(sql).await {
            outcome = Err(error);
            break;
        }
    }
    scope.finish(outcome).await
}

fn verify_rows(
    manager: &dyn DbManager,
    verification: &Verification,
) -> std::result::Result<(), String> {
    let rows = manager
        .get_db()
        .and_then(|mut scope| {
            let outcome = scope.query(&verification.query);
            scope.finish(outcome)
        })
        .map_err(|error| format!("verification query failed: {}", render_error_chain(&error)))?;
    compare_rows(verification, &rows)
}

async fn verify_rows_async(
    manager: &dyn AsyncDbManager,
    verification: &Verification,
) -> std::result::Result<(), String> {
    let rows = match manager.get_db().await {
        Ok(mut scope) => {
            let outcome = scope.query(&verification.query).await;
            scope.finish(outcome).await
        }
        Err(error) => Err(error),
    }
    .map_err(|error| format!("verification query failed: {}", render_error_chain(&error)))?;
    compare_rows(verification, &rows)
}

fn compare_rows(verification: &Verification, rows: &[Row]) -> std::result::Result<(), String> {
    let actual = rows
        .iter()
        .map(|row| row.values().to_vec())
        .collect::<Vec<_>>();
    if actual == verification.rows {
        return Ok(());
    }

    Err(format!(
        "rows mismatch for `{}`\nexpected: {:?}\nactual: {:?}",
        verification.query, verification.rows, actual
    ))
}

fn evaluate_expected_error(test: &TestCase, result: Result<()>) -> std::result::Result<(), String> {
    match (result, test.error.as_deref()) {
        (Ok(()), None) => Ok(()),
        (Ok(()), Some(expected)) => Err(format!(
            "expected statements to fail with `{expected}`, but they succeeded"
        )),
        (Err(error), None) => Err(render_error_chain(&error)),
        (Err(error), Some(expected)) => {
            let rendered = render_error_chain(&error);
            if rendered.contains(expected) {
                Ok(())
            } else {
                Err(format!(
                    "expected error containing `{expected}`, got `{rendered}`"
                ))
            }
        }
    }
}

fn into_test_result(outcome: std::result::Result<(), String>) -> TestResult {
    match outcome {
        Ok(()) => TestResult::Passed,
        Err(message) => TestResult::Failed(message),
    }
}
