//! Shared test helpers for `PostgreSQL` integration tests.

use crate::test_helpers::{Dispatcher, TestEngine};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool};
use rstest::fixture;
use std::{env, mem};
use task_dispatcher::subtask::adapters::postgres::{PostgresSubTaskStore, SubTaskPgPool};
use tracing::warn;
use uuid::Uuid;

/// Environment variable naming the server the suite runs against.
pub const TEST_DATABASE_URL_VAR: &str = "TASK_DISPATCHER_TEST_DATABASE_URL";

/// SQL creating the sub-task tables.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_sub_task_tables/up.sql");

/// Boxed error type used by the helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pins every pooled connection to the test schema.
#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, r2d2::Error> for SearchPath {
    fn on_acquire(&self, connection: &mut PgConnection) -> Result<(), r2d2::Error> {
        connection
            .batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(r2d2::Error::QueryError)
    }
}

/// Migrated private schema plus a dispatcher bound to it.
///
/// Dropping the context drops the schema.
pub struct PgContext {
    /// Engine and store over the private schema.
    pub dispatcher: Dispatcher<PostgresSubTaskStore>,
    /// Pool whose connections see only the private schema.
    pub pool: SubTaskPgPool,
    url: String,
    schema: String,
}

impl PgContext {
    fn create(url: String) -> Result<Self, BoxError> {
        let schema = format!("sub_task_test_{}", Uuid::new_v4().simple());
        let mut connection = PgConnection::establish(&url)?;
        connection.batch_execute(&format!(
            "CREATE SCHEMA {schema}; SET search_path TO {schema};"
        ))?;
        connection.batch_execute(CREATE_SCHEMA_SQL)?;

        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(SearchPath(schema.clone())))
            .build(ConnectionManager::<PgConnection>::new(url.as_str()))?;
        let dispatcher = Dispatcher::new(PostgresSubTaskStore::new(pool.clone()));
        Ok(Self {
            dispatcher,
            pool,
            url,
            schema,
        })
    }

    /// Runs raw SQL inside the private schema.
    ///
    /// # Errors
    ///
    /// Returns the database error unchanged.
    pub fn execute(&self, sql: &str) -> Result<(), BoxError> {
        let mut connection = self.pool.get()?;
        connection.batch_execute(sql)?;
        Ok(())
    }

    /// Reconfigures the engine over the same store.
    pub fn map_engine(
        &mut self,
        build: impl FnOnce(TestEngine<PostgresSubTaskStore>) -> TestEngine<PostgresSubTaskStore>,
    ) {
        let placeholder = Dispatcher::new(PostgresSubTaskStore::new(self.pool.clone())).engine;
        let engine = mem::replace(&mut self.dispatcher.engine, placeholder);
        self.dispatcher.engine = build(engine);
    }
}

impl Drop for PgContext {
    fn drop(&mut self) {
        let dropped = PgConnection::establish(&self.url).and_then(|mut connection| {
            connection
                .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
                .map_err(|err| diesel::ConnectionError::BadConnection(err.to_string()))
        });
        if let Err(err) = dropped {
            warn!(schema = %self.schema, error = %err, "failed to drop test schema");
        }
    }
}

/// Provides a migrated schema, or `None` when no test server is configured.
///
/// # Errors
///
/// Returns an error if the configured server rejects the setup.
#[fixture]
pub fn pg_context() -> Result<Option<PgContext>, BoxError> {
    match env::var(TEST_DATABASE_URL_VAR) {
        Ok(url) if !url.trim().is_empty() => PgContext::create(url).map(Some),
        _ => Ok(None),
    }
}
