use sea_orm::{sea_query::TableCreateStatement, ConnectionTrait, Database, DatabaseConnection};

use crate::error::TestError;

/// Test context containing the database connection for an isolated test.
///
/// Provides an in-memory SQLite database connection for unit and integration
/// testing. The database is created lazily on first access and persists for the
/// lifetime of the test context.
pub struct TestContext {
    /// Optional database connection to an in-memory SQLite instance.
    ///
    /// `None` until `with_tables` has run.
    pub db: Option<DatabaseConnection>,
}

impl TestContext {
    /// Creates an empty test context with no database connection.
    pub fn new() -> Self {
        Self { db: None }
    }

    /// Connects to a fresh in-memory SQLite database and creates the given tables.
    ///
    /// # Arguments
    /// - `tables` - CREATE TABLE statements generated from entity schemas
    ///
    /// # Returns
    /// - `Ok(&DatabaseConnection)` - Connection with all tables created
    /// - `Err(TestError::Database)` - Connection or table creation failed
    pub async fn with_tables(
        &mut self,
        tables: Vec<TableCreateStatement>,
    ) -> Result<&DatabaseConnection, TestError> {
        let db = Database::connect("sqlite::memory:").await?;

        for table in tables {
            db.execute(&table).await?;
        }

        self.db = Some(db);

        // Unwrap is safe: assigned on the line above.
        Ok(self.db.as_ref().unwrap())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
