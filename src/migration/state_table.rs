//! Migration tracking table management

use crate::{ShoreError, ShoreExecutor};
use sea_query::{Alias, ColumnDef, PostgresQueryBuilder, Table, TableCreateStatement};

pub const COL_NAME: &str = "name";
pub const COL_CREATED_AT: &str = "created_at";
pub const COL_STATE: &str = "state";

/// Default tracking table name.
pub const DEFAULT_TABLE: &str = "migrations";

/// `CREATE TABLE IF NOT EXISTS` for the tracking table named `table`.
///
/// - `name`: unique, operator-supplied
/// - `created_at`: epoch milliseconds, the ordering key
/// - `state`: `'up'` or `'down'`, defaults to `'down'`
pub fn create_state_table(table: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(table.to_string()))
        .if_not_exists()
        .col(
            ColumnDef::new(COL_NAME)
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(COL_CREATED_AT).big_integer().not_null())
        .col(
            ColumnDef::new(COL_STATE)
                .string_len(8)
                .not_null()
                .default("down"),
        )
        .to_owned()
}

/// Create the tracking table if it does not exist.
pub fn initialize_state_table(executor: &dyn ShoreExecutor, table: &str) -> Result<(), ShoreError> {
    let sql = create_state_table(table).build(PostgresQueryBuilder);
    executor.execute(&sql, &[])?;
    Ok(())
}
