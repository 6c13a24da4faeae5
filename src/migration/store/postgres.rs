use std::sync::Arc;

use may_postgres::types::ToSql;
use may_postgres::Row;
use sea_query::{Alias, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement, Value, Values};

use super::{CreatedAtBound, RecordFilter, SortOrder, TrackingStore};
use crate::migration::state_table::{
    initialize_state_table, COL_CREATED_AT, COL_NAME, COL_STATE, DEFAULT_TABLE,
};
use crate::migration::{MigrationError, MigrationRecord, MigrationState};
use crate::{ShoreError, ShoreExecutor};

/// Tracking store backed by a PostgreSQL table.
///
/// Statements are built with `sea-query` and executed through the shared
/// [`ShoreExecutor`], which SQL-flavored scripts also use.
pub struct PostgresStore {
    executor: Arc<dyn ShoreExecutor>,
    table: String,
}

impl PostgresStore {
    pub fn new(executor: Arc<dyn ShoreExecutor>) -> Self {
        Self::with_table(executor, DEFAULT_TABLE)
    }

    /// Store using a custom tracking table ("collection") name.
    pub fn with_table(executor: Arc<dyn ShoreExecutor>, table: impl Into<String>) -> Self {
        Self {
            executor,
            table: table.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn table(&self) -> Alias {
        Alias::new(self.table.clone())
    }

    fn select(&self) -> SelectStatement {
        Query::select()
            .column(COL_NAME)
            .column(COL_CREATED_AT)
            .column(COL_STATE)
            .from(self.table())
            .to_owned()
    }

    fn query_records(&self, statement: &SelectStatement) -> Result<Vec<MigrationRecord>, MigrationError> {
        let (sql, values) = statement.build(PostgresQueryBuilder);
        let rows = with_bound_values(&values, |params| self.executor.query_all(&sql, params))?;
        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
    }

    fn execute(&self, sql: &str, values: &Values) -> Result<u64, MigrationError> {
        Ok(with_bound_values(values, |params| {
            self.executor.execute(sql, params)
        })?)
    }
}

impl TrackingStore for PostgresStore {
    fn ensure_schema(&self) -> Result<(), MigrationError> {
        initialize_state_table(self.executor.as_ref(), &self.table)?;
        Ok(())
    }

    fn create(&self, record: &MigrationRecord) -> Result<(), MigrationError> {
        if self.find_by_name(&record.name)?.is_some() {
            return Err(MigrationError::DuplicateName(record.name.clone()));
        }

        let (sql, values) = Query::insert()
            .into_table(self.table())
            .columns([COL_NAME, COL_CREATED_AT, COL_STATE])
            .values_panic([
                record.name.clone().into(),
                record.created_at.into(),
                record.state.as_str().into(),
            ])
            .build(PostgresQueryBuilder);
        self.execute(&sql, &values)?;
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError> {
        let statement = self
            .select()
            .and_where(Expr::col(COL_NAME).eq(name))
            .limit(1)
            .to_owned();
        Ok(self.query_records(&statement)?.into_iter().next())
    }

    fn find_latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        let statement = self
            .select()
            .order_by(COL_CREATED_AT, Order::Desc)
            .limit(1)
            .to_owned();
        Ok(self.query_records(&statement)?.into_iter().next())
    }

    fn find(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let statement = build_find(self.select(), filter, order);
        self.query_records(&statement)
    }

    fn set_state(&self, name: &str, state: MigrationState) -> Result<(), MigrationError> {
        let (sql, values) = Query::update()
            .table(self.table())
            .value(COL_STATE, state.as_str())
            .and_where(Expr::col(COL_NAME).eq(name))
            .build(PostgresQueryBuilder);
        self.execute(&sql, &values)?;
        Ok(())
    }

    fn delete_by_names(&self, names: &[String]) -> Result<u64, MigrationError> {
        if names.is_empty() {
            return Ok(0);
        }
        let (sql, values) = Query::delete()
            .from_table(self.table())
            .and_where(Expr::col(COL_NAME).is_in(names.iter().map(String::as_str)))
            .build(PostgresQueryBuilder);
        self.execute(&sql, &values)
    }
}

fn build_find(mut statement: SelectStatement, filter: &RecordFilter, order: SortOrder) -> SelectStatement {
    if let Some(state) = filter.state {
        statement.and_where(Expr::col(COL_STATE).eq(state.as_str()));
    }
    if let Some(bound) = filter.created_at {
        let condition = match bound {
            CreatedAtBound::AtMost(v) => Expr::col(COL_CREATED_AT).lte(v),
            CreatedAtBound::AtLeast(v) => Expr::col(COL_CREATED_AT).gte(v),
        };
        statement.and_where(condition);
    }
    let order = match order {
        SortOrder::Ascending => Order::Asc,
        SortOrder::Descending => Order::Desc,
    };
    statement.order_by(COL_CREATED_AT, order);
    statement
}

fn record_from_row(row: &Row) -> Result<MigrationRecord, MigrationError> {
    let name: String = row
        .try_get(0)
        .map_err(|e| ShoreError::ParseError(format!("name: {e}")))?;
    let created_at: i64 = row
        .try_get(1)
        .map_err(|e| ShoreError::ParseError(format!("created_at: {e}")))?;
    let state: String = row
        .try_get(2)
        .map_err(|e| ShoreError::ParseError(format!("state: {e}")))?;

    Ok(MigrationRecord {
        name,
        created_at,
        state: state.parse()?,
    })
}

/// Convert the bound values of a built statement into `may_postgres`
/// parameters and run `f` with them. Only the value kinds the tracking
/// table uses are supported.
fn with_bound_values<F, R>(values: &Values, f: F) -> Result<R, ShoreError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, ShoreError>,
{
    let mut owned: Vec<Box<dyn ToSql>> = Vec::new();
    for value in values.iter() {
        match value {
            Value::String(Some(s)) => owned.push(Box::new(s.clone())),
            Value::BigInt(Some(i)) => owned.push(Box::new(*i)),
            other => {
                return Err(ShoreError::QueryError(format!(
                    "unsupported tracking-table parameter: {other:?}"
                )))
            }
        }
    }
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| &**p).collect();
    f(&params)
}
