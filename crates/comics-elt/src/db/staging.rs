//! Staging table over Postgres
//!
//! The staging table has no fixed schema. It is created from the first batch
//! written to it and widened whenever a later batch brings a field it has not
//! seen, so its columns are the union of every field ever staged. Column types
//! are inferred once, when the column is added; later values are coerced to
//! that type.

use async_trait::async_trait;
use comics_common::{Cell, Table};
use sqlx::query_builder::Separated;
use sqlx::{PgConnection, Postgres, QueryBuilder, Row};
use tracing::{debug, info, warn};

use super::{quote_ident, DbError, DbResult, PgStore, MAX_BIND_PARAMS, STAGING_TABLE};
use crate::store::StagingStore;

/// Rows per INSERT statement, before the bind parameter cap
const ROWS_PER_STATEMENT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }

    /// Map an `information_schema.columns.data_type` value
    fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "bigint" | "integer" | "smallint" => ColumnType::BigInt,
            "double precision" | "real" | "numeric" => ColumnType::Double,
            "boolean" => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }

    /// Narrowest type holding every non-null cell; all-null columns are text.
    fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut inferred: Option<ColumnType> = None;

        for cell in cells {
            let ty = match cell {
                Cell::Null => continue,
                Cell::Bool(_) => ColumnType::Boolean,
                Cell::Int(_) => ColumnType::BigInt,
                Cell::Float(_) => ColumnType::Double,
                Cell::Text(_) => return ColumnType::Text,
            };
            inferred = Some(match (inferred, ty) {
                (None, ty) => ty,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::BigInt), ColumnType::Double)
                | (Some(ColumnType::Double), ColumnType::BigInt) => ColumnType::Double,
                _ => return ColumnType::Text,
            });
        }

        inferred.unwrap_or(ColumnType::Text)
    }

    /// Select expression decoding the column as this type
    fn select_expr(self, column: &str) -> String {
        let cast = match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        };
        format!("{}::{}", quote_ident(column), cast)
    }
}

fn coerce_f64(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(v) => Some(*v as f64),
        Cell::Float(v) => Some(*v),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(cell: &Cell) -> Option<bool> {
    match cell {
        Cell::Bool(v) => Some(*v),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Bind `cell` as a value of `ty`; values that do not convert are stored as NULL.
fn bind_cell(sep: &mut Separated<'_, '_, Postgres, &'static str>, cell: &Cell, ty: ColumnType) {
    match ty {
        ColumnType::BigInt => sep.push_bind(cell.as_i64()),
        ColumnType::Double => sep.push_bind(coerce_f64(cell)),
        ColumnType::Boolean => sep.push_bind(coerce_bool(cell)),
        ColumnType::Text => sep.push_bind((!cell.is_null()).then(|| cell.to_string())),
    };
}

async fn existing_columns(
    conn: &mut PgConnection,
    table: &str,
) -> DbResult<Vec<(String, ColumnType)>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT column_name::text, data_type::text FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, data_type)| {
            let ty = ColumnType::from_data_type(&data_type);
            (name, ty)
        })
        .collect())
}

fn inferred_types(batch: &Table) -> Vec<ColumnType> {
    (0..batch.columns().len())
        .map(|idx| ColumnType::infer(batch.rows().iter().map(|row| &row[idx])))
        .collect()
}

async fn create_table(
    conn: &mut PgConnection,
    table: &str,
    columns: &[String],
    types: &[ColumnType],
) -> DbResult<()> {
    let definitions = columns
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect::<Vec<_>>()
        .join(", ");

    sqlx::query(&format!("CREATE TABLE {} ({})", quote_ident(table), definitions))
        .execute(&mut *conn)
        .await?;

    debug!(table, columns = columns.len(), "Created table");
    Ok(())
}

async fn insert_rows(
    conn: &mut PgConnection,
    table: &str,
    columns: &[String],
    types: &[ColumnType],
    rows: &[Vec<Cell>],
) -> DbResult<u64> {
    if columns.is_empty() || rows.is_empty() {
        return Ok(0);
    }

    let per_statement = ROWS_PER_STATEMENT.min(MAX_BIND_PARAMS / columns.len()).max(1);
    let mut written = 0;

    for rows in rows.chunks(per_statement) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (", quote_ident(table)));
        {
            let mut names = builder.separated(", ");
            for column in columns {
                names.push(quote_ident(column));
            }
        }
        builder.push(") ");

        builder.push_values(rows, |mut sep, row| {
            for (cell, ty) in row.iter().zip(types) {
                bind_cell(&mut sep, cell, *ty);
            }
        });

        written += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(written)
}

#[async_trait]
impl StagingStore for PgStore {
    async fn max_num(&self) -> DbResult<Option<i64>> {
        if !self.table_exists(STAGING_TABLE).await? {
            return Err(DbError::missing_table(STAGING_TABLE));
        }

        let latest: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT MAX(CAST({} AS BIGINT)) FROM {}",
            quote_ident("num"),
            quote_ident(STAGING_TABLE)
        ))
        .fetch_one(self.pool())
        .await?;

        Ok(latest)
    }

    async fn append(&self, batch: &Table) -> DbResult<u64> {
        if batch.columns().is_empty() || batch.is_empty() {
            return Ok(0);
        }

        // A table can exist with no columns at all, e.g. after replacing with an empty batch
        let exists = self.table_exists(STAGING_TABLE).await?;

        let mut tx = self.pool().begin().await?;
        let existing = existing_columns(&mut tx, STAGING_TABLE).await?;
        let inferred = inferred_types(batch);

        let types = if !exists {
            create_table(&mut tx, STAGING_TABLE, batch.columns(), &inferred).await?;
            inferred
        } else {
            let mut types = Vec::with_capacity(inferred.len());
            for (name, guess) in batch.columns().iter().zip(inferred) {
                match existing.iter().find(|(existing, _)| existing == name) {
                    Some((_, ty)) => types.push(*ty),
                    None => {
                        sqlx::query(&format!(
                            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                            quote_ident(STAGING_TABLE),
                            quote_ident(name),
                            guess.sql()
                        ))
                        .execute(&mut *tx)
                        .await?;
                        info!(table = STAGING_TABLE, column = %name, kind = guess.sql(), "Added staging column");
                        types.push(guess);
                    },
                }
            }
            types
        };

        let written =
            insert_rows(&mut tx, STAGING_TABLE, batch.columns(), &types, batch.rows()).await?;
        tx.commit().await?;

        debug!(table = STAGING_TABLE, rows = written, "Appended rows");
        Ok(written)
    }

    async fn replace(&self, batch: &Table) -> DbResult<u64> {
        let types = inferred_types(batch);
        let mut tx = self.pool().begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(STAGING_TABLE)))
            .execute(&mut *tx)
            .await?;
        create_table(&mut tx, STAGING_TABLE, batch.columns(), &types).await?;
        let written =
            insert_rows(&mut tx, STAGING_TABLE, batch.columns(), &types, batch.rows()).await?;

        tx.commit().await?;

        info!(table = STAGING_TABLE, rows = written, "Replaced staging table");
        Ok(written)
    }

    async fn read_all(&self) -> DbResult<Table> {
        let mut conn = self.pool().acquire().await?;
        let columns = existing_columns(&mut conn, STAGING_TABLE).await?;
        if columns.is_empty() {
            return Err(DbError::missing_table(STAGING_TABLE));
        }

        let select = columns
            .iter()
            .map(|(name, ty)| ty.select_expr(name))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!("SELECT {} FROM {}", select, quote_ident(STAGING_TABLE)))
            .fetch_all(&mut *conn)
            .await?;

        let mut table = Table::new(columns.iter().map(|(name, _)| name.clone()).collect());
        for row in rows {
            let mut cells = Vec::with_capacity(columns.len());
            for (idx, (_, ty)) in columns.iter().enumerate() {
                let cell = match ty {
                    ColumnType::BigInt => row.try_get::<Option<i64>, _>(idx)?.map(Cell::Int),
                    ColumnType::Double => row.try_get::<Option<f64>, _>(idx)?.map(Cell::Float),
                    ColumnType::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(Cell::Bool),
                    ColumnType::Text => row.try_get::<Option<String>, _>(idx)?.map(Cell::Text),
                };
                cells.push(cell.unwrap_or(Cell::Null));
            }
            table.push_row(cells)?;
        }

        if table.is_empty() {
            warn!(table = STAGING_TABLE, "Staging table is empty");
        }
        Ok(table)
    }
}
