//! Warehouse tables over Postgres
//!
//! Both tables are rebuilt in full on every write: drop, create, insert, all
//! inside one transaction so readers never see a half-written table.

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use super::{quote_ident, DbResult, PgStore, MAX_BIND_PARAMS, DIMENSION_TABLE, FACT_TABLE};
use crate::store::WarehouseStore;
use crate::transform::{DimensionRow, FactRow};

const DIMENSION_COLUMNS: &[(&str, &str)] = &[
    ("comic_id", "BIGINT"),
    ("title", "TEXT"),
    ("publication_month", "INTEGER"),
    ("publication_year", "INTEGER"),
    ("transcript", "TEXT"),
    ("img_url", "TEXT"),
    ("alt_text", "TEXT"),
];

const FACT_COLUMNS: &[(&str, &str)] = &[
    ("comic_id", "BIGINT"),
    ("views", "BIGINT"),
    ("cost", "BIGINT"),
    ("customer_reviews", "DOUBLE PRECISION"),
];

async fn recreate(
    conn: &mut PgConnection,
    table: &str,
    columns: &[(&str, &str)],
) -> DbResult<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
        .execute(&mut *conn)
        .await?;

    let definitions = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect::<Vec<_>>()
        .join(", ");
    sqlx::query(&format!("CREATE TABLE {} ({})", quote_ident(table), definitions))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

fn insert_prefix(table: &str, columns: &[(&str, &str)]) -> String {
    let names = columns
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) ", quote_ident(table), names)
}

#[async_trait]
impl WarehouseStore for PgStore {
    async fn replace_dimension(&self, rows: &[DimensionRow]) -> DbResult<u64> {
        let mut tx = self.pool().begin().await?;
        recreate(&mut tx, DIMENSION_TABLE, DIMENSION_COLUMNS).await?;

        let mut written = 0;
        for chunk in rows.chunks(MAX_BIND_PARAMS / DIMENSION_COLUMNS.len()) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new(insert_prefix(DIMENSION_TABLE, DIMENSION_COLUMNS));
            builder.push_values(chunk, |mut sep, row| {
                sep.push_bind(row.comic_id)
                    .push_bind(row.title.clone())
                    .push_bind(row.publication_month)
                    .push_bind(row.publication_year)
                    .push_bind(row.transcript.clone())
                    .push_bind(row.img_url.clone())
                    .push_bind(row.alt_text.clone());
            });
            written += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(table = DIMENSION_TABLE, rows = written, "Rebuilt table");
        Ok(written)
    }

    async fn replace_fact(&self, rows: &[FactRow]) -> DbResult<u64> {
        let mut tx = self.pool().begin().await?;
        recreate(&mut tx, FACT_TABLE, FACT_COLUMNS).await?;

        let mut written = 0;
        for chunk in rows.chunks(MAX_BIND_PARAMS / FACT_COLUMNS.len()) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new(insert_prefix(FACT_TABLE, FACT_COLUMNS));
            builder.push_values(chunk, |mut sep, row| {
                sep.push_bind(row.comic_id)
                    .push_bind(row.views)
                    .push_bind(row.cost)
                    .push_bind(row.customer_reviews);
            });
            written += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(table = FACT_TABLE, rows = written, "Rebuilt table");
        Ok(written)
    }
}
