//! Table statistics queries.
//!
//! Record counts are exact (`COUNT(*)`). Sizes come from
//! `information_schema.TABLES`; storage volume is data plus index length.

use sqlx::MySqlPool;

use crate::Result;
use crate::error::StoreMeterError;
use crate::models::DataStoreStats;

const TABLE_SIZE_QUERY: &str = "SELECT \
         CAST(COALESCE(data_length, 0) AS UNSIGNED), \
         CAST(COALESCE(index_length, 0) AS UNSIGNED) \
     FROM information_schema.TABLES \
     WHERE table_schema = ? AND table_name = ?";

/// Quotes a MySQL identifier with backticks, doubling embedded backticks.
///
/// # Example
/// ```rust
/// use storemeter_core::adapters::mysql::quote_identifier;
///
/// assert_eq!(quote_identifier("orders"), "`orders`");
/// assert_eq!(quote_identifier("we`ird"), "`we``ird`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Exact row count of `database_name`.`table_name`, independent of the
/// session's default schema.
pub(crate) fn count_query(database_name: &str, table_name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {}.{}",
        quote_identifier(database_name),
        quote_identifier(table_name)
    )
}

/// Collects count and size statistics for one table.
pub(crate) async fn table_stats(
    pool: &MySqlPool,
    database_name: &str,
    table_name: &str,
) -> Result<DataStoreStats> {
    let record_count: i64 = sqlx::query_scalar(&count_query(database_name, table_name))
        .fetch_one(pool)
        .await
        .map_err(|e| StoreMeterError::stats_failed(table_name, "record count query failed", e))?;

    let sizes: Option<(u64, u64)> = sqlx::query_as(TABLE_SIZE_QUERY)
        .bind(database_name)
        .bind(table_name)
        .fetch_optional(pool)
        .await
        .map_err(|e| StoreMeterError::stats_failed(table_name, "catalog size query failed", e))?;

    let Some((data_length, index_length)) = sizes else {
        return Err(StoreMeterError::stats_missing(
            table_name,
            format!("table not found in catalog of '{}'", database_name),
        ));
    };

    let storage_bytes = data_length.saturating_add(index_length);

    tracing::trace!(
        table = table_name,
        record_count,
        storage_bytes,
        index_bytes = index_length,
        "Collected MySQL table statistics"
    );

    Ok(DataStoreStats::from_bytes(
        record_count,
        storage_bytes,
        index_length,
    ))
}
