//! Collection statistics.
//!
//! Counts use `countDocuments` with an empty filter. Sizes come from the
//! `collStats` command: storage volume is `storageSize`, index volume is
//! `totalIndexSize`.

use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};

use crate::Result;
use crate::error::StoreMeterError;
use crate::models::DataStoreStats;

pub(crate) const STORAGE_SIZE_FIELD: &str = "storageSize";
pub(crate) const INDEX_SIZE_FIELD: &str = "totalIndexSize";

/// Collects count and size statistics for one collection.
pub(crate) async fn collection_stats(
    database: &Database,
    collection_name: &str,
) -> Result<DataStoreStats> {
    let collection = database.collection::<Document>(collection_name);
    let count = collection
        .count_documents(doc! {})
        .await
        .map_err(|e| StoreMeterError::stats_failed(collection_name, "document count failed", e))?;
    let record_count = i64::try_from(count)
        .map_err(|_| StoreMeterError::stats_format("count", format!("out of range ({})", count)))?;

    let stats = database
        .run_command(doc! { "collStats": collection_name })
        .await
        .map_err(|e| StoreMeterError::stats_failed(collection_name, "collStats failed", e))?;

    let storage_bytes = size_field(&stats, STORAGE_SIZE_FIELD)?;
    let index_bytes = size_field(&stats, INDEX_SIZE_FIELD)?;

    tracing::trace!(
        collection = collection_name,
        record_count,
        storage_bytes,
        index_bytes,
        "Collected MongoDB collection statistics"
    );

    Ok(DataStoreStats::from_bytes(
        record_count,
        storage_bytes,
        index_bytes,
    ))
}

/// Reads a byte size from a `collStats` reply.
///
/// The server reports sizes as Int32 for small collections and Int64 or
/// Double for large or scaled ones. Anything else is a format error.
pub(crate) fn size_field(stats: &Document, field: &str) -> Result<u64> {
    match stats.get(field) {
        Some(Bson::Int32(value)) => u64::try_from(*value)
            .map_err(|_| StoreMeterError::stats_format(field, format!("negative ({})", value))),
        Some(Bson::Int64(value)) => u64::try_from(*value)
            .map_err(|_| StoreMeterError::stats_format(field, format!("negative ({})", value))),
        Some(Bson::Double(value)) if value.is_finite() && *value >= 0.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bytes = value.round() as u64;
            Ok(bytes)
        }
        Some(Bson::Double(value)) => Err(StoreMeterError::stats_format(
            field,
            format!("invalid double ({})", value),
        )),
        Some(other) => Err(StoreMeterError::stats_format(
            field,
            format!("{:?}", other.element_type()),
        )),
        None => Err(StoreMeterError::stats_format(field, "missing")),
    }
}
