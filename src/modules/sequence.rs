//! Next value of a numbered series such as `ETU2025004` or `REC-2025-000012`.

use sqlx::{Postgres, Transaction};

use campus_core::AppError;
use campus_models::numbering::next_sequence;

/// Locks the series for the rest of the transaction and returns its next number.
///
/// `table` and `column` are trusted identifiers. Suffixes are compared by
/// length first so `ETU20251000` sorts after `ETU2025999`.
pub(crate) async fn next_in_series(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    column: &str,
    stem: &str,
) -> Result<u32, AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("{}.{}:{}", table, column, stem))
        .execute(&mut **tx)
        .await?;

    let last = sqlx::query_scalar::<_, String>(&format!(
        r#"SELECT {column} FROM {table}
           WHERE {column} LIKE $1 || '%'
           ORDER BY LENGTH({column}) DESC, {column} DESC
           LIMIT 1"#
    ))
    .bind(stem)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(next_sequence(stem, last.as_deref()))
}
