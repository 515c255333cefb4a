//! Grouped INSERT logic for the `(id, email)` table.

use bulk_insert::Record;
use futures::future::try_join_all;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

/// Build a multi-row INSERT with one `($n, $n+1)` tuple per record.
pub fn multi_row_insert_sql(table: &str, rows: usize) -> String {
    let placeholders: Vec<String> = (0..rows)
        .map(|i| format!("(${}, ${})", 2 * i + 1, 2 * i + 2))
        .collect();
    format!(
        "INSERT INTO \"{table}\" (\"id\", \"email\") VALUES {}",
        placeholders.join(", ")
    )
}

/// Single-row INSERT used by the pipelined mode.
pub fn single_row_insert_sql(table: &str) -> String {
    format!("INSERT INTO \"{table}\" (\"id\", \"email\") VALUES ($1, $2)")
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM \"{table}\"")
}

/// Generate CREATE TABLE statement for the target table.
pub fn create_table_sql(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS \"{table}\" (\"id\" UUID PRIMARY KEY, \"email\" TEXT NOT NULL)")
}

/// Insert all records with one multi-row statement.
///
/// `execute` with SQL text prepares an unnamed statement first, so this costs
/// a prepare and an execute round trip.
pub async fn insert_multi_row(
    client: &Client,
    table: &str,
    records: &[Record],
) -> Result<u64, tokio_postgres::Error> {
    if records.is_empty() {
        return Ok(0);
    }

    let sql = multi_row_insert_sql(table, records.len());
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(records.len() * 2);
    for record in records {
        params.push(&record.id);
        params.push(&record.email);
    }

    client.execute(&sql, &params).await
}

/// Insert all records as pipelined single-row statements on one connection.
///
/// The statement is prepared once, then every insert is queued on the
/// connection without waiting for the previous response. They
/// are not wrapped in a transaction, so a failure leaves the earlier rows
/// of the batch applied.
pub async fn insert_pipelined(
    client: &Client,
    table: &str,
    records: &[Record],
) -> Result<u64, tokio_postgres::Error> {
    if records.is_empty() {
        return Ok(0);
    }

    let statement = client.prepare(&single_row_insert_sql(table)).await?;
    let statement = &statement;
    let inserts = records.iter().map(|record| async move {
        client
            .execute(statement, &[&record.id, &record.email])
            .await
    });
    let counts = try_join_all(inserts).await?;
    Ok(counts.iter().sum())
}

pub async fn count_rows(client: &Client, table: &str) -> Result<u64, tokio_postgres::Error> {
    let row = client.query_one(&count_sql(table), &[]).await?;
    let count: i64 = row.get(0);
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_row_insert_sql() {
        let sql = multi_row_insert_sql("users", 3);
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"id\", \"email\") VALUES ($1, $2), ($3, $4), ($5, $6)"
        );
    }

    #[test]
    fn test_single_row_insert_sql() {
        assert_eq!(
            single_row_insert_sql("bench"),
            "INSERT INTO \"bench\" (\"id\", \"email\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_count_and_create_sql() {
        assert_eq!(count_sql("users"), "SELECT COUNT(*) FROM \"users\"");
        let ddl = create_table_sql("users");
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"users\""));
        assert!(ddl.contains("\"id\" UUID PRIMARY KEY"));
        assert!(ddl.contains("\"email\" TEXT"));
    }

    #[test]
    fn test_multi_row_sql_at_bind_limit() {
        let sql = multi_row_insert_sql("users", 32_767);
        assert!(sql.ends_with("($65533, $65534)"));
    }
}
