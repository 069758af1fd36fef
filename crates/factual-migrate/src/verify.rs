//! Post-migration checks, run inside the transaction before commit.

use std::collections::HashMap;

use tokio_postgres::GenericClient;

use crate::error::Error;
use crate::schema::{
    ALEMBIC_VERSION_TABLE, LEGACY_COLUMNS, LEGACY_USER_TABLE, PLAYLIST_TABLE, POST_TABLE,
    RELATION_TABLES, USER_TABLE,
};
use crate::sql;

struct ColumnInfo {
    data_type: String,
    nullable: bool,
}

/// Check every invariant the migration promises.
///
/// Returns [`Error::Verification`] listing every violation found, so one
/// failed run reports all of them.
pub async fn verify<C: GenericClient>(client: &C) -> Result<(), Error> {
    let mut violations = Vec::new();

    for (relation, should_exist) in [
        (USER_TABLE, true),
        (LEGACY_USER_TABLE, false),
        (ALEMBIC_VERSION_TABLE, false),
    ] {
        let row = client
            .query_one(sql::relation_exists(), &[&sql::ident(relation)])
            .await?;
        let exists: bool = row.try_get(0)?;
        if exists != should_exist {
            let state = if exists { "still exists" } else { "is missing" };
            violations.push(format!("table {relation} {state}"));
        }
    }

    for table in RELATION_TABLES {
        let orphans = count(client, &sql::count_orphans(table)).await?;
        if orphans > 0 {
            violations.push(format!(
                "{table}: {orphans} row(s) reference a missing user or post"
            ));
        }
        let duplicates = count(client, &sql::count_duplicate_relations(table)).await?;
        if duplicates > 0 {
            violations.push(format!(
                "{table}: {duplicates} duplicate (user_id, post_id) row(s)"
            ));
        }
    }

    let columns = describe(client, &[PLAYLIST_TABLE, POST_TABLE]).await?;
    for column in LEGACY_COLUMNS {
        match columns.get(&(column.table.to_owned(), column.target.to_owned())) {
            None => violations.push(format!("{}.{} is missing", column.table, column.target)),
            Some(info) => {
                if info.data_type != "jsonb" {
                    violations.push(format!(
                        "{}.{} is {}, not jsonb",
                        column.table, column.target, info.data_type
                    ));
                }
                if column.required && info.nullable {
                    violations.push(format!(
                        "{}.{} is nullable",
                        column.table, column.target
                    ));
                }
            }
        }

        let mut leftovers = vec![column.staging(), column.parked()];
        if column.legacy != column.target {
            leftovers.push(column.legacy.to_owned());
        }
        for leftover in leftovers {
            if columns.contains_key(&(column.table.to_owned(), leftover.clone())) {
                violations.push(format!("{}.{leftover} still exists", column.table));
            }
        }
    }

    let unindexed = count(client, &sql::count_missing_search_vectors()).await?;
    if unindexed > 0 {
        violations.push(format!("{unindexed} post(s) have no search_vector"));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Verification(violations))
    }
}

async fn count<C: GenericClient>(client: &C, sql: &str) -> Result<i64, Error> {
    let row = client.query_one(sql, &[]).await?;
    Ok(row.try_get(0)?)
}

async fn describe<C: GenericClient>(
    client: &C,
    tables: &[&str],
) -> Result<HashMap<(String, String), ColumnInfo>, Error> {
    let rows = client.query(sql::describe_columns(), &[&tables]).await?;
    let mut columns = HashMap::with_capacity(rows.len());
    for row in rows {
        let table: String = row.try_get(0)?;
        let column: String = row.try_get(1)?;
        let data_type: String = row.try_get(2)?;
        let is_nullable: String = row.try_get(3)?;
        columns.insert(
            (table, column),
            ColumnInfo {
                data_type,
                nullable: is_nullable == "YES",
            },
        );
    }
    Ok(columns)
}
