//! SQL text for each migration step.
//!
//! Statements are built here rather than inline in the steps so that the
//! search-vector expression used by the trigger and by the backfill comes
//! from one place, and so tests can run individual statements again.

use crate::schema::{
    ALEMBIC_VERSION_TABLE, LEGACY_USER_SEQUENCE, LEGACY_USER_TABLE, LegacyColumn, POST_TABLE,
    USER_SEQUENCE, USER_TABLE, search,
};

/// Quote an identifier for Postgres.
pub fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn rename_user_table() -> String {
    format!(
        "ALTER TABLE {} RENAME TO {};\nALTER SEQUENCE {} RENAME TO {};",
        ident(LEGACY_USER_TABLE),
        ident(USER_TABLE),
        ident(LEGACY_USER_SEQUENCE),
        ident(USER_SEQUENCE),
    )
}

pub fn drop_alembic_version() -> String {
    format!("DROP TABLE {}", ident(ALEMBIC_VERSION_TABLE))
}

pub fn add_staging_column(column: &LegacyColumn) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} JSONB",
        ident(column.table),
        ident(&column.staging())
    )
}

/// `(id, pickled)` for every row where the legacy column is set.
pub fn select_legacy(column: &LegacyColumn) -> String {
    format!(
        "SELECT id::bigint, {legacy} FROM {table} WHERE {legacy} IS NOT NULL ORDER BY id",
        legacy = ident(column.legacy),
        table = ident(column.table),
    )
}

/// Write `$1` (JSONB) to the staging column of row `$2`.
pub fn update_staging(column: &LegacyColumn) -> String {
    format!(
        "UPDATE {} SET {} = $1 WHERE id = $2::bigint",
        ident(column.table),
        ident(&column.staging())
    )
}

/// Write `$1` (JSONB) to the staging column of every row.
pub fn fill_staging(column: &LegacyColumn) -> String {
    format!(
        "UPDATE {} SET {} = $1",
        ident(column.table),
        ident(&column.staging())
    )
}

pub fn count_unstaged(column: &LegacyColumn) -> String {
    format!(
        "SELECT count(*) FROM {} WHERE {} IS NULL",
        ident(column.table),
        ident(&column.staging())
    )
}

/// Park the legacy columns, promote the staging columns under the original
/// names, mark required ones `NOT NULL`, then drop the parked columns.
///
/// Renames come first so the legacy data is still present under its parked
/// name when `SET NOT NULL` checks the promoted column.
pub fn swap_columns(columns: &[LegacyColumn]) -> String {
    let mut sql = String::new();
    for column in columns {
        sql.push_str(&format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};\n",
            ident(column.table),
            ident(column.legacy),
            ident(&column.parked())
        ));
        sql.push_str(&format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};\n",
            ident(column.table),
            ident(&column.staging()),
            ident(column.target)
        ));
    }
    for column in columns.iter().filter(|c| c.required) {
        sql.push_str(&format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;\n",
            ident(column.table),
            ident(column.target)
        ));
    }
    for column in columns {
        sql.push_str(&format!(
            "ALTER TABLE {} DROP COLUMN {};\n",
            ident(column.table),
            ident(&column.parked())
        ));
    }
    sql
}

/// Relation rows whose `post_id` does not reference an existing post.
pub fn delete_orphans_by_post(table: &str) -> String {
    format!(
        "DELETE FROM {} WHERE post_id NOT IN (SELECT id FROM {})",
        ident(table),
        ident(POST_TABLE)
    )
}

/// Relation rows whose `user_id` does not reference an existing user.
pub fn delete_orphans_by_user(table: &str) -> String {
    format!(
        "DELETE FROM {} WHERE user_id NOT IN (SELECT id FROM {})",
        ident(table),
        ident(USER_TABLE)
    )
}

/// Keep only the lowest `id` of every `(user_id, post_id)` group.
pub fn dedupe_relation(table: &str) -> String {
    let table = ident(table);
    format!(
        "DELETE FROM {table} AS a USING (\n    \
             SELECT MIN(id) AS min_id, user_id, post_id\n    \
             FROM {table}\n    \
             GROUP BY user_id, post_id\n    \
             HAVING COUNT(*) > 1\n\
         ) AS b\n\
         WHERE a.user_id = b.user_id\n\
         AND a.post_id = b.post_id\n\
         AND a.id > b.min_id"
    )
}

pub fn unique_constraint_name(table: &str) -> String {
    format!("{table}_user_post_unique")
}

/// Replace both foreign keys with cascading ones and add the
/// `(user_id, post_id)` unique constraint, in one `ALTER TABLE`.
pub fn harden_relation(table: &str) -> String {
    let user_fk = ident(&format!("{table}_user_id_fkey"));
    let post_fk = ident(&format!("{table}_post_id_fkey"));
    let unique = ident(&unique_constraint_name(table));
    format!(
        "ALTER TABLE {table}\n\
         DROP CONSTRAINT IF EXISTS {user_fk},\n\
         DROP CONSTRAINT IF EXISTS {post_fk},\n\
         ADD CONSTRAINT {user_fk}\n    \
             FOREIGN KEY (user_id) REFERENCES {users}(id) ON DELETE CASCADE,\n\
         ADD CONSTRAINT {post_fk}\n    \
             FOREIGN KEY (post_id) REFERENCES {posts}(id) ON DELETE CASCADE,\n\
         ADD CONSTRAINT {unique}\n    \
             UNIQUE (user_id, post_id)",
        table = ident(table),
        users = ident(USER_TABLE),
        posts = ident(POST_TABLE),
    )
}

/// Weighted concatenation of the post text columns.
///
/// `qualifier` is prepended to every column name: `"NEW."` inside the
/// trigger function, `""` for the backfill.
pub fn search_vector_expr(qualifier: &str) -> String {
    search::WEIGHTS
        .iter()
        .map(|(column, weight)| {
            format!(
                "setweight(to_tsvector('{config}', coalesce({qualifier}{column}, '')), '{weight}')",
                config = search::TEXT_SEARCH_CONFIG,
            )
        })
        .collect::<Vec<_>>()
        .join(" ||\n        ")
}

pub fn create_trigram_extension() -> String {
    format!("CREATE EXTENSION IF NOT EXISTS {}", search::EXTENSION)
}

pub fn add_search_column() -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} tsvector",
        ident(POST_TABLE),
        search::COLUMN
    )
}

pub fn create_search_function() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {function}()\n\
         RETURNS TRIGGER AS $$\n\
         BEGIN\n    \
             NEW.{column} =\n        \
                 {expr};\n    \
             RETURN NEW;\n\
         END;\n\
         $$ LANGUAGE plpgsql",
        function = search::FUNCTION,
        column = search::COLUMN,
        expr = search_vector_expr("NEW."),
    )
}

pub fn create_search_trigger() -> String {
    format!(
        "CREATE OR REPLACE TRIGGER {trigger}\n\
         BEFORE INSERT OR UPDATE ON {table}\n\
         FOR EACH ROW EXECUTE FUNCTION {function}()",
        trigger = search::TRIGGER,
        table = ident(POST_TABLE),
        function = search::FUNCTION,
    )
}

pub fn create_search_indexes() -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {vector_index} ON {table} USING GIN ({column});\n\
         CREATE INDEX IF NOT EXISTS {title_index} ON {table} USING GIN (title gin_trgm_ops);",
        vector_index = search::VECTOR_INDEX,
        title_index = search::TITLE_TRGM_INDEX,
        table = ident(POST_TABLE),
        column = search::COLUMN,
    )
}

/// Recompute `search_vector` for every existing post.
pub fn backfill_search_vector() -> String {
    format!(
        "UPDATE {table} SET {column} =\n        {expr}",
        table = ident(POST_TABLE),
        column = search::COLUMN,
        expr = search_vector_expr(""),
    )
}

/// Relation rows pointing at a user or post that does not exist.
pub fn count_orphans(table: &str) -> String {
    format!(
        "SELECT count(*) FROM {table} r\n\
         WHERE (r.post_id IS NOT NULL AND NOT EXISTS (SELECT 1 FROM {posts} p WHERE p.id = r.post_id))\n\
         OR (r.user_id IS NOT NULL AND NOT EXISTS (SELECT 1 FROM {users} u WHERE u.id = r.user_id))",
        table = ident(table),
        posts = ident(POST_TABLE),
        users = ident(USER_TABLE),
    )
}

/// `count(*) - count(DISTINCT (user_id, post_id))`, zero when deduplicated.
pub fn count_duplicate_relations(table: &str) -> String {
    format!(
        "SELECT count(*) - count(DISTINCT (user_id, post_id)) FROM {}",
        ident(table)
    )
}

pub fn count_missing_search_vectors() -> String {
    format!(
        "SELECT count(*) FROM {} WHERE {} IS NULL",
        ident(POST_TABLE),
        search::COLUMN
    )
}

/// `(table, column, data_type, is_nullable)` for the tables in `$1`.
pub fn describe_columns() -> &'static str {
    "SELECT table_name::text, column_name::text, data_type::text, is_nullable::text\n\
     FROM information_schema.columns\n\
     WHERE table_schema = current_schema() AND table_name::text = ANY($1::text[])"
}

/// Whether the relation named `$1` exists.
pub fn relation_exists() -> &'static str {
    "SELECT to_regclass($1::text) IS NOT NULL"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PLAYLIST_THUMBNAILS, RELATED};

    #[test]
    fn test_ident_quotes_reserved_words() {
        assert_eq!(ident("user"), "\"user\"");
        assert_eq!(ident("similar"), "\"similar\"");
        assert_eq!(ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_trigger_and_backfill_share_expression() {
        let trigger = create_search_function();
        let backfill = backfill_search_vector();

        let bare = search_vector_expr("");
        let qualified = search_vector_expr("NEW.");
        assert!(backfill.contains(&bare));
        assert!(trigger.contains(&qualified));
        assert_eq!(qualified.replace("NEW.", ""), bare);
    }

    #[test]
    fn test_search_weights_in_priority_order() {
        let expr = search_vector_expr("");
        let positions: Vec<usize> = ["title", "short_description", "description", "tags"]
            .iter()
            .map(|column| expr.find(&format!("coalesce({column},")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(expr.contains("coalesce(title, '')), 'A')"));
        assert!(expr.contains("coalesce(tags, '')), 'D')"));
    }

    #[test]
    fn test_swap_columns_order() {
        let sql = swap_columns(&[PLAYLIST_THUMBNAILS, RELATED]);
        let park = sql
            .find("RENAME COLUMN \"thumbnails\" TO \"thumbnails_pickle\"")
            .unwrap();
        let promote = sql
            .find("RENAME COLUMN \"thumbnails_json\" TO \"thumbnails\"")
            .unwrap();
        let not_null = sql
            .find("ALTER COLUMN \"thumbnails\" SET NOT NULL")
            .unwrap();
        let drop = sql.find("DROP COLUMN \"thumbnails_pickle\"").unwrap();
        assert!(park < promote && promote < not_null && not_null < drop);

        assert!(sql.contains("RENAME COLUMN \"similar\" TO \"related_pickle\""));
        assert!(sql.contains("RENAME COLUMN \"related_json\" TO \"related\""));
        assert!(!sql.contains("\"related\" SET NOT NULL"));
    }

    #[test]
    fn test_harden_relation_constraints() {
        let sql = harden_relation("post_like");
        assert!(sql.contains("DROP CONSTRAINT IF EXISTS \"post_like_user_id_fkey\""));
        assert!(sql.contains("REFERENCES \"app_user\"(id) ON DELETE CASCADE"));
        assert!(sql.contains("REFERENCES \"post\"(id) ON DELETE CASCADE"));
        assert!(sql.contains("ADD CONSTRAINT \"post_like_user_post_unique\""));
    }
}
