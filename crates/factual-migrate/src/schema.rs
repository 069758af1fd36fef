//! Names of the tables, columns and objects the migration touches.
//!
//! Table names use singular form, matching the application schema.

/// The user table before the migration. `user` is reserved in Postgres.
pub const LEGACY_USER_TABLE: &str = "user";
pub const LEGACY_USER_SEQUENCE: &str = "user_id_seq";

pub const USER_TABLE: &str = "app_user";
pub const USER_SEQUENCE: &str = "app_user_id_seq";

/// Alembic's bookkeeping table, obsolete once this migration runs.
pub const ALEMBIC_VERSION_TABLE: &str = "alembic_version";

pub const PLAYLIST_TABLE: &str = "playlist";
pub const POST_TABLE: &str = "post";

/// Relation tables linking a user to a post.
pub const RELATION_TABLES: &[&str] = &["post_fave", "post_like"];

/// A pickled `BYTEA` column that becomes a `JSONB` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyColumn {
    pub table: &'static str,
    /// Column holding the pickled data today.
    pub legacy: &'static str,
    /// Name the JSONB column ends up with.
    pub target: &'static str,
    /// Whether the promoted column is declared `NOT NULL`.
    pub required: bool,
}

impl LegacyColumn {
    /// Nullable JSONB column the transcoded values are written to.
    pub fn staging(&self) -> String {
        format!("{}_json", self.target)
    }

    /// Temporary name the legacy column is parked under during the swap.
    pub fn parked(&self) -> String {
        format!("{}_pickle", self.target)
    }

    pub fn is_related(&self) -> bool {
        *self == RELATED
    }
}

pub const PLAYLIST_THUMBNAILS: LegacyColumn = LegacyColumn {
    table: PLAYLIST_TABLE,
    legacy: "thumbnails",
    target: "thumbnails",
    required: true,
};

pub const PLAYLIST_CHANNEL_THUMBNAILS: LegacyColumn = LegacyColumn {
    table: PLAYLIST_TABLE,
    legacy: "channel_thumbnails",
    target: "channel_thumbnails",
    required: true,
};

pub const POST_THUMBNAILS: LegacyColumn = LegacyColumn {
    table: POST_TABLE,
    legacy: "thumbnails",
    target: "thumbnails",
    required: true,
};

/// `post."similar"` is renamed to `related` on the way.
pub const RELATED: LegacyColumn = LegacyColumn {
    table: POST_TABLE,
    legacy: "similar",
    target: "related",
    required: false,
};

pub const LEGACY_COLUMNS: &[LegacyColumn] = &[
    PLAYLIST_THUMBNAILS,
    PLAYLIST_CHANNEL_THUMBNAILS,
    POST_THUMBNAILS,
    RELATED,
];

/// Value written to every `post.related` under [`crate::RelatedSource::Literal`].
pub const RELATED_LITERAL: &str = "similar";

pub mod search {
    pub const EXTENSION: &str = "pg_trgm";
    pub const COLUMN: &str = "search_vector";
    pub const FUNCTION: &str = "update_post_search_vector";
    pub const TRIGGER: &str = "tsvector_update";
    pub const VECTOR_INDEX: &str = "idx_post_search_vector";
    pub const TITLE_TRGM_INDEX: &str = "idx_post_title_trgm";
    pub const TEXT_SEARCH_CONFIG: &str = "english";

    /// Source columns and their weights, highest priority first.
    pub const WEIGHTS: &[(&str, char)] = &[
        ("title", 'A'),
        ("short_description", 'B'),
        ("description", 'C'),
        ("tags", 'D'),
    ];
}
