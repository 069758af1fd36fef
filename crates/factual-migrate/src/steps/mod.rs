//! The ordered migration steps.
//!
//! Each step's postcondition is the next step's precondition, so the order
//! of [`STEPS`] is fixed.

use crate::StepFn;

mod columns;
mod relations;
mod rename;
mod search;

/// A named unit of the migration.
#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub run: StepFn,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

pub static STEPS: &[Step] = &[
    Step {
        name: "rename_user_table",
        run: rename::rename_user_table,
    },
    Step {
        name: "drop_alembic_version",
        run: rename::drop_alembic_version,
    },
    Step {
        name: "add_staging_columns",
        run: columns::add_staging_columns,
    },
    Step {
        name: "transcode_legacy_columns",
        run: columns::transcode_legacy_columns,
    },
    Step {
        name: "swap_columns",
        run: columns::swap_columns,
    },
    Step {
        name: "delete_orphan_relations",
        run: relations::delete_orphans,
    },
    Step {
        name: "dedupe_relations",
        run: relations::dedupe,
    },
    Step {
        name: "harden_relation_constraints",
        run: relations::harden_constraints,
    },
    Step {
        name: "install_post_search",
        run: search::install_post_search,
    },
];
