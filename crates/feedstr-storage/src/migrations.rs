// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled in with `embed_migrations!` and
//! applied every time the log is opened.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply pending migrations. Refinery records progress in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), String> {
    embedded::migrations::runner()
        .run(conn)
        .map(|report| {
            for migration in report.applied_migrations() {
                tracing::debug!(migration = %migration, "applied migration");
            }
        })
        .map_err(|e| e.to_string())
}
