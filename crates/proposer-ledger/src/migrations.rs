//! Schema migrations, applied with `rusqlite_migration`.
//!
//! One SQL file per migration, embedded with `include_str!`. Unlike the teacher's
//! store crate this does not verify a hash of the applied migration set against a
//! settings table — a single proposer process owns its own database file, so there
//! is no replicated-state-divergence risk to guard against.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

const MIGRATION_SCRIPTS: [&str; 1] = [include_str!("migrations/001-init.sql")];

fn migrations() -> Migrations<'static> {
    Migrations::new(MIGRATION_SCRIPTS.iter().map(|s| M::up(s)).collect())
}

pub fn apply(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    migrations().to_latest(conn)
}
