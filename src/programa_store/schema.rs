//! SQLite schema for the programa database.

use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const PROGRAMAS_TABLE_V1: Table = Table {
    name: "programas",
    columns: &[
        Column::new("codigo", SqlType::Text).primary_key(),
        Column::new("padrao1", SqlType::Real).not_null(),
        Column::new("qtd_matrizes", SqlType::Integer).not_null(),
    ],
    indices: &[],
};

const MATRIZARIA_TABLE_V1: Table = Table {
    name: "matrizaria",
    columns: &[
        Column::new("id", SqlType::Integer).primary_key(),
        Column::new("programa_codigo", SqlType::Text)
            .not_null()
            .references("programas", "codigo"),
        Column::new("numeracao", SqlType::Real).not_null(),
        Column::new("matrizes", SqlType::Real).not_null(),
        Column::new("giros_inicial", SqlType::Real).not_null(),
    ],
    indices: &[("idx_matrizaria_programa_codigo", "programa_codigo")],
};

// =============================================================================
// Version 2 - updated_at audit column on programas
// =============================================================================

/// Rows migrated from v1 keep an empty updated_at until their next write.
const PROGRAMAS_TABLE_V2: Table = Table {
    name: "programas",
    columns: &[
        Column::new("codigo", SqlType::Text).primary_key(),
        Column::new("padrao1", SqlType::Real).not_null(),
        Column::new("qtd_matrizes", SqlType::Integer).not_null(),
        Column::new("updated_at", SqlType::Text)
            .not_null()
            .default_value("''"),
    ],
    indices: &[],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute(
        "ALTER TABLE programas ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

/// All versioned schemas for the programa database.
///
/// Version 1: programas + matrizaria tables
/// Version 2: updated_at audit column on programas
pub const PROGRAMA_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[PROGRAMAS_TABLE_V1, MATRIZARIA_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[PROGRAMAS_TABLE_V2, MATRIZARIA_TABLE_V1],
        migration: Some(migrate_v1_to_v2),
    },
];
