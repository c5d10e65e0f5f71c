use super::schema::PROGRAMA_VERSIONED_SCHEMAS;
use super::{MatrizEntry, Programa, ProgramaStore, StoreError};
use crate::sqlite_persistence::ensure_schema;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct SqliteProgramaStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProgramaStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open programa database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new programa database at {:?}", path);
            PROGRAMA_VERSIONED_SCHEMAS
                .last()
                .context("No schema versions declared")?
                .create(&conn)?;
        } else {
            ensure_schema(&mut conn, PROGRAMA_VERSIONED_SCHEMAS)
                .context("Programa database schema check failed")?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Drops every matrizaria row of the codigo and inserts the given set.
    /// Runs inside the caller's transaction so a failed insert rolls back the
    /// parent write too.
    fn replace_matrizaria(
        tx: &Transaction,
        codigo: &str,
        entries: &[MatrizEntry],
    ) -> rusqlite::Result<()> {
        tx.execute(
            "DELETE FROM matrizaria WHERE programa_codigo = ?1",
            params![codigo],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO matrizaria (programa_codigo, numeracao, matrizes, giros_inicial)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for entry in entries {
            stmt.execute(params![
                codigo,
                entry.numeracao,
                entry.matrizes,
                entry.giros_inicial
            ])?;
        }
        Ok(())
    }
}

impl ProgramaStore for SqliteProgramaStore {
    fn upsert(&self, programa: &Programa) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO programas (codigo, padrao1, qtd_matrizes, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(codigo) DO UPDATE SET
               padrao1 = excluded.padrao1,
               qtd_matrizes = excluded.qtd_matrizes,
               updated_at = excluded.updated_at",
            params![
                programa.codigo,
                programa.padrao1,
                programa.qtd_matrizes,
                Utc::now().to_rfc3339()
            ],
        )?;
        Self::replace_matrizaria(&tx, &programa.codigo, &programa.dados_matrizaria)?;

        tx.commit()?;
        Ok(())
    }

    fn get(&self, codigo: &str) -> Result<Programa, StoreError> {
        let conn = self.conn.lock().unwrap();

        let parent = conn
            .query_row(
                "SELECT padrao1, qtd_matrizes FROM programas WHERE codigo = ?1",
                params![codigo],
                |row| Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let Some((padrao1, qtd_matrizes)) = parent else {
            return Err(StoreError::NotFound(codigo.to_string()));
        };

        let mut stmt = conn.prepare(
            "SELECT numeracao, matrizes, giros_inicial FROM matrizaria
             WHERE programa_codigo = ?1 ORDER BY id",
        )?;
        let dados_matrizaria = stmt
            .query_map(params![codigo], |row| {
                Ok(MatrizEntry {
                    numeracao: row.get(0)?,
                    matrizes: row.get(1)?,
                    giros_inicial: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Programa {
            codigo: codigo.to_string(),
            padrao1,
            qtd_matrizes,
            dados_matrizaria,
        })
    }

    fn update(&self, programa: &Programa) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let changes = tx.execute(
            "UPDATE programas SET padrao1 = ?1, qtd_matrizes = ?2, updated_at = ?3
             WHERE codigo = ?4",
            params![
                programa.padrao1,
                programa.qtd_matrizes,
                Utc::now().to_rfc3339(),
                programa.codigo
            ],
        )?;
        if changes == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound(programa.codigo.clone()));
        }
        Self::replace_matrizaria(&tx, &programa.codigo, &programa.dados_matrizaria)?;

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, codigo: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        // Matrizaria rows go via ON DELETE CASCADE.
        let removed = conn.execute(
            "DELETE FROM programas WHERE codigo = ?1",
            params![codigo],
        )?;
        Ok(removed)
    }

    fn wipe(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM matrizaria", [])?;
        let removed = tx.execute("DELETE FROM programas", [])?;
        tx.commit()?;

        // Reclaim file space after a full wipe. Failure is not fatal.
        if let Err(err) = conn.execute("VACUUM", []) {
            warn!("VACUUM after wipe failed: {}", err);
        }

        Ok(removed)
    }
}
