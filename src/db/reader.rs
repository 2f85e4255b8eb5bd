use crate::config::RunConfig;
use crate::db::queries;
use crate::error::{ApuracaoError, Result};
use crate::models::{RawItem, RawNota, RunMapping};
use indexmap::IndexSet;
use sqlx::PgPool;
use std::time::Duration;

/// Leitor de chunks: uma única passagem para frente sobre a tabela de notas,
/// puxando para cada lote somente os itens das chaves presentes nele. Memória
/// limitada a O(chunk) seja qual for o tamanho das tabelas. Não reiniciável:
/// consumiu, acabou.
pub struct ChunkedReader {
    pool: PgPool,
    notas_sql: String,
    itens_sql: String,
    notas_table: String,
    itens_table: String,
    chunk_size: i64,
    timeout: Duration,
    offset: i64,
    exhausted: bool,
}

impl ChunkedReader {
    pub fn new(pool: PgPool, mapping: &RunMapping, cfg: &RunConfig) -> Self {
        Self {
            notas_sql: queries::notas_select(&mapping.notas, &cfg.notas_table),
            itens_sql: queries::itens_select(&mapping.itens, &cfg.itens_table),
            notas_table: cfg.notas_table.clone(),
            itens_table: cfg.itens_table.clone(),
            chunk_size: cfg.chunk_size,
            timeout: Duration::from_secs(cfg.query_timeout_secs),
            pool,
            offset: 0,
            exhausted: false,
        }
    }

    /// Próximo par (lote de notas, itens correspondentes), ou None ao
    /// esgotar a fonte. Qualquer falha ou estouro de timeout aborta o run.
    pub async fn next_chunk(&mut self) -> Result<Option<(Vec<RawNota>, Vec<RawItem>)>> {
        if self.exhausted {
            return Ok(None);
        }

        let fetch = queries::fetch_notas_page(
            &self.pool,
            &self.notas_sql,
            self.chunk_size,
            self.offset,
        );
        let notas = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                return Err(ApuracaoError::Read {
                    table: self.notas_table.clone(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(ApuracaoError::ReadTimeout {
                    table: self.notas_table.clone(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if notas.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        self.offset += notas.len() as i64;
        if notas.len() < self.chunk_size as usize {
            self.exhausted = true;
        }

        // chaves do lote, deduplicadas com ordem preservada
        let chaves: Vec<String> = notas
            .iter()
            .filter_map(|n| n.chave_acesso.clone())
            .collect::<IndexSet<String>>()
            .into_iter()
            .collect();

        let itens = if chaves.is_empty() {
            Vec::new()
        } else {
            let fetch = queries::fetch_itens_for_chaves(&self.pool, &self.itens_sql, &chaves);
            match tokio::time::timeout(self.timeout, fetch).await {
                Ok(Ok(rows)) => rows,
                Ok(Err(e)) => {
                    return Err(ApuracaoError::Read {
                        table: self.itens_table.clone(),
                        source: e,
                    })
                }
                Err(_) => {
                    return Err(ApuracaoError::ReadTimeout {
                        table: self.itens_table.clone(),
                        secs: self.timeout.as_secs(),
                    })
                }
            }
        };

        Ok(Some((notas, itens)))
    }
}
