//! Consultas sobre schema dinâmico: os SELECTs são montados a partir do
//! mapeamento resolvido, com cast de cada coluna para text e alias no nome
//! canônico. Campos opcionais ausentes viram NULL::text, então toda linha
//! decodifica no mesmo formato de struct.

use crate::models::{HeaderMapping, ItemMapping, ItemValueSource, RawItem, RawNota};
use sqlx::PgPool;

/// Lista as colunas de uma tabela via information_schema, na ordem declarada.
/// Vec vazio significa tabela inexistente (ou sem colunas visíveis).
pub async fn table_columns(pool: &PgPool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT column_name
        FROM information_schema.columns
        WHERE table_name = $1
          AND table_schema = ANY(current_schemas(false))
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(c,)| c).collect())
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn text_col(col: Option<&str>, alias: &str) -> String {
    match col {
        Some(c) => format!("({})::text AS {alias}", quote_ident(c)),
        None => format!("NULL::text AS {alias}"),
    }
}

/// SELECT paginado da tabela de notas. ORDER BY pela chave garante uma
/// passagem determinística; $1 = LIMIT, $2 = OFFSET.
pub fn notas_select(mapping: &HeaderMapping, table: &str) -> String {
    let key = quote_ident(&mapping.chave);
    format!(
        "SELECT {chave}, {valor}, {data}, {uf}, {cnpj} FROM {table} \
         ORDER BY ({key})::text ASC NULLS LAST LIMIT $1 OFFSET $2",
        chave = text_col(Some(&mapping.chave), "chave_acesso"),
        valor = text_col(Some(&mapping.valor_total), "valor_total"),
        data = text_col(mapping.data_emissao.as_deref(), "data_emissao"),
        uf = text_col(mapping.uf_emitente.as_deref(), "uf_emitente"),
        cnpj = text_col(mapping.cnpj_emitente.as_deref(), "cnpj_emitente"),
        table = quote_ident(table),
    )
}

/// SELECT dos itens de um lote de notas; $1 = array de chaves de acesso.
/// Busca somente as chaves do lote corrente, nunca a tabela inteira.
pub fn itens_select(mapping: &ItemMapping, table: &str) -> String {
    let (valor_item, unit, qty) = match &mapping.valor {
        ItemValueSource::Column(c) => (Some(c.as_str()), None, None),
        ItemValueSource::UnitTimesQty { unit, qty } => {
            (None, Some(unit.as_str()), Some(qty.as_str()))
        }
        ItemValueSource::Missing => (None, None, None),
    };
    let key = quote_ident(&mapping.chave);
    format!(
        "SELECT {chave}, {valor}, {vu}, {qt}, {cfop}, {ncm} FROM {table} \
         WHERE ({key})::text = ANY($1)",
        chave = text_col(Some(&mapping.chave), "chave_acesso"),
        valor = text_col(valor_item, "valor_item"),
        vu = text_col(unit, "valor_unitario"),
        qt = text_col(qty, "quantidade"),
        cfop = text_col(mapping.cfop.as_deref(), "cfop"),
        ncm = text_col(mapping.ncm.as_deref(), "ncm"),
        table = quote_ident(table),
    )
}

pub async fn fetch_notas_page(
    pool: &PgPool,
    sql: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<RawNota>, sqlx::Error> {
    sqlx::query_as::<_, RawNota>(sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn fetch_itens_for_chaves(
    pool: &PgPool,
    sql: &str,
    chaves: &[String],
) -> Result<Vec<RawItem>, sqlx::Error> {
    sqlx::query_as::<_, RawItem>(sql)
        .bind(chaves)
        .fetch_all(pool)
        .await
}
