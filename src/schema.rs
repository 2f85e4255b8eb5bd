//! Resolução de schema: dado o conjunto de colunas reais de uma tabela,
//! mapeia cada campo canônico para exatamente uma coluna via lista
//! priorizada de padrões. Determinístico: a ordem dos candidatos decide
//! empates, nunca a ordem de chegada dos dados.

use crate::error::{ApuracaoError, Result};
use crate::models::{HeaderMapping, ItemMapping, ItemValueSource};

/// Normaliza nome de coluna: minúsculas, sem acentos, não-alfanuméricos
/// viram underscore ("Valor Total da Nota" -> "valor_total_da_nota").
pub fn normalize_colname(c: &str) -> String {
    let mut out = String::with_capacity(c.len());
    let mut pending_sep = false;
    for ch in c.trim().to_lowercase().chars() {
        let ch = match ch {
            'á' | 'à' | 'ã' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' => 'e',
            'í' | 'ì' | 'î' => 'i',
            'ó' | 'ò' | 'õ' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        };
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Busca a primeira coluna que contém todas as palavras-chave de um
/// candidato, varrendo candidatos em ordem de prioridade e colunas na ordem
/// declarada pela tabela. O primeiro candidato que casar vence.
fn find_best_column<'a>(cols: &'a [String], candidates: &[&[&str]]) -> Option<&'a str> {
    let normalized: Vec<String> = cols.iter().map(|c| normalize_colname(c)).collect();
    for keywords in candidates {
        for (orig, norm) in cols.iter().zip(normalized.iter()) {
            if keywords.iter().all(|k| norm.contains(k)) {
                return Some(orig.as_str());
            }
        }
    }
    None
}

fn require<'a>(
    table: &str,
    field: &'static str,
    found: Option<&'a str>,
) -> Result<&'a str> {
    found.ok_or_else(|| ApuracaoError::SchemaResolution {
        table: table.to_string(),
        field,
    })
}

/// Resolve o mapeamento da tabela de notas. Campos obrigatórios: chave de
/// acesso e valor total; os demais resolvem silenciosamente para "ausente".
pub fn resolve_notas(table: &str, cols: &[String]) -> Result<HeaderMapping> {
    if cols.is_empty() {
        return Err(ApuracaoError::TableNotFound {
            table: table.to_string(),
        });
    }

    let chave = require(
        table,
        "chave_acesso",
        find_best_column(cols, &[&["chave", "acesso"], &["chave"]]),
    )?;
    let valor_total = require(
        table,
        "valor_total",
        find_best_column(
            cols,
            &[&["valor_total"], &["valor_nota"], &["total"], &["valor"]],
        ),
    )?;
    let data_emissao = find_best_column(cols, &[&["data", "emissao"], &["emissao"], &["data"]]);
    let uf_emitente = find_best_column(cols, &[&["uf", "emitente"], &["uf_emit"]]);
    let cnpj_emitente = find_best_column(cols, &[&["cnpj", "emitente"], &["cnpj"]]);

    Ok(HeaderMapping {
        chave: chave.to_string(),
        valor_total: valor_total.to_string(),
        data_emissao: data_emissao.map(str::to_string),
        uf_emitente: uf_emitente.map(str::to_string),
        cnpj_emitente: cnpj_emitente.map(str::to_string),
    })
}

/// Resolve o mapeamento da tabela de itens. Só a chave de acesso é
/// obrigatória; o valor tem cadeia de fallback (coluna direta, depois
/// valor_unitario * quantidade, depois ausente).
pub fn resolve_itens(table: &str, cols: &[String]) -> Result<ItemMapping> {
    if cols.is_empty() {
        return Err(ApuracaoError::TableNotFound {
            table: table.to_string(),
        });
    }

    let chave = require(
        table,
        "chave_acesso",
        find_best_column(cols, &[&["chave", "acesso"], &["chave"]]),
    )?;

    let valor = resolve_item_value(cols);
    let cfop = find_best_column(cols, &[&["cfop"]]);
    let ncm = find_best_column(cols, &[&["ncm"]]);

    Ok(ItemMapping {
        chave: chave.to_string(),
        valor,
        cfop: cfop.map(str::to_string),
        ncm: ncm.map(str::to_string),
    })
}

fn resolve_item_value(cols: &[String]) -> ItemValueSource {
    if let Some(col) = find_best_column(cols, &[&["valor_total"], &["valor_item"]]) {
        return ItemValueSource::Column(col.to_string());
    }

    let unit = find_best_column(cols, &[&["valor_unitario"], &["unitario"]]);
    let qty = find_best_column(cols, &[&["quantidade"], &["qtd"]]);
    if let (Some(unit), Some(qty)) = (unit, qty) {
        return ItemValueSource::UnitTimesQty {
            unit: unit.to_string(),
            qty: qty.to_string(),
        };
    }

    // coluna genérica "valor", desde que não seja o preço unitário
    let generic = cols.iter().find(|c| {
        let n = normalize_colname(c);
        n.contains("valor") && !n.contains("unitario")
    });
    match generic {
        Some(col) => ItemValueSource::Column(col.to_string()),
        None => ItemValueSource::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_colname_strips_accents_and_spaces() {
        assert_eq!(normalize_colname("Chave de Acesso"), "chave_de_acesso");
        assert_eq!(normalize_colname("Data Emissão"), "data_emissao");
        assert_eq!(normalize_colname("VALOR TOTAL (R$)"), "valor_total_r");
        assert_eq!(normalize_colname("  Descrição do Serviço  "), "descricao_do_servico");
    }

    #[test]
    fn test_resolve_notas_typical_schema() {
        let c = cols(&[
            "id",
            "Chave de Acesso",
            "Valor Total da Nota",
            "Data Emissão",
            "UF Emitente",
            "CNPJ Emitente",
        ]);
        let m = resolve_notas("notas", &c).unwrap();
        assert_eq!(m.chave, "Chave de Acesso");
        assert_eq!(m.valor_total, "Valor Total da Nota");
        assert_eq!(m.data_emissao.as_deref(), Some("Data Emissão"));
        assert_eq!(m.uf_emitente.as_deref(), Some("UF Emitente"));
        assert_eq!(m.cnpj_emitente.as_deref(), Some("CNPJ Emitente"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let c = cols(&["chave", "valor", "total_geral", "data"]);
        let a = resolve_notas("notas", &c).unwrap();
        let b = resolve_notas("notas", &c).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_candidate_priority_beats_column_order() {
        // "valor" aparece antes na tabela, mas o candidato "valor_total" tem
        // prioridade maior e deve vencer
        let c = cols(&["chave_acesso", "valor", "valor_total"]);
        let m = resolve_notas("notas", &c).unwrap();
        assert_eq!(m.valor_total, "valor_total");
    }

    #[test]
    fn test_missing_required_field_names_it() {
        let c = cols(&["id", "descricao", "valor_total"]);
        let err = resolve_notas("notas", &c).unwrap_err();
        match err {
            ApuracaoError::SchemaResolution { table, field } => {
                assert_eq!(table, "notas");
                assert_eq!(field, "chave_acesso");
            }
            other => panic!("esperava SchemaResolution, veio {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_resolve_to_absent() {
        let c = cols(&["chave", "valor_total"]);
        let m = resolve_notas("notas", &c).unwrap();
        assert!(m.data_emissao.is_none());
        assert!(m.uf_emitente.is_none());
        assert!(m.cnpj_emitente.is_none());
    }

    #[test]
    fn test_empty_table_fails() {
        assert!(matches!(
            resolve_notas("notas", &[]),
            Err(ApuracaoError::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_item_value_direct_column() {
        let c = cols(&["chave_acesso", "valor_total_item", "cfop", "ncm"]);
        let m = resolve_itens("itens", &c).unwrap();
        assert_eq!(
            m.valor,
            ItemValueSource::Column("valor_total_item".to_string())
        );
        assert_eq!(m.cfop.as_deref(), Some("cfop"));
        assert_eq!(m.ncm.as_deref(), Some("ncm"));
    }

    #[test]
    fn test_item_value_unit_times_qty_fallback() {
        let c = cols(&["chave", "valor_unitario", "quantidade"]);
        let m = resolve_itens("itens", &c).unwrap();
        assert_eq!(
            m.valor,
            ItemValueSource::UnitTimesQty {
                unit: "valor_unitario".to_string(),
                qty: "quantidade".to_string(),
            }
        );
    }

    #[test]
    fn test_item_value_missing() {
        let c = cols(&["chave", "descricao"]);
        let m = resolve_itens("itens", &c).unwrap();
        assert_eq!(m.valor, ItemValueSource::Missing);
        assert!(m.cfop.is_none());
    }
}
