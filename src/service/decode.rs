//! Decodificação de linhas cruas (text) em registros tipados. Cada linha
//! produz o registro mais a lista de avisos de qualidade de dados gerados
//! no caminho (valor inconversível, chave ausente com fallback ordinal).

use crate::models::{ItemRecord, NotaRecord, RawItem, RawNota};
use crate::parse::ValorParser;
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;

#[derive(Debug)]
pub struct Decoded<T> {
    pub record: T,
    pub issues: Vec<String>,
}

/// Decodifica uma nota. `ordinal` é a posição global da linha no run, usada
/// como chave substituta quando a chave de acesso está ausente.
pub fn decode_nota(raw: &RawNota, ordinal: u64, parser: &ValorParser) -> Decoded<NotaRecord> {
    let mut issues = Vec::new();

    let chave = match raw.chave_acesso.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => {
            issues.push(format!("nota sem chave de acesso; usando ordinal {ordinal}"));
            format!("linha_{ordinal}")
        }
    };

    let valor_total = match raw.valor_total.as_deref().and_then(|v| parser.parse(v)) {
        Some(v) => v,
        None => {
            issues.push(format!(
                "valor_total inconversível ('{}') na nota {chave}",
                raw.valor_total.as_deref().unwrap_or("")
            ));
            BigDecimal::zero()
        }
    };

    let mes_ano = raw
        .data_emissao
        .as_deref()
        .and_then(parse_data)
        .map(|d| d.format("%Y-%m").to_string());

    let record = NotaRecord {
        chave,
        valor_total,
        mes_ano,
        uf_emitente: clean(&raw.uf_emitente).map(|s| s.to_uppercase()),
        cnpj_emitente: clean(&raw.cnpj_emitente),
    };
    Decoded { record, issues }
}

/// Decodifica um item. Cadeia de valor: coluna direta, senão
/// valor_unitario * quantidade, senão zero com aviso.
pub fn decode_item(raw: &RawItem, parser: &ValorParser) -> Decoded<ItemRecord> {
    let mut issues = Vec::new();

    let chave = raw
        .chave_acesso
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    let direto = raw.valor_item.as_deref().and_then(|v| parser.parse(v));
    let valor = match direto {
        Some(v) => v,
        None => {
            let unit = raw.valor_unitario.as_deref().and_then(|v| parser.parse(v));
            let qty = raw.quantidade.as_deref().and_then(|v| parser.parse(v));
            match (unit, qty) {
                (Some(u), Some(q)) => u * q,
                _ => {
                    issues.push(format!(
                        "valor do item inconversível ('{}') na chave {chave}",
                        raw.valor_item.as_deref().unwrap_or("")
                    ));
                    BigDecimal::zero()
                }
            }
        }
    };

    let record = ItemRecord {
        chave,
        valor,
        cfop: clean(&raw.cfop),
        ncm: clean(&raw.ncm),
    };
    Decoded { record, issues }
}

fn clean(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Datas chegam como text em formatos variados; dayfirst tem prioridade nos
/// formatos com barra, como na fonte original.
fn parse_data(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // ignora componente de hora, se houver
    let head = s.get(..10).unwrap_or(s);
    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn raw_nota(chave: Option<&str>, valor: Option<&str>, data: Option<&str>) -> RawNota {
        RawNota {
            chave_acesso: chave.map(str::to_string),
            valor_total: valor.map(str::to_string),
            data_emissao: data.map(str::to_string),
            uf_emitente: None,
            cnpj_emitente: None,
        }
    }

    #[test]
    fn test_decode_nota_parses_value_and_month() {
        let p = ValorParser::default();
        let d = decode_nota(&raw_nota(Some("abc123"), Some("R$ 1.234,56"), Some("2024-03-15")), 1, &p);
        assert!(d.issues.is_empty());
        assert_eq!(d.record.valor_total, BigDecimal::from_str("1234.56").unwrap());
        assert_eq!(d.record.mes_ano.as_deref(), Some("2024-03"));
    }

    #[test]
    fn test_decode_nota_dayfirst_date() {
        let p = ValorParser::default();
        let d = decode_nota(&raw_nota(Some("k"), Some("10,00"), Some("15/03/2024 10:22:00")), 1, &p);
        assert_eq!(d.record.mes_ano.as_deref(), Some("2024-03"));
    }

    #[test]
    fn test_decode_nota_missing_key_falls_back_to_ordinal() {
        let p = ValorParser::default();
        let d = decode_nota(&raw_nota(None, Some("10,00"), None), 42, &p);
        assert_eq!(d.record.chave, "linha_42");
        assert_eq!(d.issues.len(), 1);
    }

    #[test]
    fn test_decode_nota_unparseable_value_warns_once_and_zeroes() {
        let p = ValorParser::default();
        let d = decode_nota(&raw_nota(Some("k"), Some("N/D"), None), 1, &p);
        assert_eq!(d.record.valor_total, BigDecimal::zero());
        assert_eq!(d.issues.len(), 1);
    }

    #[test]
    fn test_decode_item_unit_times_qty_fallback() {
        let p = ValorParser::default();
        let raw = RawItem {
            chave_acesso: Some("k".to_string()),
            valor_item: None,
            valor_unitario: Some("2,50".to_string()),
            quantidade: Some("4".to_string()),
            cfop: Some(" 5102 ".to_string()),
            ncm: None,
        };
        let d = decode_item(&raw, &p);
        assert!(d.issues.is_empty());
        assert_eq!(d.record.valor, BigDecimal::from_str("10.00").unwrap());
        assert_eq!(d.record.cfop.as_deref(), Some("5102"));
    }

    #[test]
    fn test_decode_item_without_any_value_warns() {
        let p = ValorParser::default();
        let raw = RawItem {
            chave_acesso: Some("k".to_string()),
            valor_item: None,
            valor_unitario: None,
            quantidade: None,
            cfop: None,
            ncm: None,
        };
        let d = decode_item(&raw, &p);
        assert_eq!(d.record.valor, BigDecimal::zero());
        assert_eq!(d.issues.len(), 1);
    }
}
