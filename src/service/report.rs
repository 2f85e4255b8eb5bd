//! Emissão dos artefatos finais. Tudo é gravado primeiro num diretório de
//! staging dentro do destino e renomeado para os nomes finais só depois que
//! cada escrita terminou: quem lê o diretório de saída nunca observa um
//! conjunto de resultados pela metade.

use crate::error::{ApuracaoError, Result};
use crate::models::ApuracaoResult;
use bigdecimal::BigDecimal;
use csv::Writer;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

pub const RESUMO_JSON: &str = "resumo_apuracao.json";
pub const RESUMO_CSV: &str = "resumo_apuracao.csv";
pub const PIVO_MES: &str = "faturamento_por_mes.csv";
pub const PIVO_CFOP: &str = "faturamento_por_cfop.csv";
pub const PIVO_UF: &str = "faturamento_por_uf_emitente.csv";
pub const PIVO_NCM: &str = "faturamento_por_ncm.csv";

const ARTEFATOS: [&str; 6] = [
    RESUMO_JSON,
    RESUMO_CSV,
    PIVO_MES,
    PIVO_CFOP,
    PIVO_UF,
    PIVO_NCM,
];

/// Grava todos os artefatos de um resultado no diretório de saída.
pub fn emit(out_dir: &Path, result: &ApuracaoResult) -> Result<()> {
    let staging = out_dir.join(".staging");
    fs::create_dir_all(&staging).map_err(|e| write_err(&staging, e))?;

    write_resumo_json(&staging.join(RESUMO_JSON), result)?;
    write_resumo_csv(&staging.join(RESUMO_CSV), result)?;
    write_pivot(&staging.join(PIVO_MES), "mes_ano", &result.faturamento_por_mes)?;
    write_pivot(&staging.join(PIVO_CFOP), "cfop", &result.faturamento_por_cfop)?;
    write_pivot(&staging.join(PIVO_UF), "uf_emit", &result.faturamento_por_uf_emitente)?;
    write_pivot(&staging.join(PIVO_NCM), "ncm", &result.faturamento_por_ncm)?;

    // tudo escrito; publica com renames
    for name in ARTEFATOS {
        let destino = out_dir.join(name);
        fs::rename(staging.join(name), &destino).map_err(|e| write_err(&destino, e))?;
    }
    let _ = fs::remove_dir(&staging);
    Ok(())
}

fn write_err(artifact: &Path, source: io::Error) -> ApuracaoError {
    ApuracaoError::Write {
        artifact: artifact.to_path_buf(),
        source,
    }
}

fn write_resumo_json(path: &Path, result: &ApuracaoResult) -> Result<()> {
    let json = serde_json::to_vec_pretty(&result.resumo())?;
    fs::write(path, json).map_err(|e| write_err(path, e))
}

fn write_resumo_csv(path: &Path, result: &ApuracaoResult) -> Result<()> {
    let file = File::create(path).map_err(|e| write_err(path, e))?;
    let mut writer = Writer::from_writer(file);
    let resumo = result.resumo();

    writer
        .write_record([
            "records_processed",
            "itens_processados",
            "faturamento_bruto",
            "icms_estimado",
            "iss_estimado",
            "pis_estimado",
            "cofins_estimado",
            "irpj_estimado",
            "csll_estimado",
            "warnings_count",
            "generated_at",
        ])
        .map_err(|e| csv_err(path, e))?;
    writer
        .write_record([
            resumo.records_processed.to_string(),
            resumo.itens_processados.to_string(),
            resumo.faturamento_bruto.to_string(),
            resumo.icms_estimado.to_string(),
            resumo.iss_estimado.to_string(),
            resumo.pis_estimado.to_string(),
            resumo.cofins_estimado.to_string(),
            resumo.irpj_estimado.to_string(),
            resumo.csll_estimado.to_string(),
            resumo.warnings_count.to_string(),
            resumo.generated_at,
        ])
        .map_err(|e| csv_err(path, e))?;

    writer.flush().map_err(|e| write_err(path, e))
}

fn csv_err(artifact: &Path, source: csv::Error) -> ApuracaoError {
    ApuracaoError::Csv {
        artifact: artifact.to_path_buf(),
        source,
    }
}

/// Um pivô por dimensão: coluna de chave de agrupamento e faturamento.
/// O BTreeMap de origem garante linhas em ordem ascendente de chave.
fn write_pivot(path: &Path, key_header: &str, rows: &BTreeMap<String, BigDecimal>) -> Result<()> {
    let file = File::create(path).map_err(|e| write_err(path, e))?;
    let mut writer = Writer::from_writer(file);

    writer
        .write_record([key_header, "faturamento"])
        .map_err(|e| csv_err(path, e))?;
    for (key, valor) in rows {
        writer
            .write_record([key.as_str(), &valor.to_string()])
            .map_err(|e| csv_err(path, e))?;
    }

    writer.flush().map_err(|e| write_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resumo;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn fixture() -> ApuracaoResult {
        let mut por_mes = BTreeMap::new();
        por_mes.insert("2024-02".to_string(), dec("200.00"));
        por_mes.insert("2024-01".to_string(), dec("100.00"));
        let mut por_cfop = BTreeMap::new();
        por_cfop.insert("5102".to_string(), dec("300.00"));

        ApuracaoResult {
            faturamento_bruto: dec("300.00"),
            icms_estimado: dec("54.00"),
            iss_estimado: dec("15.00"),
            pis_estimado: dec("1.95"),
            cofins_estimado: dec("9.00"),
            irpj_estimado: dec("3.60"),
            csll_estimado: dec("2.16"),
            faturamento_por_mes: por_mes,
            faturamento_por_cfop: por_cfop,
            faturamento_por_uf_emitente: BTreeMap::new(),
            faturamento_por_ncm: BTreeMap::new(),
            records_processed: 2,
            itens_processados: 5,
            warnings_count: 1,
            warning_samples: vec!["valor_total inconversível ('N/D') na nota k".to_string()],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_emit_writes_all_artifacts_and_no_staging() {
        let dir = tempfile::tempdir().unwrap();
        emit(dir.path(), &fixture()).unwrap();

        for name in ARTEFATOS {
            assert!(dir.path().join(name).exists(), "faltou {name}");
        }
        assert!(!dir.path().join(".staging").exists());
    }

    #[test]
    fn test_pivot_rows_sorted_ascending_by_key() {
        let dir = tempfile::tempdir().unwrap();
        emit(dir.path(), &fixture()).unwrap();

        let content = fs::read_to_string(dir.path().join(PIVO_MES)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "mes_ano,faturamento");
        assert_eq!(lines[1], "2024-01,100.00");
        assert_eq!(lines[2], "2024-02,200.00");
    }

    #[test]
    fn test_reemission_is_byte_identical_for_pivots() {
        let result = fixture();
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        emit(dir_a.path(), &result).unwrap();
        emit(dir_b.path(), &result).unwrap();

        for name in [PIVO_MES, PIVO_CFOP, PIVO_UF, PIVO_NCM] {
            let a = fs::read(dir_a.path().join(name)).unwrap();
            let b = fs::read(dir_b.path().join(name)).unwrap();
            assert_eq!(a, b, "pivô {name} divergiu entre emissões");
        }
    }

    #[test]
    fn test_resumo_json_round_trips_with_expected_keys() {
        let dir = tempfile::tempdir().unwrap();
        emit(dir.path(), &fixture()).unwrap();

        let raw = fs::read_to_string(dir.path().join(RESUMO_JSON)).unwrap();
        let resumo: Resumo = serde_json::from_str(&raw).unwrap();
        assert_eq!(resumo.records_processed, 2);
        assert_eq!(resumo.warnings_count, 1);
        assert_eq!(resumo.icms_estimado, dec("54.00"));
        assert_eq!(resumo.warning_samples.len(), 1);
    }

    #[test]
    fn test_unwritable_destination_names_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // arquivo no lugar do diretório de saída
        let bogus = dir.path().join("saida");
        fs::write(&bogus, b"x").unwrap();

        let err = emit(&bogus, &fixture()).unwrap_err();
        assert!(matches!(err, ApuracaoError::Write { .. }));
    }
}
