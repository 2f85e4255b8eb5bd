use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot imutável produzido exatamente uma vez ao fim de um run bem
/// sucedido: totais por tributo, pivôs e metadados de qualidade de dados.
/// Valores monetários já arredondados a 2 casas (half-up).
#[derive(Debug, Clone)]
pub struct ApuracaoResult {
    pub faturamento_bruto: BigDecimal,
    pub icms_estimado: BigDecimal,
    pub iss_estimado: BigDecimal,
    pub pis_estimado: BigDecimal,
    pub cofins_estimado: BigDecimal,
    pub irpj_estimado: BigDecimal,
    pub csll_estimado: BigDecimal,

    /// Pivôs de faturamento; BTreeMap garante ordenação ascendente estável
    /// das linhas na emissão.
    pub faturamento_por_mes: BTreeMap<String, BigDecimal>,
    pub faturamento_por_cfop: BTreeMap<String, BigDecimal>,
    pub faturamento_por_uf_emitente: BTreeMap<String, BigDecimal>,
    pub faturamento_por_ncm: BTreeMap<String, BigDecimal>,

    pub records_processed: u64,
    pub itens_processados: u64,
    pub warnings_count: u64,
    pub warning_samples: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Documento de resumo serializado em resumo_apuracao.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resumo {
    pub records_processed: u64,
    pub itens_processados: u64,
    pub faturamento_bruto: BigDecimal,
    pub icms_estimado: BigDecimal,
    pub iss_estimado: BigDecimal,
    pub pis_estimado: BigDecimal,
    pub cofins_estimado: BigDecimal,
    pub irpj_estimado: BigDecimal,
    pub csll_estimado: BigDecimal,
    pub warnings_count: u64,
    pub warning_samples: Vec<String>,
    pub generated_at: String,
}

impl ApuracaoResult {
    pub fn resumo(&self) -> Resumo {
        Resumo {
            records_processed: self.records_processed,
            itens_processados: self.itens_processados,
            faturamento_bruto: self.faturamento_bruto.clone(),
            icms_estimado: self.icms_estimado.clone(),
            iss_estimado: self.iss_estimado.clone(),
            pis_estimado: self.pis_estimado.clone(),
            cofins_estimado: self.cofins_estimado.clone(),
            irpj_estimado: self.irpj_estimado.clone(),
            csll_estimado: self.csll_estimado.clone(),
            warnings_count: self.warnings_count,
            warning_samples: self.warning_samples.clone(),
            generated_at: self.generated_at.to_rfc3339(),
        }
    }
}
