use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuração do run completo
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub run: RunConfig,
    pub taxes: TaxParams,
}

/// Parâmetros de conexão com o Postgres
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

/// Parâmetros de execução (chunking, tabelas, saída)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub chunk_size: i64,
    pub out_dir: PathBuf,
    pub notas_table: String,
    pub itens_table: String,
    pub query_timeout_secs: u64,
    /// Dígitos após um único '.' para tratá-lo como separador decimal
    pub decimal_threshold: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20_000,
            out_dir: PathBuf::from("output"),
            notas_table: "notas".to_string(),
            itens_table: "itens".to_string(),
            query_timeout_secs: 30,
            decimal_threshold: 2,
        }
    }
}

/// Enquadramento tributário para IRPJ/CSLL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    LucroPresumido,
    LucroReal,
    SimplesNacional,
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "lucro_presumido" => Ok(Regime::LucroPresumido),
            "lucro_real" => Ok(Regime::LucroReal),
            "simples_nacional" => Ok(Regime::SimplesNacional),
            other => Err(format!(
                "enquadramento inválido '{other}' (esperado: lucro_presumido | lucro_real | simples_nacional)"
            )),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::LucroPresumido => "lucro_presumido",
            Regime::LucroReal => "lucro_real",
            Regime::SimplesNacional => "simples_nacional",
        };
        f.write_str(s)
    }
}

/// Alíquotas e parâmetros de regime. Injetados por configuração, nunca
/// hard-coded nas regras: o mesmo dataset pode ser reapurado sob outras
/// premissas sem releitura da fonte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxParams {
    pub aliq_icms: BigDecimal,
    pub aliq_iss: BigDecimal,
    pub aliq_pis: BigDecimal,
    pub aliq_cofins: BigDecimal,
    pub regime: Regime,
    /// Presunção de lucro (lucro presumido); 0.08 comércio, 0.32 serviços
    pub presuncao: BigDecimal,
    pub aliq_irpj: BigDecimal,
    pub aliq_csll: BigDecimal,
    /// Margem estimada usada somente no lucro real estimado
    pub margem_estimada: BigDecimal,
}

impl Default for TaxParams {
    fn default() -> Self {
        Self {
            // BigDecimal::new(d, s) == d * 10^-s
            aliq_icms: BigDecimal::new(18.into(), 2),       // 0.18
            aliq_iss: BigDecimal::new(5.into(), 2),         // 0.05
            aliq_pis: BigDecimal::new(65.into(), 4),        // 0.0065 (cumulativo)
            aliq_cofins: BigDecimal::new(3.into(), 2),      // 0.03 (cumulativo)
            regime: Regime::LucroPresumido,
            presuncao: BigDecimal::new(8.into(), 2),        // 0.08
            aliq_irpj: BigDecimal::new(15.into(), 2),       // 0.15
            aliq_csll: BigDecimal::new(9.into(), 2),        // 0.09
            margem_estimada: BigDecimal::new(10.into(), 2), // 0.10
        }
    }
}

impl TaxParams {
    /// Carrega os defaults e aplica overrides via variáveis de ambiente
    /// (APURACAO_ALIQ_ICMS, APURACAO_ALIQ_ISS, ...).
    pub fn from_env(regime: Regime) -> Self {
        let mut params = Self {
            regime,
            ..Self::default()
        };
        params.aliq_icms = env_decimal("APURACAO_ALIQ_ICMS", params.aliq_icms);
        params.aliq_iss = env_decimal("APURACAO_ALIQ_ISS", params.aliq_iss);
        params.aliq_pis = env_decimal("APURACAO_ALIQ_PIS", params.aliq_pis);
        params.aliq_cofins = env_decimal("APURACAO_ALIQ_COFINS", params.aliq_cofins);
        params.presuncao = env_decimal("APURACAO_PRESUNCAO", params.presuncao);
        params.aliq_irpj = env_decimal("APURACAO_ALIQ_IRPJ", params.aliq_irpj);
        params.aliq_csll = env_decimal("APURACAO_ALIQ_CSLL", params.aliq_csll);
        params.margem_estimada = env_decimal("APURACAO_MARGEM", params.margem_estimada);
        params
    }
}

fn env_decimal(key: &str, default: BigDecimal) -> BigDecimal {
    std::env::var(key)
        .ok()
        .and_then(|v| BigDecimal::from_str(&v).ok())
        .unwrap_or(default)
}
