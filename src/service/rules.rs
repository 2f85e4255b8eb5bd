//! Regras de cálculo por tributo. ICMS/ISS/PIS/COFINS incidem por registro,
//! condicionados pela tabela de tratamento de CFOP; IRPJ/CSLL saem no
//! fechamento, sobre o faturamento acumulado, conforme o enquadramento.

use crate::config::{Regime, TaxParams};
use bigdecimal::rounding::RoundingMode;
use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;

/// Arredondamento fiscal padrão: 2 casas decimais, half-up. Aplicado por
/// registro, antes da acumulação, para que o total independa do chunking.
pub fn round2(v: &BigDecimal) -> BigDecimal {
    v.with_scale_round(2, RoundingMode::HalfUp)
}

/// Quais tributos por registro incidem sobre uma operação
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfopTreatment {
    pub icms: bool,
    pub iss: bool,
    pub pis_cofins: bool,
}

pub const TREATMENT_FULL: CfopTreatment = CfopTreatment {
    icms: true,
    iss: true,
    pis_cofins: true,
};

pub const TREATMENT_EXEMPT: CfopTreatment = CfopTreatment {
    icms: false,
    iss: false,
    pis_cofins: false,
};

/// Tabela de tratamento por código de operação (CFOP). Consulta em três
/// níveis: código exato, prefixo na ordem declarada, default.
#[derive(Debug, Clone)]
pub struct CfopTable {
    exact: HashMap<String, CfopTreatment>,
    prefix: Vec<(String, CfopTreatment)>,
    default: CfopTreatment,
}

impl Default for CfopTable {
    fn default() -> Self {
        Self::padrao()
    }
}

impl CfopTable {
    /// Tabela padrão: exportações (grupo 7) imunes; CFOPs de prestação de
    /// serviço de transporte (5933/6933) fora do ICMS mas dentro do ISS.
    /// O restante recebe a estimativa cheia.
    pub fn padrao() -> Self {
        let mut exact = HashMap::new();
        for code in ["5933", "6933"] {
            exact.insert(
                code.to_string(),
                CfopTreatment {
                    icms: false,
                    iss: true,
                    pis_cofins: true,
                },
            );
        }
        Self {
            exact,
            prefix: vec![("7".to_string(), TREATMENT_EXEMPT)],
            default: TREATMENT_FULL,
        }
    }

    /// Tabela sem exceções, tudo sob o tratamento dado
    pub fn uniform(default: CfopTreatment) -> Self {
        Self {
            exact: HashMap::new(),
            prefix: Vec::new(),
            default,
        }
    }

    pub fn with_exact(mut self, code: &str, treatment: CfopTreatment) -> Self {
        self.exact.insert(code.to_string(), treatment);
        self
    }

    pub fn treatment(&self, cfop: Option<&str>) -> CfopTreatment {
        let Some(code) = cfop.map(str::trim).filter(|c| !c.is_empty()) else {
            return self.default;
        };
        if let Some(t) = self.exact.get(code) {
            return *t;
        }
        for (prefix, t) in &self.prefix {
            if code.starts_with(prefix.as_str()) {
                return *t;
            }
        }
        self.default
    }
}

/// IRPJ e CSLL estimados no fechamento, a partir do faturamento bruto
/// acumulado e do enquadramento configurado.
pub fn irpj_csll(faturamento: &BigDecimal, params: &TaxParams) -> (BigDecimal, BigDecimal) {
    let base = match params.regime {
        Regime::LucroPresumido => faturamento * &params.presuncao,
        Regime::LucroReal => faturamento * &params.margem_estimada,
        Regime::SimplesNacional => return (BigDecimal::zero(), BigDecimal::zero()),
    };
    (
        round2(&(&base * &params.aliq_irpj)),
        round2(&(&base * &params.aliq_csll)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round2_is_half_up() {
        assert_eq!(round2(&dec("20.050")), dec("20.05"));
        assert_eq!(round2(&dec("20.055")), dec("20.06"));
        assert_eq!(round2(&dec("20.054")), dec("20.05"));
        assert_eq!(round2(&dec("10")), dec("10.00"));
    }

    #[test]
    fn test_export_cfop_is_exempt_from_everything() {
        let t = CfopTable::padrao().treatment(Some("7102"));
        assert_eq!(t, TREATMENT_EXEMPT);
    }

    #[test]
    fn test_service_cfop_skips_icms_keeps_iss() {
        let t = CfopTable::padrao().treatment(Some("5933"));
        assert!(!t.icms);
        assert!(t.iss);
        assert!(t.pis_cofins);
    }

    #[test]
    fn test_unknown_and_missing_cfop_get_default() {
        let table = CfopTable::padrao();
        assert_eq!(table.treatment(Some("5102")), TREATMENT_FULL);
        assert_eq!(table.treatment(None), TREATMENT_FULL);
        assert_eq!(table.treatment(Some("  ")), TREATMENT_FULL);
    }

    #[test]
    fn test_exact_entry_beats_prefix() {
        let table = CfopTable::padrao().with_exact("7101", TREATMENT_FULL);
        assert_eq!(table.treatment(Some("7101")), TREATMENT_FULL);
        assert_eq!(table.treatment(Some("7102")), TREATMENT_EXEMPT);
    }

    #[test]
    fn test_irpj_csll_lucro_presumido() {
        let params = TaxParams::default();
        // base presumida = 1000 * 0.08 = 80; IRPJ 15% = 12.00, CSLL 9% = 7.20
        let (irpj, csll) = irpj_csll(&dec("1000"), &params);
        assert_eq!(irpj, dec("12.00"));
        assert_eq!(csll, dec("7.20"));
    }

    #[test]
    fn test_irpj_csll_simples_nacional_is_zero() {
        let params = TaxParams {
            regime: Regime::SimplesNacional,
            ..TaxParams::default()
        };
        let (irpj, csll) = irpj_csll(&dec("1000"), &params);
        assert_eq!(irpj, BigDecimal::zero());
        assert_eq!(csll, BigDecimal::zero());
    }

    #[test]
    fn test_irpj_csll_lucro_real_uses_margin() {
        let params = TaxParams {
            regime: Regime::LucroReal,
            ..TaxParams::default()
        };
        // lucro estimado = 1000 * 0.10 = 100; IRPJ 15.00, CSLL 9.00
        let (irpj, csll) = irpj_csll(&dec("1000"), &params);
        assert_eq!(irpj, dec("15.00"));
        assert_eq!(csll, dec("9.00"));
    }
}
