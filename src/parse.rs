//! Conversão de valores monetários em formato brasileiro ("R$ 1.234,56")
//! para decimal exato. Função pura, isolada do pipeline de I/O: toda a
//! ambiguidade de separadores fica resolvida aqui, com precedência explícita.

use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Parser de valores com localidade brasileira.
///
/// Precedência de separadores:
/// 1. `.` e `,` presentes: `.` é milhar, `,` é decimal ("2.970,00");
/// 2. somente `,`: separador decimal ("2970,00");
/// 3. somente `.`: decimal quando o último `.` é seguido de 1..=N dígitos
///    (N = `decimal_threshold`), senão milhar ("1.234" -> 1234).
///
/// Entrada vazia ou inconversível vira `None`; quem chama decide o fallback
/// (zero) e registra o aviso de qualidade de dados.
#[derive(Debug, Clone, Copy)]
pub struct ValorParser {
    decimal_threshold: usize,
}

impl Default for ValorParser {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ValorParser {
    pub fn new(decimal_threshold: usize) -> Self {
        Self { decimal_threshold }
    }

    pub fn parse(&self, raw: &str) -> Option<BigDecimal> {
        // remove prefixo R$, espaços e qualquer ruído que não seja parte de
        // um número (mantém notação científica tolerada pela fonte)
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | ',' | '.' | 'e' | 'E'))
            .collect();

        if cleaned.is_empty() {
            return None;
        }

        if cleaned.contains(',') {
            // formato BR: pontos são milhar, vírgula é decimal
            let canonical = cleaned.replace('.', "").replace(',', ".");
            return BigDecimal::from_str(&canonical).ok();
        }

        if cleaned.contains('.') {
            if self.is_single_decimal_dot(&cleaned) {
                return BigDecimal::from_str(&cleaned).ok();
            }
            // um ou mais pontos de milhar
            return BigDecimal::from_str(&cleaned.replace('.', "")).ok();
        }

        BigDecimal::from_str(&cleaned).ok()
    }

    /// Um único '.' seguido de 1..=threshold dígitos (e nada mais) é decimal.
    fn is_single_decimal_dot(&self, s: &str) -> bool {
        let mut parts = s.splitn(2, '.');
        let _head = parts.next();
        let Some(tail) = parts.next() else {
            return false;
        };
        !tail.contains('.')
            && !tail.is_empty()
            && tail.len() <= self.decimal_threshold
            && tail.chars().all(|c| c.is_ascii_digit())
    }
}
