//! Motor de apuração: dobra chunks de registros nos acumuladores por
//! tributo e nos pivôs de faturamento. A decodificação de cada chunk é
//! paralelizada; a acumulação em si é sequencial, num único ponto de
//! serialização, então o total final independe do tamanho e da ordem dos
//! chunks.

use crate::config::TaxParams;
use crate::models::{ApuracaoResult, ItemRecord, NotaRecord, RawItem, RawNota};
use crate::parse::ValorParser;
use crate::service::decode::{decode_item, decode_nota};
use crate::service::rules::{self, round2, CfopTable};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Limite de exemplos de aviso carregados no resumo; o contador não tem teto
const MAX_WARNING_SAMPLES: usize = 10;

/// Estado mutável de um run. Atualização estritamente aditiva durante a
/// passagem; o snapshot final sai uma única vez em [`Apuracao::finalize`].
pub struct Apuracao {
    params: TaxParams,
    cfop_table: CfopTable,
    parser: ValorParser,

    faturamento: BigDecimal,
    icms: BigDecimal,
    iss: BigDecimal,
    pis: BigDecimal,
    cofins: BigDecimal,

    por_mes: BTreeMap<String, BigDecimal>,
    por_cfop: BTreeMap<String, BigDecimal>,
    por_uf: BTreeMap<String, BigDecimal>,
    por_ncm: BTreeMap<String, BigDecimal>,

    records: u64,
    itens: u64,
    warnings: u64,
    samples: Vec<String>,
}

impl Apuracao {
    pub fn new(params: TaxParams, parser: ValorParser) -> Self {
        Self {
            params,
            cfop_table: CfopTable::default(),
            parser,
            faturamento: BigDecimal::zero(),
            icms: BigDecimal::zero(),
            iss: BigDecimal::zero(),
            pis: BigDecimal::zero(),
            cofins: BigDecimal::zero(),
            por_mes: BTreeMap::new(),
            por_cfop: BTreeMap::new(),
            por_uf: BTreeMap::new(),
            por_ncm: BTreeMap::new(),
            records: 0,
            itens: 0,
            warnings: 0,
            samples: Vec::new(),
        }
    }

    /// Substitui a tabela de tratamento de CFOP padrão
    pub fn with_cfop_table(mut self, table: CfopTable) -> Self {
        self.cfop_table = table;
        self
    }

    /// Decodifica um chunk cru em paralelo e dobra no estado corrente.
    pub fn fold_raw_chunk(&mut self, notas: &[RawNota], itens: &[RawItem]) {
        let base = self.records;
        let parser = self.parser;

        let decoded_notas: Vec<_> = notas
            .par_iter()
            .enumerate()
            .map(|(i, raw)| decode_nota(raw, base + 1 + i as u64, &parser))
            .collect();
        let decoded_itens: Vec<_> = itens
            .par_iter()
            .map(|raw| decode_item(raw, &parser))
            .collect();

        let mut notas_rec = Vec::with_capacity(decoded_notas.len());
        for d in decoded_notas {
            self.registrar_avisos(d.issues);
            notas_rec.push(d.record);
        }
        let mut itens_rec = Vec::with_capacity(decoded_itens.len());
        for d in decoded_itens {
            self.registrar_avisos(d.issues);
            itens_rec.push(d.record);
        }

        self.fold_chunk(&notas_rec, &itens_rec);
    }

    /// Dobra registros já tipados. Uma nota com itens entra pelos valores
    /// dos itens; sem itens, entra pelo próprio valor do cabeçalho.
    pub fn fold_chunk(&mut self, notas: &[NotaRecord], itens: &[ItemRecord]) {
        self.itens += itens.len() as u64;

        let mut por_chave: HashMap<&str, Vec<&ItemRecord>> = HashMap::new();
        for it in itens {
            por_chave.entry(it.chave.as_str()).or_default().push(it);
        }

        let mut consumidas: HashSet<&str> = HashSet::new();
        for nota in notas {
            self.records += 1;
            let mes = nota.mes_ano.as_deref().unwrap_or("unknown");
            let uf = nota.uf_emitente.as_deref().unwrap_or("");
            if let Some(grupo) = por_chave.remove(nota.chave.as_str()) {
                consumidas.insert(nota.chave.as_str());
                for it in grupo {
                    self.lancar(&it.valor, it.cfop.as_deref(), mes, uf, it.ncm.as_deref());
                }
            } else if !consumidas.contains(nota.chave.as_str()) {
                self.lancar(&nota.valor_total, None, mes, uf, None);
            }
            // chave repetida com itens já lançados: só conta o registro
        }

        // itens cuja chave não está no lote: competência desconhecida
        for grupo in por_chave.into_values() {
            for it in grupo {
                self.lancar(&it.valor, it.cfop.as_deref(), "unknown", "", it.ncm.as_deref());
            }
        }
    }

    /// Lança um valor nos acumuladores de tributo e nos pivôs. Incrementos
    /// de tributo arredondados a 2 casas (half-up) por registro.
    fn lancar(
        &mut self,
        valor: &BigDecimal,
        cfop: Option<&str>,
        mes: &str,
        uf: &str,
        ncm: Option<&str>,
    ) {
        let t = self.cfop_table.treatment(cfop);

        self.faturamento = &self.faturamento + valor;
        if t.icms {
            self.icms = &self.icms + round2(&(valor * &self.params.aliq_icms));
        }
        if t.iss {
            self.iss = &self.iss + round2(&(valor * &self.params.aliq_iss));
        }
        if t.pis_cofins {
            self.pis = &self.pis + round2(&(valor * &self.params.aliq_pis));
            self.cofins = &self.cofins + round2(&(valor * &self.params.aliq_cofins));
        }

        add(&mut self.por_mes, mes, valor);
        add(&mut self.por_cfop, cfop.unwrap_or(""), valor);
        add(&mut self.por_uf, uf, valor);
        add(&mut self.por_ncm, ncm.unwrap_or(""), valor);
    }

    fn registrar_avisos(&mut self, issues: Vec<String>) {
        for issue in issues {
            if self.samples.len() < MAX_WARNING_SAMPLES {
                self.samples.push(issue);
            }
            self.warnings += 1;
        }
    }

    /// Fecha o run: calcula IRPJ/CSLL sobre o faturamento acumulado e emite
    /// o snapshot imutável.
    pub fn finalize(self) -> ApuracaoResult {
        let (irpj, csll) = rules::irpj_csll(&self.faturamento, &self.params);
        ApuracaoResult {
            faturamento_bruto: round2(&self.faturamento),
            icms_estimado: round2(&self.icms),
            iss_estimado: round2(&self.iss),
            pis_estimado: round2(&self.pis),
            cofins_estimado: round2(&self.cofins),
            irpj_estimado: irpj,
            csll_estimado: csll,
            faturamento_por_mes: round_map(self.por_mes),
            faturamento_por_cfop: round_map(self.por_cfop),
            faturamento_por_uf_emitente: round_map(self.por_uf),
            faturamento_por_ncm: round_map(self.por_ncm),
            records_processed: self.records,
            itens_processados: self.itens,
            warnings_count: self.warnings,
            warning_samples: self.samples,
            generated_at: Utc::now(),
        }
    }
}

fn add(map: &mut BTreeMap<String, BigDecimal>, key: &str, valor: &BigDecimal) {
    let entry = map.entry(key.to_string()).or_insert_with(BigDecimal::zero);
    *entry = &*entry + valor;
}

fn round_map(map: BTreeMap<String, BigDecimal>) -> BTreeMap<String, BigDecimal> {
    map.into_iter().map(|(k, v)| (k, round2(&v))).collect()
}
