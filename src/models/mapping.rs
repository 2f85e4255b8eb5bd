//! Mapeamento resolvido de campos canônicos para colunas reais da fonte.
//! Calculado uma única vez antes do primeiro chunk e imutável pelo resto do
//! run: é o único lugar do sistema onde acontece "adivinhação" de schema.

/// Mapeamento completo de um run (notas + itens)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMapping {
    pub notas: HeaderMapping,
    pub itens: ItemMapping,
}

/// Colunas resolvidas da tabela de notas (cabeçalhos)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    pub chave: String,
    pub valor_total: String,
    pub data_emissao: Option<String>,
    pub uf_emitente: Option<String>,
    pub cnpj_emitente: Option<String>,
}

/// Colunas resolvidas da tabela de itens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMapping {
    pub chave: String,
    pub valor: ItemValueSource,
    pub cfop: Option<String>,
    pub ncm: Option<String>,
}

/// De onde sai o valor monetário de um item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValueSource {
    /// Coluna direta de valor do item
    Column(String),
    /// Sem coluna de valor: calcular valor_unitario * quantidade
    UnitTimesQty { unit: String, qty: String },
    /// Sem valor algum: cada linha contribui zero e gera aviso
    Missing,
}
