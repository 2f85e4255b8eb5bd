use bigdecimal::BigDecimal;
use sqlx::FromRow;

/// Linha crua da tabela de notas. Os SELECTs dinâmicos fazem cast das
/// colunas mapeadas para text e as renomeiam para os campos canônicos, então
/// todo chunk chega aqui com o mesmo formato, qualquer que seja o schema real.
#[derive(Debug, Clone, FromRow)]
pub struct RawNota {
    pub chave_acesso: Option<String>,
    pub valor_total: Option<String>,
    pub data_emissao: Option<String>,
    pub uf_emitente: Option<String>,
    pub cnpj_emitente: Option<String>,
}

/// Linha crua da tabela de itens
#[derive(Debug, Clone, FromRow)]
pub struct RawItem {
    pub chave_acesso: Option<String>,
    pub valor_item: Option<String>,
    pub valor_unitario: Option<String>,
    pub quantidade: Option<String>,
    pub cfop: Option<String>,
    pub ncm: Option<String>,
}

/// Nota decodificada, pronta para o fold
#[derive(Debug, Clone)]
pub struct NotaRecord {
    pub chave: String,
    pub valor_total: BigDecimal,
    /// Competência "YYYY-MM"; None quando a data está ausente/inconversível
    pub mes_ano: Option<String>,
    pub uf_emitente: Option<String>,
    pub cnpj_emitente: Option<String>,
}

/// Item decodificado, pronto para o fold
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub chave: String,
    pub valor: BigDecimal,
    pub cfop: Option<String>,
    pub ncm: Option<String>,
}
