use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenient result alias for the whole crate
pub type Result<T> = std::result::Result<T, ApuracaoError>;

/// Fatal error kinds of a run. Data-quality issues (unparseable values,
/// missing keys) are not errors: they are counted and reported once in the
/// summary artifact.
#[derive(Error, Debug)]
pub enum ApuracaoError {
    #[error("falha de conexão com o banco de dados: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("tabela '{table}' não encontrada ou sem colunas no banco")]
    TableNotFound { table: String },

    #[error("coluna obrigatória não encontrada: campo canônico '{field}' na tabela '{table}'")]
    SchemaResolution { table: String, field: &'static str },

    #[error("falha de leitura na tabela '{table}': {source}")]
    Read {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("tempo limite excedido ({secs}s) ao consultar a tabela '{table}'")]
    ReadTimeout { table: String, secs: u64 },

    #[error("falha ao gravar artefato {artifact:?}: {source}")]
    Write {
        artifact: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("falha ao gravar CSV {artifact:?}: {source}")]
    Csv {
        artifact: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("falha ao serializar resumo: {0}")]
    Json(#[from] serde_json::Error),
}
