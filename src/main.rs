use apuracao_fiscal::db::queries;
use apuracao_fiscal::models::RunMapping;
use apuracao_fiscal::service::report;
use apuracao_fiscal::{
    create_pool, schema, AppConfig, Apuracao, ApuracaoError, ChunkedReader, DatabaseConfig,
    Regime, Result, RunConfig, TaxParams, ValorParser,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Apuração fiscal estimada (ICMS, ISS, PIS, COFINS, IRPJ, CSLL) a partir
/// de tabelas Postgres de notas e itens.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Host do Postgres
    #[arg(long)]
    host: String,

    /// Porta do Postgres
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Usuário do banco
    #[arg(long)]
    user: String,

    /// Senha do banco
    #[arg(long)]
    password: String,

    /// Nome do banco
    #[arg(long)]
    db: String,

    /// Diretório de saída dos artefatos
    #[arg(long, default_value = "output")]
    out: PathBuf,

    /// Tamanho do chunk de leitura
    #[arg(long, default_value_t = 20_000)]
    chunk: i64,

    /// Enquadramento: lucro_presumido | lucro_real | simples_nacional
    #[arg(long, default_value = "lucro_presumido")]
    regime: Regime,

    /// Tabela de notas (cabeçalhos)
    #[arg(long, default_value = "notas")]
    notas_table: String,

    /// Tabela de itens
    #[arg(long, default_value = "itens")]
    itens_table: String,

    /// Timeout por consulta, em segundos
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Dígitos após um '.' único para tratá-lo como separador decimal
    #[arg(long, default_value_t = 2)]
    decimal_threshold: usize,
}

impl Args {
    fn into_config(self) -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                host: self.host,
                port: self.port,
                user: self.user,
                password: self.password,
                dbname: self.db,
            },
            run: RunConfig {
                chunk_size: self.chunk,
                out_dir: self.out,
                notas_table: self.notas_table,
                itens_table: self.itens_table,
                query_timeout_secs: self.timeout_secs,
                decimal_threshold: self.decimal_threshold,
            },
            taxes: TaxParams::from_env(self.regime),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = Args::parse().into_config();
    if let Err(e) = run(config).await {
        tracing::error!("apuração abortada: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: AppConfig) -> Result<()> {
    info!(
        "Conectando em {}:{}/{}",
        cfg.database.host, cfg.database.port, cfg.database.dbname
    );
    let pool = create_pool(&cfg.database)
        .await
        .map_err(ApuracaoError::Connection)?;

    // 1. resolução de schema, antes de qualquer leitura de chunk
    let notas_cols = table_columns(&pool, &cfg.run.notas_table).await?;
    let itens_cols = table_columns(&pool, &cfg.run.itens_table).await?;
    let mapping = RunMapping {
        notas: schema::resolve_notas(&cfg.run.notas_table, &notas_cols)?,
        itens: schema::resolve_itens(&cfg.run.itens_table, &itens_cols)?,
    };
    info!("Mapeamento resolvido: {:?}", mapping);

    // 2. streaming em chunks + fold sequencial
    let parser = ValorParser::new(cfg.run.decimal_threshold);
    let mut engine = Apuracao::new(cfg.taxes.clone(), parser);
    let mut reader = ChunkedReader::new(pool, &mapping, &cfg.run);
    let mut chunk_i = 0u64;
    while let Some((notas, itens)) = reader.next_chunk().await? {
        chunk_i += 1;
        info!("Chunk {} ({} notas, {} itens)", chunk_i, notas.len(), itens.len());
        engine.fold_raw_chunk(&notas, &itens);
    }
    if chunk_i == 0 {
        warn!("Tabela '{}' vazia; emitindo resultado zerado", cfg.run.notas_table);
    }

    // 3. fechamento e emissão atômica dos artefatos
    let result = engine.finalize();
    report::emit(&cfg.run.out_dir, &result)?;

    info!("Apuração finalizada — artefatos gravados em {:?}", cfg.run.out_dir);
    info!("{}", serde_json::to_string_pretty(&result.resumo())?);
    Ok(())
}

async fn table_columns(pool: &sqlx::PgPool, table: &str) -> Result<Vec<String>> {
    queries::table_columns(pool, table)
        .await
        .map_err(|e| ApuracaoError::Read {
            table: table.to_string(),
            source: e,
        })
}
