pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod parse;
pub mod schema;
pub mod service;

pub use config::{AppConfig, DatabaseConfig, Regime, RunConfig, TaxParams};
pub use db::{create_pool, ChunkedReader};
pub use error::{ApuracaoError, Result};
pub use parse::ValorParser;
pub use service::Apuracao;
