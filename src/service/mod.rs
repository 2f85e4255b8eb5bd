pub mod apuracao;
pub mod decode;
pub mod report;
pub mod rules;

pub use apuracao::Apuracao;
pub use rules::{CfopTable, CfopTreatment};
