pub mod mapping;
pub mod record;
pub mod result;

pub use mapping::{HeaderMapping, ItemMapping, ItemValueSource, RunMapping};
pub use record::{ItemRecord, NotaRecord, RawItem, RawNota};
pub use result::{ApuracaoResult, Resumo};
