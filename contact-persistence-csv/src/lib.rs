pub mod contacts;
pub mod record;

pub use contacts::CsvContactRepository;
