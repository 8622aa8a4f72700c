pub mod db;
pub mod quote_llm;

pub use db::DbAdapter;
pub use quote_llm::OpenAiQuoteAdapter;
