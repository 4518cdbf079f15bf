pub mod completion;
pub mod db;
pub mod memory;
pub mod pdf;
pub mod study_llm;

pub use completion::{FallbackClient, HttpTransport, RetryPolicy};
pub use db::DbAdapter;
pub use memory::MemoryNoteStore;
pub use pdf::PdfExtractAdapter;
pub use study_llm::OpenRouterStudyAdapter;
