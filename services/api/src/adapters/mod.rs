pub mod db;
pub mod renderer;
pub mod summarizer_llm;

pub use db::DbAdapter;
pub use renderer::ChromiumRenderer;
pub use summarizer_llm::BedrockSummaryAdapter;
