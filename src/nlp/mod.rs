// NLP module for docdigest
pub mod chunking;
pub mod hierarchical;
pub mod keywords;
pub mod ollama;
pub mod summarization;

pub use hierarchical::{DocumentSummary, HierarchicalSummarizer, SummaryPolicy};
pub use keywords::{Keyword, KeywordExtractor, KeywordSettings};
pub use summarization::{Backend, EngineSettings, SummarizationEngine, Summarizer};
