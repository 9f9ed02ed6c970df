//! Learning capture pipeline
//!
//! Debugging narratives go through four stages: experiences are extracted
//! (from a transcript or supplied directly), formatted into structured
//! learning entries, optionally summarised as synopses, and finally stored
//! as markdown and in the external knowledge base.

pub mod analyzer;
pub mod extract;
pub mod formatter;
pub mod storage;
pub mod synopsis;

pub use analyzer::analyze_session;
pub use extract::{default_session_experience, extract_experiences};
pub use formatter::{create_learning_entries, create_learning_entry};
pub use storage::{
    render_knowledge_document, render_session_log, store_in_knowledge_base, KnowledgeStore,
    LearningLog, StorageOutcome,
};
pub use synopsis::SynopsisGenerator;
