//! Services layer for learnbridge
//!
//! Clients for the external HTTP collaborators the tools forward to.

pub mod client;

pub use client::{
    KnowledgeService, NewProject, NewTask, ProjectService, ServiceClient, ServiceHealth,
    StoreKnowledgeRequest, StoredDocument, TaskFilter, TaskUpdate,
};

#[cfg(test)]
pub use client::{MockKnowledgeService, MockProjectService};
