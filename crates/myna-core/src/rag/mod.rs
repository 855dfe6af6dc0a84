//! Retrieval-augmented generation for admissions queries

mod prompt;
mod responder;
mod retriever;
mod threads;

pub use prompt::{build_system_prompt, build_user_message};
pub use responder::{DomainResponder, DOMAIN_APOLOGY, PLACEHOLDER_EMBEDDING_VALUE};
pub use retriever::{
    ContextDocument, ContextRetriever, RetrievedContext, NO_DOCUMENTS_CONTEXT, NO_RELEVANT_CONTEXT,
};
pub use threads::ThreadRegistry;
