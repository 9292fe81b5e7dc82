//! Lead generation dashboard: an in-memory lead store, a generative-AI
//! lead source, filtered/paginated views, and the HTTP surface over them.

pub mod config;
pub mod engine;
pub mod error;
pub mod lead_agent;
pub mod memory;
pub mod routes;
pub mod settings;
pub mod view;

pub use engine::Dashboard;
pub use lead_agent::{GeminiLeads, LeadSource};
pub use memory::{Lead, LeadDraft, LeadStatus, LeadStore};
pub use routes::{create_router, AppState, SharedState};
pub use view::StatusFilter;
