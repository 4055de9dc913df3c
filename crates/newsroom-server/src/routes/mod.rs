//! API routes.

pub mod chat;
pub mod health;
pub mod history;
pub mod pagination;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, chat_handler};
pub use health::{HealthResponse, health};
pub use history::{
    get_feedback_handler, get_step_handler, get_thread_handler, list_feedbacks_handler,
    list_steps_handler, list_threads_handler,
};
pub use pagination::PaginationParams;
