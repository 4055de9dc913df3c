//! Conversation history storage for newsroom.
//!
//! Users own threads; a thread holds the steps of its chat turns and any
//! feedback left on them. Everything lives in one SQLite file.
//!
//! ```text
//! users 1──* threads 1──* steps
//!                    1──* feedbacks
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use newsroom_store::{Store, TurnRecord};
//!
//! let store = Store::open("newsroom.db")?;
//! let thread_id = store.record_turn(&TurnRecord {
//!     thread_id: None,
//!     user_identifier: Some("admin".into()),
//!     user_input: "How is Nvidia doing?".into(),
//!     news: None,
//!     output: "Shares are up.".into(),
//!     model: "gpt-4o".into(),
//!     streaming: false,
//! })?;
//! let steps = store.list_steps(thread_id)?;
//! # Ok::<(), newsroom_store::StoreError>(())
//! ```

pub mod error;
mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::Store;
pub use types::{
    Feedback, NewStep, NewThread, StepType, Step, Thread, TurnRecord, User, format_timestamp,
};
