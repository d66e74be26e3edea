//! The Session Engine (design §4.6-§4.9): a stack-based navigation core
//! over a fixed set of registered menu handlers, with crash-safe
//! auto-save, a resume path, and a synchronous feedback surface.

mod context;
mod engine;
mod error;
mod feedback;
pub mod handlers;
mod menu_registry;
mod session_data;
mod state;

pub use context::EngineContext;
pub use engine::{ResumeSource, SessionEngine, SessionEngineBuilder, SessionPaths};
pub use error::{SessionError, SessionResult};
pub use feedback::{FeedbackService, ProgressToken};
pub use menu_registry::{Handler, HandlerRegistry};
pub use session_data::{SessionData, SessionMetadata, FORMAT_VERSION};
pub use state::{
    Directive, HandlerOutcome, MediaApiState, MenuTag, NavigationState, ProviderState, State,
    EPISODES, MAIN_MENU, MEDIA_ACTIONS, SEARCH_RESULTS, SERVERS,
};
