pub mod app;
pub mod config;
pub mod conversation;
pub mod gemini;
pub mod handler;
pub mod location;
pub mod logging;
pub mod render;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, LocationRequest, LocationState};
pub use config::Config;
pub use conversation::Conversation;
pub use gemini::{Answer, AnswerError, AnswerService, GeminiClient, HistoryTurn};
pub use location::{FixedLocation, IpLocator, LocationError, LocationProvider, NoLocation};
pub use state::{Citation, MapCitation, Message, Role, UserLocation, WebCitation};
