//! Stock-count session: configuration, notices, the session controller and
//! the interactive console that drives it.

pub mod config;
pub mod console;
pub mod notice;
pub mod session;

pub use config::AppConfig;
pub use notice::{Notice, NoticeLevel};
pub use session::{CodeLookup, Confirmation, SessionController, SessionError};
