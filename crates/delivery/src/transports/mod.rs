//! Transport implementations
//!
//! Contains HttpTransport and ScriptedTransport.

mod http;
mod scripted;

pub use self::http::HttpTransport;
pub use self::scripted::ScriptedTransport;
