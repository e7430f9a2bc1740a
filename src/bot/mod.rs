//! Bot module - Telegram transport.

pub mod dispatcher;
pub mod reply;
mod runtime;
mod webhook;

pub use dispatcher::build_dispatcher;
pub use runtime::run;
