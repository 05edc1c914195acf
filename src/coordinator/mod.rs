pub mod core;
pub mod output;
pub mod poller;
pub mod session;


pub use self::core::*;
pub use self::output::*;
pub use self::poller::*;
pub use self::session::{DispatchStatus, Session, SessionReport};
