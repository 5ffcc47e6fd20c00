pub mod session;

pub use session::logout as session_logout;
