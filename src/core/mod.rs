pub mod attachment;
pub mod error;
pub mod history;
pub mod session;
