pub mod browser_manager;
pub mod session;
pub mod stealth;

pub use session::{CdpSession, ChromeLauncher};
