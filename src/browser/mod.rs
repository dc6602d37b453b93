#[cfg(feature = "chrome")]
pub mod chrome;
pub mod event_capture;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::ChromeBrowser;
pub use event_capture::{CapturedEvent, EventCapture};
pub use session::InspectorSession;
