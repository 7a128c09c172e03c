//! Google API services
//!
//! Thin forwarding layers over the Gmail, Drive and Calendar REST APIs.

pub mod api;
pub mod calendar;
pub mod drive;
pub mod gmail;
pub mod message;
pub mod types;

pub use api::GoogleApi;
pub use calendar::{CalendarService, NewMeeting};
pub use drive::DriveService;
pub use gmail::GmailService;
