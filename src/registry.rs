//! The three API services and the workflows built on them, sharing one session.

use std::sync::Arc;

use crate::auth::AuthSession;
use crate::config::Config;
use crate::google::{CalendarService, DriveService, GmailService, GoogleApi};
use crate::workflow::WorkflowComposer;

pub struct ServiceRegistry {
    pub gmail: Arc<GmailService>,
    pub drive: DriveService,
    pub calendar: Arc<CalendarService>,
    pub workflows: WorkflowComposer,
}

impl ServiceRegistry {
    /// Compose the services over a verified session. Performs no I/O.
    pub fn new(session: Arc<AuthSession>, config: &Config, http_client: reqwest::Client) -> Self {
        let api = GoogleApi::new(http_client, session, config.endpoints.clone());

        let gmail = Arc::new(GmailService::new(api.clone()));
        let calendar = Arc::new(CalendarService::new(api.clone(), config.time_zone.clone()));
        let workflows = WorkflowComposer::new(gmail.clone(), calendar.clone());

        Self {
            gmail,
            drive: DriveService::new(api),
            calendar,
            workflows,
        }
    }
}
