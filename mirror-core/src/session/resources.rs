//! Resources owned by a session, released in reverse acquisition order.
//!
//! Each field records one completed startup step. Dropping a partially
//! filled [`SessionResources`] unwinds exactly the steps that succeeded,
//! which is how a failed construction rolls back.

use std::sync::Arc;

use tracing::debug;

use crate::discovery::ServiceAdvertiser;
use crate::endpoint::ProtocolEndpoint;
use crate::session::router::SessionRouter;

#[derive(Default)]
pub(crate) struct SessionResources {
    pub(crate) router: Option<Arc<SessionRouter>>,
    pub(crate) endpoint: Option<Box<dyn ProtocolEndpoint>>,
    pub(crate) endpoint_started: bool,
    pub(crate) advertiser: Option<Box<dyn ServiceAdvertiser>>,
    pub(crate) primary_registered: bool,
    pub(crate) companion_registered: bool,
}

impl SessionResources {
    /// Release everything still held. Idempotent and infallible.
    ///
    /// Order: stop and destroy the endpoint, withdraw both records and
    /// destroy the advertiser, then release the decoder.
    pub(crate) fn release(&mut self) {
        if let Some(mut endpoint) = self.endpoint.take() {
            if std::mem::take(&mut self.endpoint_started) {
                debug!("stopping protocol endpoint");
                endpoint.stop();
            }
            debug!("destroying protocol endpoint");
            endpoint.destroy();
        }

        if let Some(mut advertiser) = self.advertiser.take() {
            if std::mem::take(&mut self.primary_registered) {
                advertiser.unregister_primary();
            }
            if std::mem::take(&mut self.companion_registered) {
                advertiser.unregister_companion();
            }
            debug!("destroying service advertiser");
            advertiser.destroy();
        }

        if let Some(router) = self.router.take() {
            debug!("releasing decode pipeline");
            router.shutdown_decoder();
        }
    }

    /// Whether any resource is still held.
    pub(crate) fn is_empty(&self) -> bool {
        self.router.is_none() && self.endpoint.is_none() && self.advertiser.is_none()
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.release();
    }
}
