//! EngineDeps — the central dependency container for the queue engine.
//!
//! Every external service the engine talks to is a trait object so tests
//! can swap in mocks (spec §1 "Any implementation of the core may mock
//! these"; spec §2 "the clock and the notifier are injected").

use std::sync::Arc;

use crate::config::Config;
use crate::kernel::clock::Clock;
use crate::kernel::identity::IdentityService;
use crate::kernel::notifier::PushNotificationService;
use crate::store::Store;

/// Dependencies accessible to the engine and the HTTP layer.
#[derive(Clone)]
pub struct EngineDeps {
    pub store: Store,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn PushNotificationService>,
    pub identity: Arc<dyn IdentityService>,
    pub config: Arc<Config>,
}

impl EngineDeps {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn PushNotificationService>,
        identity: Arc<dyn IdentityService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            identity,
            config,
        }
    }
}
