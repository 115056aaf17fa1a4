use std::sync::Arc;

use admin_db::DbHandle;
use admin_query::SchemaRegistry;
use tracing::{debug, info};

use crate::config::AdminConfig;
use crate::contract::client::EntityAdminApi;
use crate::domain::service::Service;
use crate::gateways::local::EntityAdminLocalClient;
use crate::infra::storage::sea_orm_repo::SeaOrmAdminRepository;

/// Wires the SeaORM repository, the domain service and the local client.
#[derive(Clone)]
pub struct EntityAdmin {
    service: Arc<Service>,
}

impl EntityAdmin {
    pub fn init(cfg: &AdminConfig, registry: Arc<SchemaRegistry>, db: &DbHandle) -> Self {
        info!("Initializing entity_admin module");
        debug!(
            "Loaded entity_admin config: default_page_size={}, max_page_size={}, facet_encoding={:?}",
            cfg.default_page_size, cfg.max_page_size, cfg.facet_encoding
        );

        // Wire repository (infra) to domain service (port)
        let repo = SeaOrmAdminRepository::new(db.sea());
        let service = Service::new(registry, Arc::new(repo), cfg.service_config());
        Self {
            service: Arc::new(service),
        }
    }

    pub fn service(&self) -> Arc<Service> {
        Arc::clone(&self.service)
    }

    /// Local in-process client.
    pub fn client(&self) -> Arc<dyn EntityAdminApi> {
        Arc::new(EntityAdminLocalClient::new(self.service()))
    }
}
