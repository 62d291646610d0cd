//! Resource cache: the last `/api/status` snapshot.

use std::sync::RwLock;

use aimg_core::catalog::{ResourceCatalog, ServerHealth, StatusResponse};

/// Holds the catalog and server list, replaced wholesale on every refresh.
#[derive(Debug, Default)]
pub struct ResourceCache {
    snapshot: RwLock<StatusResponse>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, status: StatusResponse) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn catalog(&self) -> ResourceCatalog {
        ResourceCatalog::from(&*self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn servers(&self) -> Vec<ServerHealth> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .servers
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_replaces_everything() {
        let cache = ResourceCache::new();
        cache.replace(StatusResponse {
            models: vec!["a".into(), "b".into()],
            loras: vec!["l".into()],
            ..Default::default()
        });
        cache.replace(StatusResponse {
            models: vec!["c".into()],
            ..Default::default()
        });

        let catalog = cache.catalog();
        assert_eq!(catalog.models, vec!["c"]);
        assert!(catalog.loras.is_empty());
        assert!(cache.servers().is_empty());
    }
}
