//! Entity-level data access.
//!
//! Samples go through the cached [`SampleRepository`]; clients and users
//! hit the API directly.

use tracing::{debug, instrument};

use super::client::ApiClient;
use super::error::Result;
use super::samples::{SampleRepository, SharedSampleCache};
use super::types::{CatalogItem, Lookup, Page};
use crate::cache::CacheStatus;
use crate::catalog::Entity;
use crate::table::Row;

/// Country and province lists, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookups {
    pub countries: Vec<CatalogItem>,
    pub provinces: Vec<CatalogItem>,
}

impl Lookups {
    /// Display name of `id` in `lookup`, if known.
    pub fn name_of(&self, lookup: Lookup, id: &str) -> Option<&str> {
        let items = match lookup {
            Lookup::Countries => &self.countries,
            Lookup::Provinces => &self.provinces,
        };
        items.iter().find(|i| i.id == id).map(|i| i.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.provinces.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DataSource {
    client: ApiClient,
    samples: SampleRepository,
}

impl DataSource {
    pub fn new(client: ApiClient, sample_cache: SharedSampleCache) -> Self {
        Self {
            samples: SampleRepository::new(client.clone(), sample_cache),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn samples(&self) -> &SampleRepository {
        &self.samples
    }

    pub async fn list_page(
        &self,
        entity: Entity,
        page: u32,
        page_size: u32,
    ) -> Result<(Page, CacheStatus)> {
        match entity {
            Entity::Samples => self.samples.list_page(page, page_size).await,
            _ => Ok((
                self.client.list_page(entity, page, page_size).await?,
                CacheStatus::Fresh,
            )),
        }
    }

    pub async fn get(&self, entity: Entity, id: &str) -> Result<(Row, CacheStatus)> {
        match entity {
            Entity::Samples => self.samples.get(id).await,
            _ => Ok((self.client.get_record(entity, id).await?, CacheStatus::Fresh)),
        }
    }

    pub async fn delete(&self, entity: Entity, id: &str) -> Result<()> {
        match entity {
            Entity::Samples => self.samples.delete(id).await,
            _ => self.client.delete_record(entity, id).await,
        }
    }

    /// Fetch both lookup lists concurrently.
    #[instrument(skip(self))]
    pub async fn lookups(&self) -> Result<Lookups> {
        let (countries, provinces) = tokio::try_join!(
            self.client.list_lookup(Lookup::Countries),
            self.client.list_lookup(Lookup::Provinces),
        )?;
        debug!(
            countries = countries.len(),
            provinces = provinces.len(),
            "Fetched lookups"
        );
        Ok(Lookups {
            countries,
            provinces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::samples::SampleCache;
    use crate::api::test_server::serve_once;
    use std::time::Duration;

    fn item(id: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_lookup_name_of() {
        let lookups = Lookups {
            countries: vec![item("34", "España"), item("351", "Portugal")],
            provinces: vec![item("30", "Murcia")],
        };
        assert_eq!(lookups.name_of(Lookup::Countries, "351"), Some("Portugal"));
        assert_eq!(lookups.name_of(Lookup::Provinces, "30"), Some("Murcia"));
        assert_eq!(lookups.name_of(Lookup::Provinces, "34"), None);
        assert!(!lookups.is_empty());
        assert!(Lookups::default().is_empty());
    }

    #[tokio::test]
    async fn test_clients_are_never_cached() {
        let (url, request) = serve_once("200 OK", r#"[{"ID": 7}]"#).await;
        let cache = SampleCache::shared(Duration::from_secs(300));
        let source = DataSource::new(ApiClient::with_token(&url, "tok").unwrap(), cache.clone());

        let (page, status) = source.list_page(Entity::Clients, 1, 50).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(status, CacheStatus::Fresh);
        assert!(cache.lock().unwrap().is_empty());

        let raw = request.await.unwrap();
        assert!(raw.starts_with("GET /clientes/list"));
    }

    #[tokio::test]
    async fn test_samples_use_the_repository_cache() {
        let (url, _request) = serve_once("200 OK", r#"[{"ID": 1}]"#).await;
        let cache = SampleCache::shared(Duration::from_secs(300));
        let source = DataSource::new(ApiClient::with_token(&url, "tok").unwrap(), cache.clone());

        let (_, status) = source.list_page(Entity::Samples, 1, 50).await.unwrap();
        assert_eq!(status, CacheStatus::Fresh);
        let (_, status) = source.get(Entity::Samples, "1").await.unwrap();
        assert_eq!(status, CacheStatus::FromCache);
    }
}
