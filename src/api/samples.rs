//! Data access for samples with a read-through cache.
//!
//! Sample lists and records are cached for a fixed TTL. Writes invalidate
//! exactly what they affect: the touched record and the cached list pages.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use super::client::ApiClient;
use super::error::Result;
use super::types::Page;
use crate::cache::{CacheStatus, TtlCache};
use crate::catalog::Entity;
use crate::table::Row;

/// Cached sample pages and records.
#[derive(Debug)]
pub struct SampleCache {
    pages: TtlCache<(u32, u32), Page>,
    records: TtlCache<String, Row>,
}

impl SampleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pages: TtlCache::new(ttl),
            records: TtlCache::new(ttl),
        }
    }

    /// Wrap in the shared handle the repository expects.
    pub fn shared(ttl: Duration) -> SharedSampleCache {
        Arc::new(Mutex::new(Self::new(ttl)))
    }

    pub fn page(&mut self, page: u32, page_size: u32) -> Option<Page> {
        self.pages.get(&(page, page_size))
    }

    pub fn store_page(&mut self, page: &Page) {
        self.purge_expired();
        for row in &page.rows {
            if let Some(id) = record_id(row) {
                self.records.insert(id, row.clone());
            }
        }
        self.pages.insert((page.page, page.page_size), page.clone());
    }

    pub fn record(&mut self, id: &str) -> Option<Row> {
        self.records.get(&id.to_string())
    }

    pub fn store_record(&mut self, id: &str, row: Row) {
        self.purge_expired();
        self.records.insert(id.to_string(), row);
    }

    /// Drop expired pages and records; runs on every write.
    fn purge_expired(&mut self) {
        let now = Instant::now();
        let removed = self.pages.purge_expired(now) + self.records.purge_expired(now);
        if removed > 0 {
            debug!(removed, "Purged expired sample cache entries");
        }
    }

    /// Drop one record and every cached page.
    pub fn invalidate_record(&mut self, id: &str) {
        self.records.invalidate(&id.to_string());
        self.invalidate_pages();
    }

    pub fn invalidate_pages(&mut self) {
        let removed = self.pages.invalidate_where(|_| true);
        debug!(removed, "Invalidated cached sample pages");
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type SharedSampleCache = Arc<Mutex<SampleCache>>;

fn record_id(row: &Row) -> Option<String> {
    match row.get(Entity::Samples.key_field())? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Sample reads and writes through the API, cached.
#[derive(Debug, Clone)]
pub struct SampleRepository {
    client: ApiClient,
    cache: SharedSampleCache,
}

impl SampleRepository {
    pub fn new(client: ApiClient, cache: SharedSampleCache) -> Self {
        Self { client, cache }
    }

    fn cache(&self) -> MutexGuard<'_, SampleCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[instrument(skip(self))]
    pub async fn list_page(&self, page: u32, page_size: u32) -> Result<(Page, CacheStatus)> {
        if let Some(cached) = self.cache().page(page, page_size) {
            debug!("Serving sample page from cache");
            return Ok((cached, CacheStatus::FromCache));
        }
        let fetched = self.client.list_page(Entity::Samples, page, page_size).await?;
        self.cache().store_page(&fetched);
        Ok((fetched, CacheStatus::Fresh))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<(Row, CacheStatus)> {
        if let Some(cached) = self.cache().record(id) {
            return Ok((cached, CacheStatus::FromCache));
        }
        let record = self.client.get_record(Entity::Samples, id).await?;
        self.cache().store_record(id, record.clone());
        Ok((record, CacheStatus::Fresh))
    }

    #[instrument(skip(self, record))]
    pub async fn create(&self, record: &Row) -> Result<Row> {
        let created = self.client.create_record(Entity::Samples, record).await?;
        let mut cache = self.cache();
        cache.invalidate_pages();
        if let Some(id) = record_id(&created) {
            cache.store_record(&id, created.clone());
        }
        Ok(created)
    }

    #[instrument(skip(self, record))]
    pub async fn update(&self, id: &str, record: &Row) -> Result<Row> {
        let updated = self.client.update_record(Entity::Samples, id, record).await?;
        self.cache().invalidate_record(id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete_record(Entity::Samples, id).await?;
        self.cache().invalidate_record(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::serve_once;
    use serde_json::json;

    fn sample(id: u64) -> Row {
        let mut row = Row::new();
        row.insert("ID".to_string(), json!(id));
        row.insert("REFERENCIA".to_string(), json!(format!("M-{}", id)));
        row
    }

    fn page(rows: Vec<Row>) -> Page {
        Page {
            page: 1,
            page_size: 50,
            rows,
            total: None,
            has_more: false,
        }
    }

    #[test]
    fn test_store_page_caches_records() {
        let mut cache = SampleCache::new(Duration::from_secs(300));
        cache.store_page(&page(vec![sample(1), sample(2)]));
        assert!(cache.page(1, 50).is_some());
        assert_eq!(cache.record("2"), Some(sample(2)));
        assert!(cache.page(2, 50).is_none());
    }

    #[test]
    fn test_invalidate_record_is_targeted() {
        let mut cache = SampleCache::new(Duration::from_secs(300));
        cache.store_page(&page(vec![sample(1), sample(2)]));
        cache.invalidate_record("1");

        assert!(cache.record("1").is_none());
        assert!(cache.record("2").is_some());
        assert!(cache.page(1, 50).is_none());
    }

    #[test]
    fn test_writes_purge_expired_entries() {
        let mut cache = SampleCache::new(Duration::ZERO);
        cache.store_page(&page(vec![sample(1), sample(2)]));
        assert_eq!(cache.len(), 3);

        // Everything stored so far has already expired
        cache.store_record("3", sample(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = SampleCache::new(Duration::from_secs(300));
        cache.store_record("9", sample(9));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_second_list_is_served_from_cache() {
        let (url, _request) = serve_once("200 OK", r#"[{"ID": 1}, {"ID": 2}]"#).await;
        let client = ApiClient::with_token(&url, "tok").unwrap();
        let repo = SampleRepository::new(client, SampleCache::shared(Duration::from_secs(300)));

        let (first, status) = repo.list_page(1, 50).await.unwrap();
        assert_eq!(status, CacheStatus::Fresh);
        // The server only answers once
        let (second, status) = repo.list_page(1, 50).await.unwrap();
        assert_eq!(status, CacheStatus::FromCache);
        assert_eq!(first, second);

        let (record, status) = repo.get("1").await.unwrap();
        assert_eq!(status, CacheStatus::FromCache);
        assert_eq!(record["ID"], json!(1));
    }

    #[tokio::test]
    async fn test_delete_invalidates_record() {
        let (url, _request) = serve_once("204 No Content", "").await;
        let cache = SampleCache::shared(Duration::from_secs(300));
        cache.lock().unwrap().store_page(&page(vec![sample(1), sample(2)]));

        let repo = SampleRepository::new(ApiClient::with_token(&url, "tok").unwrap(), cache.clone());
        repo.delete("1").await.unwrap();

        let mut cache = cache.lock().unwrap();
        assert!(cache.record("1").is_none());
        assert!(cache.record("2").is_some());
        assert!(cache.page(1, 50).is_none());
    }

    #[tokio::test]
    async fn test_create_drops_pages_and_caches_record() {
        let (url, request) = serve_once("201 Created", r#"{"ID": 7, "REFERENCIA": "M-7"}"#).await;
        let cache = SampleCache::shared(Duration::from_secs(300));
        cache.lock().unwrap().store_page(&page(vec![sample(1)]));

        let repo = SampleRepository::new(ApiClient::with_token(&url, "tok").unwrap(), cache.clone());
        let created = repo.create(&sample(7)).await.unwrap();
        assert_eq!(created, sample(7));
        assert!(request.await.unwrap().starts_with("POST /muestras "));

        let mut cache = cache.lock().unwrap();
        assert!(cache.page(1, 50).is_none());
        assert_eq!(cache.record("7"), Some(sample(7)));
        assert!(cache.record("1").is_some());
    }

    #[tokio::test]
    async fn test_update_invalidates_record() {
        let (url, request) = serve_once("200 OK", r#"{"data": {"ID": 2, "REFERENCIA": "M-2b"}}"#).await;
        let cache = SampleCache::shared(Duration::from_secs(300));
        cache.lock().unwrap().store_page(&page(vec![sample(1), sample(2)]));

        let repo = SampleRepository::new(ApiClient::with_token(&url, "tok").unwrap(), cache.clone());
        let updated = repo.update("2", &sample(2)).await.unwrap();
        assert_eq!(updated["REFERENCIA"], json!("M-2b"));
        assert!(request.await.unwrap().starts_with("PUT /muestras/2 "));

        let mut cache = cache.lock().unwrap();
        assert!(cache.record("2").is_none());
        assert!(cache.record("1").is_some());
    }
}
