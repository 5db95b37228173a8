// Request-level orchestrator. Site lookup itself is an out-of-scope
// external collaborator (`SiteResolver`); this module owns only the
// sequencing: resolve site, pop content, pop title, render, respond.

use crate::error::{Result, SeoError};
use crate::pool::manager::PoolManager;
use crate::template::{FastRenderer, Plan, RenderData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Row shape from the `sites` table (§6).
#[derive(Debug, Clone)]
pub struct Site {
    pub id: i64,
    pub domain: String,
    pub template_id: i64,
    pub article_group_id: i64,
    pub keyword_group_id: i64,
    pub image_group_id: i64,
    pub analytics_code: String,
    pub baidu_push_js: String,
    pub content_type: String,
}

/// Site-by-domain lookup and template-plan lookup-by-id, both out-of-scope
/// external collaborators per spec. Kept as a narrow trait so PageHandler
/// has something concrete to call in tests.
#[async_trait]
pub trait SiteResolver: Send + Sync {
    async fn resolve(&self, domain: &str) -> Option<Site>;
    async fn plan_for(&self, template_id: i64) -> Option<Arc<Plan>>;
}

/// Rendered response body plus the content type the site declares.
pub struct RenderedPage {
    pub body: Vec<u8>,
    pub content_type: String,
}

pub struct PageHandler {
    pool: Arc<PoolManager>,
    sites: Arc<dyn SiteResolver>,
}

impl PageHandler {
    pub fn new(pool: Arc<PoolManager>, sites: Arc<dyn SiteResolver>) -> Self {
        Self { pool, sites }
    }

    /// `is_spider` only affects logging, per spec.md §4.9 step 3; spider
    /// classification itself is out of scope.
    pub async fn handle(&self, domain: &str, is_spider: bool) -> Result<RenderedPage> {
        let site = self
            .sites
            .resolve(domain)
            .await
            .ok_or_else(|| SeoError::NotFound(format!("no site for domain {domain}")))?;

        let plan = self
            .sites
            .plan_for(site.template_id)
            .await
            .ok_or_else(|| SeoError::NotFound(format!("no template {}", site.template_id)))?;

        let content = match self.pool.pop_content(site.article_group_id).await {
            Ok(text) => text,
            Err(SeoError::CachePoolEmpty { group_id }) => {
                warn!(group_id, domain, is_spider, "content pool empty, rendering without content");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, domain, is_spider, "content pop failed, rendering without content");
                String::new()
            }
        };

        let title = self.pool.pop_title(site.keyword_group_id);

        let data = RenderData {
            title,
            site_id: site.id,
            keyword_group_id: site.keyword_group_id,
            image_group_id: site.image_group_id,
            analytics_code: site.analytics_code.clone(),
            baidu_push_js: site.baidu_push_js.clone(),
            article_content: content.clone(),
            content,
        };

        let body = FastRenderer::render(&plan, &self.pool, &data);
        Ok(RenderedPage { body, content_type: site.content_type.clone() })
    }
}

/// In-memory `SiteResolver` for tests and the example binary.
pub struct InMemorySiteResolver {
    sites: HashMap<String, Site>,
    plans: HashMap<i64, Arc<Plan>>,
}

impl InMemorySiteResolver {
    pub fn new(sites: Vec<Site>, plans: HashMap<i64, Arc<Plan>>) -> Self {
        Self { sites: sites.into_iter().map(|s| (s.domain.clone(), s)).collect(), plans }
    }
}

#[async_trait]
impl SiteResolver for InMemorySiteResolver {
    async fn resolve(&self, domain: &str) -> Option<Site> {
        self.sites.get(domain).cloned()
    }

    async fn plan_for(&self, template_id: i64) -> Option<Arc<Plan>> {
        self.plans.get(&template_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiStore;
    use crate::pool::config::PoolConfig;
    use crate::storage::InMemoryStorage;
    use crate::template::TemplateCompiler;

    fn test_site() -> Site {
        Site {
            id: 1,
            domain: "example.com".into(),
            template_id: 10,
            article_group_id: 7,
            keyword_group_id: 1,
            image_group_id: 1,
            analytics_code: "UA-1".into(),
            baidu_push_js: "baidu()".into(),
            content_type: "text/html; charset=utf-8".into(),
        }
    }

    async fn test_handler() -> PageHandler {
        let config = PoolConfig::default();
        let storage = InMemoryStorage::new(config.clone());
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into()]));
        let pool = Arc::new(PoolManager::new(config, storage, emojis).unwrap());
        pool.start().await.unwrap();

        let plan = Arc::new(TemplateCompiler::compile("<h1>{{Title}}</h1>{{Content}}").unwrap());
        let mut plans = HashMap::new();
        plans.insert(10, plan);
        let resolver = Arc::new(InMemorySiteResolver::new(vec![test_site()], plans));

        PageHandler::new(pool, resolver)
    }

    #[tokio::test]
    async fn unknown_domain_returns_not_found() {
        let handler = test_handler().await;
        let err = handler.handle("unknown.test", false).await.unwrap_err();
        assert!(matches!(err, SeoError::NotFound(_)));
    }

    #[tokio::test]
    async fn known_domain_with_empty_content_pool_renders_empty_content() {
        let handler = test_handler().await;
        let page = handler.handle("example.com", false).await.unwrap();
        let html = String::from_utf8(page.body).unwrap();
        assert!(html.starts_with("<h1>"));
        assert!(html.ends_with("</h1>"));
        assert_eq!(page.content_type, "text/html; charset=utf-8");
    }
}
