// Renders a compiled `Plan` against per-request `RenderData`. No regex or
// scanning here: every chunk is either written unchanged or resolved by a
// direct lookup against a pool or a `RenderData` field.

use super::plan::{Chunk, Placeholder, Plan, RenderData};
use crate::pool::manager::PoolManager;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub struct FastRenderer;

impl FastRenderer {
    /// Walks `plan` once, producing the rendered HTML body. A placeholder
    /// that resolves to nothing (empty pool, absent data) simply writes
    /// nothing, callers never see a render failure from missing data.
    pub fn render(plan: &Plan, manager: &PoolManager, data: &RenderData) -> Vec<u8> {
        let mut rng = SmallRng::from_os_rng();
        let mut out = String::new();

        for chunk in &plan.chunks {
            match chunk {
                Chunk::Literal(text) => out.push_str(text),
                Chunk::Placeholder(kind) => {
                    resolve(kind, manager, data, &mut rng, &mut out);
                }
            }
        }

        out.into_bytes()
    }
}

fn resolve(
    kind: &Placeholder,
    manager: &PoolManager,
    data: &RenderData,
    rng: &mut SmallRng,
    out: &mut String,
) {
    match kind {
        Placeholder::Title => out.push_str(&data.title),
        Placeholder::Keyword => {
            if let Some(kw) = manager.random_keyword(data.keyword_group_id) {
                out.push_str(&kw);
            }
        }
        Placeholder::KeywordEmoji => {
            if let Some(ke) = manager.get_keyword_emoji() {
                out.push_str(&ke);
            }
        }
        Placeholder::Image => {
            if let Some(url) = manager.random_image(data.image_group_id) {
                out.push_str(&url);
            }
        }
        Placeholder::Cls => {
            if let Some(cls) = manager.get_cls() {
                out.push_str(&cls);
            }
        }
        Placeholder::Url => {
            if let Some(url) = manager.get_url() {
                out.push_str(&url);
            }
        }
        Placeholder::Number { min, max } => {
            let value = if min == max { *min } else { rng.random_range(*min..=*max) };
            out.push_str(&value.to_string());
        }
        Placeholder::ArticleContent => out.push_str(&data.article_content),
        Placeholder::AnalyticsCode => out.push_str(&data.analytics_code),
        Placeholder::BaiduPushJS => out.push_str(&data.baidu_push_js),
        Placeholder::Content => out.push_str(&data.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiStore;
    use crate::pool::config::PoolConfig;
    use crate::storage::InMemoryStorage;
    use crate::template::compiler::TemplateCompiler;
    use std::sync::Arc;

    fn test_manager() -> PoolManager {
        let config = PoolConfig::default();
        let storage = InMemoryStorage::new(config.clone());
        let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into()]));
        PoolManager::new(config, storage, emojis).unwrap()
    }

    #[test]
    fn renders_literals_and_render_data_fields() {
        let plan = TemplateCompiler::compile("<title>{{Title}}</title>{{Content}}").unwrap();
        let manager = test_manager();
        let data = RenderData {
            title: "Hello".into(),
            content: "body".into(),
            ..Default::default()
        };
        let html = FastRenderer::render(&plan, &manager, &data);
        assert_eq!(String::from_utf8(html).unwrap(), "<title>Hello</title>body");
    }

    #[test]
    fn number_placeholder_stays_within_bounds() {
        let plan = TemplateCompiler::compile("{{Number 3 3}}").unwrap();
        let manager = test_manager();
        let html = FastRenderer::render(&plan, &manager, &RenderData::default());
        assert_eq!(String::from_utf8(html).unwrap(), "3");
    }

    #[test]
    fn missing_keyword_group_renders_empty_not_error() {
        let plan = TemplateCompiler::compile("kw:[{{Keyword}}]").unwrap();
        let manager = test_manager();
        let data = RenderData { keyword_group_id: 999, ..Default::default() };
        let html = FastRenderer::render(&plan, &manager, &data);
        assert_eq!(String::from_utf8(html).unwrap(), "kw:[]");
    }
}
