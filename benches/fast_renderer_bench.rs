use criterion::{criterion_group, criterion_main, Criterion};
use seo_render_pools::emoji::EmojiStore;
use seo_render_pools::pool::{PoolConfig, PoolManager};
use seo_render_pools::storage::InMemoryStorage;
use seo_render_pools::template::{FastRenderer, RenderData, TemplateCompiler};
use std::sync::Arc;

fn bench_render(c: &mut Criterion) {
    let config = PoolConfig::default();
    let storage = InMemoryStorage::new(config.clone());
    let emojis = Arc::new(EmojiStore::from_items(vec!["😀".into(), "😎".into()]));
    let manager = PoolManager::new(config, storage, emojis).unwrap();
    manager.append_keywords(1, &[(1, "rust".to_string()), (2, "tokio".to_string())]);
    manager.append_images(1, &[(1, "/img/1.png".to_string())]);

    let plan = TemplateCompiler::compile(
        "<html><head><title>{{Title}}</title></head><body>{{Keyword}} {{KeywordEmoji}} \
         <img src=\"{{Image}}\" class=\"{{Cls}}\"> {{ArticleContent}}{{Content}} \
         {{AnalyticsCode}}{{BaiduPushJS}} {{Number 1 100}}</body></html>",
    )
    .unwrap();
    let data = RenderData {
        title: "Benchmark Page".into(),
        keyword_group_id: 1,
        image_group_id: 1,
        analytics_code: "UA-BENCH".into(),
        baidu_push_js: "baidu()".into(),
        article_content: "<p>article</p>".into(),
        content: "<p>content</p>".into(),
        ..Default::default()
    };

    c.bench_function("fast_renderer_render", |b| {
        b.iter(|| {
            let _ = FastRenderer::render(&plan, &manager, &data);
        });
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
