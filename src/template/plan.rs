// The compiled representation of a template: an ordered sequence of literal
// byte runs and placeholder instructions. The renderer does a single
// straight walk over this, no regex matching or string scanning on the hot
// path.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Title,
    Keyword,
    KeywordEmoji,
    Image,
    Cls,
    Url,
    Number { min: i64, max: i64 },
    ArticleContent,
    AnalyticsCode,
    BaiduPushJS,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Literal(String),
    Placeholder(Placeholder),
}

/// Compiled template: an ordered plan of chunks, shared read-only across
/// every request that renders this template version.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub chunks: Vec<Chunk>,
}

/// Per-request data a handler must populate before calling
/// `FastRenderer::render`.
#[derive(Debug, Clone, Default)]
pub struct RenderData {
    pub title: String,
    pub site_id: i64,
    pub keyword_group_id: i64,
    pub image_group_id: i64,
    pub analytics_code: String,
    pub baidu_push_js: String,
    pub article_content: String,
    pub content: String,
}
