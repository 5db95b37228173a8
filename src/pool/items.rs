// Item kinds held by the reusable and consumable pools.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub id: i64,
    pub group_id: i64,
    pub text: String,
    /// HTML-encoded shadow of `text`, computed once at load time so the
    /// hot render path never calls the encoder.
    pub encoded: String,
}

impl Keyword {
    pub fn new(id: i64, group_id: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        let encoded = crate::html_entity::encode(&text);
        Self { id, group_id, text, encoded }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: i64,
    pub group_id: i64,
    pub url: String,
}

impl Image {
    pub fn new(id: i64, group_id: i64, url: impl Into<String>) -> Self {
        Self { id, group_id, url: url.into() }
    }
}
