// Compiles a template's text once into a `Plan`. Runs at template load/
// reload time, never on the request path: the renderer walks the result
// doing no scanning of its own.

use super::plan::{Chunk, Placeholder};
use crate::error::{Result, SeoError};
use super::plan::Plan;

pub struct TemplateCompiler;

impl TemplateCompiler {
    pub fn compile(source: &str) -> Result<Plan> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            literal.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let close = after_open.find("}}").ok_or_else(|| {
                SeoError::Template("unterminated placeholder: missing '}}'".into())
            })?;
            let token = after_open[..close].trim();

            if !literal.is_empty() {
                chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
            }
            chunks.push(Chunk::Placeholder(parse_placeholder(token)?));

            rest = &after_open[close + 2..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }

        Ok(Plan { chunks })
    }
}

fn parse_placeholder(token: &str) -> Result<Placeholder> {
    let mut parts = token.split_whitespace();
    let name = parts.next().ok_or_else(|| SeoError::Template("empty placeholder".into()))?;

    match name {
        "Title" => Ok(Placeholder::Title),
        "Keyword" => Ok(Placeholder::Keyword),
        "KeywordEmoji" => Ok(Placeholder::KeywordEmoji),
        "Image" => Ok(Placeholder::Image),
        "Cls" => Ok(Placeholder::Cls),
        "Url" => Ok(Placeholder::Url),
        "ArticleContent" => Ok(Placeholder::ArticleContent),
        "AnalyticsCode" => Ok(Placeholder::AnalyticsCode),
        "BaiduPushJS" => Ok(Placeholder::BaiduPushJS),
        "Content" => Ok(Placeholder::Content),
        "Number" => {
            let min: i64 = parts
                .next()
                .ok_or_else(|| SeoError::Template("Number placeholder missing min".into()))?
                .parse()
                .map_err(|_| SeoError::Template("Number min is not an integer".into()))?;
            let max: i64 = parts
                .next()
                .ok_or_else(|| SeoError::Template("Number placeholder missing max".into()))?
                .parse()
                .map_err(|_| SeoError::Template("Number max is not an integer".into()))?;
            if min > max {
                return Err(SeoError::Template(format!("Number min {min} > max {max}")));
            }
            Ok(Placeholder::Number { min, max })
        }
        other => Err(SeoError::Template(format!("unknown placeholder kind: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_literal_and_placeholder_runs() {
        let plan = TemplateCompiler::compile("Hi {{Title}}! {{Keyword}} {{Number 1 6}}").unwrap();
        assert_eq!(
            plan.chunks,
            vec![
                Chunk::Literal("Hi ".into()),
                Chunk::Placeholder(Placeholder::Title),
                Chunk::Literal("! ".into()),
                Chunk::Placeholder(Placeholder::Keyword),
                Chunk::Literal(" ".into()),
                Chunk::Placeholder(Placeholder::Number { min: 1, max: 6 }),
            ]
        );
    }

    #[test]
    fn template_with_no_placeholders_is_one_literal_chunk() {
        let plan = TemplateCompiler::compile("plain text").unwrap();
        assert_eq!(plan.chunks, vec![Chunk::Literal("plain text".into())]);
    }

    #[test]
    fn unterminated_placeholder_is_rejected() {
        assert!(TemplateCompiler::compile("broken {{Title").is_err());
    }

    #[test]
    fn unknown_placeholder_kind_is_rejected() {
        assert!(TemplateCompiler::compile("{{Bogus}}").is_err());
    }

    #[test]
    fn number_requires_min_le_max() {
        assert!(TemplateCompiler::compile("{{Number 9 1}}").is_err());
    }
}
