//! Splitting record content into work items and tagging each one.
//!
//! Item tags come from their own keyword cascade (bug first, then
//! requirement, then a fallback to requirement) and are never reconciled
//! with the record-level classification.

use super::keywords::{KeywordSetId, Lexicon};
use crate::models::{ItemTag, TagBasis, WorkItem};
use regex::Regex;

/// Default minimum fragment length, in characters.
pub const DEFAULT_MIN_ITEM_CHARS: usize = 5;

/// Full-width/half-width semicolons, `1.` / `1、` enumerations, newlines.
const DELIMITER_PATTERN: &str = r"[；;]\s*|\d+[\.、]\s*|\r?\n";

/// Splits content into fragments and tags them.
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    delimiters: Regex,
    min_chars: usize,
}

impl Default for ItemExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ITEM_CHARS)
    }
}

impl ItemExtractor {
    /// Create an extractor that discards fragments shorter than `min_chars`.
    pub fn new(min_chars: usize) -> Self {
        Self {
            delimiters: Regex::new(DELIMITER_PATTERN).expect("Invalid item delimiter pattern"),
            min_chars,
        }
    }

    /// Split content into trimmed fragments.
    ///
    /// Returns the whole trimmed content as one item when splitting yields
    /// at most one usable fragment, and nothing for blank content.
    pub fn extract_items(&self, content: &str) -> Vec<String> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let fragments: Vec<String> = self
            .delimiters
            .split(trimmed)
            .map(str::trim)
            .filter(|fragment| fragment.chars().count() >= self.min_chars)
            .map(String::from)
            .collect();

        if fragments.len() <= 1 {
            vec![trimmed.to_string()]
        } else {
            fragments
        }
    }

    /// Extract and tag every item of the content.
    pub fn work_items(&self, content: Option<&str>, lexicon: &Lexicon) -> Vec<WorkItem> {
        let Some(content) = content else {
            return Vec::new();
        };

        self.extract_items(content)
            .into_iter()
            .map(|text| {
                let (tag, basis) = tag_item(&text, lexicon);
                WorkItem { text, tag, basis }
            })
            .collect()
    }
}

/// Tag a single item as requirement or bug.
pub fn tag_item(item: &str, lexicon: &Lexicon) -> (ItemTag, TagBasis) {
    let text = item.to_lowercase();

    if lexicon.contains_any(KeywordSetId::ItemBug, &text) {
        (ItemTag::Bug, TagBasis::Keyword)
    } else if lexicon.contains_any(KeywordSetId::ItemRequirement, &text) {
        (ItemTag::Requirement, TagBasis::Keyword)
    } else {
        (ItemTag::Requirement, TagBasis::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_semicolons() {
        let extractor = ItemExtractor::default();
        let items = extractor.extract_items("开发了登录模块; 修复了空指针异常");
        assert_eq!(items, vec!["开发了登录模块", "修复了空指针异常"]);
    }

    #[test]
    fn test_split_on_enumeration_and_newlines() {
        let extractor = ItemExtractor::default();
        let content = "1.完成订单导入功能\n2、优化报表查询速度；3. 对接仓库系统接口";
        let items = extractor.extract_items(content);
        assert_eq!(
            items,
            vec!["完成订单导入功能", "优化报表查询速度", "对接仓库系统接口"]
        );
    }

    #[test]
    fn test_short_fragments_are_dropped() {
        let extractor = ItemExtractor::default();
        let items = extractor.extract_items("开会; 编写测试用例文档; 修复导出异常问题");
        assert_eq!(items, vec!["编写测试用例文档", "修复导出异常问题"]);
        assert!(items.iter().all(|i| i.chars().count() >= DEFAULT_MIN_ITEM_CHARS));
    }

    #[test]
    fn test_single_fragment_returns_whole_content() {
        let extractor = ItemExtractor::default();
        assert_eq!(extractor.extract_items("  开会  "), vec!["开会"]);
        assert_eq!(
            extractor.extract_items("开会; 编写测试用例文档"),
            vec!["开会; 编写测试用例文档"]
        );
    }

    #[test]
    fn test_blank_content_yields_nothing() {
        let extractor = ItemExtractor::default();
        assert!(extractor.extract_items("").is_empty());
        assert!(extractor.extract_items(" \n ").is_empty());
        assert!(extractor.work_items(None, &Lexicon::default()).is_empty());
    }

    #[test]
    fn test_tag_item_cascade() {
        let lexicon = Lexicon::default();
        assert_eq!(
            tag_item("开发了登录模块", &lexicon),
            (ItemTag::Requirement, TagBasis::Keyword)
        );
        assert_eq!(
            tag_item("修复了空指针异常", &lexicon),
            (ItemTag::Bug, TagBasis::Keyword)
        );
        // Bug keywords win over requirement keywords.
        assert_eq!(
            tag_item("开发过程中解决接口问题", &lexicon),
            (ItemTag::Bug, TagBasis::Keyword)
        );
        assert_eq!(
            tag_item("参加项目周会", &lexicon),
            (ItemTag::Requirement, TagBasis::Fallback)
        );
    }

    #[test]
    fn test_tag_item_is_case_insensitive() {
        let lexicon = Lexicon::default();
        assert_eq!(tag_item("Fix BUG in parser", &lexicon).0, ItemTag::Bug);
    }

    #[test]
    fn test_work_items_scenario() {
        let extractor = ItemExtractor::default();
        let items = extractor.work_items(Some("开发了登录模块; 修复了空指针异常"), &Lexicon::default());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tag, ItemTag::Requirement);
        assert_eq!(items[1].tag, ItemTag::Bug);
    }
}
