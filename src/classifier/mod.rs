//! Rule-based classification of work-log content.
//!
//! The [`Classifier`] runs the cascade in [`rules::RULES`] over a record's
//! content and, separately, splits the content into tagged work items.

pub mod items;
pub mod keywords;
pub mod rules;

pub use items::{tag_item, ItemExtractor};
pub use keywords::Lexicon;

use crate::config::Config;
use crate::models::{Classification, ClassifiedRecord, WorkRecord};
use rules::{infer_area, AreaSource, Rule, RULES};
use tracing::trace;

/// Classifies record content and extracts work items.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    lexicon: Lexicon,
    extractor: ItemExtractor,
}

impl Classifier {
    /// Create a classifier from keyword and extraction settings.
    pub fn from_config(config: &Config) -> Self {
        Self {
            lexicon: Lexicon::from_config(&config.keywords),
            extractor: ItemExtractor::new(config.extraction.min_item_chars),
        }
    }

    /// The keyword sets in use.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// The rule cascade, in evaluation order.
    #[allow(dead_code)] // Inspection hook for tests and tooling
    pub fn rules(&self) -> &'static [Rule] {
        RULES
    }

    /// Classify one piece of content. Never fails.
    pub fn classify(&self, content: Option<&str>) -> Classification {
        let text = match content.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_lowercase(),
            _ => return Classification::empty(),
        };

        // The last rule always matches, so the cascade is total.
        let (rule, refinement) = RULES
            .iter()
            .find_map(|rule| {
                if rule.matches(&text, &self.lexicon) {
                    rule.refine(&text, &self.lexicon).map(|r| (rule, r))
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                let fallback = &RULES[RULES.len() - 1];
                (fallback, &fallback.refinements[fallback.refinements.len() - 1])
            });

        let technical_area = match refinement.area {
            AreaSource::Fixed(area) => area,
            AreaSource::Inferred => infer_area(&text, &self.lexicon),
        };

        trace!(
            "Classified as {}/{} ({})",
            rule.work_type.as_str(),
            refinement.subtype,
            technical_area
        );

        Classification {
            work_type: rule.work_type,
            subtype: refinement.subtype.to_string(),
            technical_area,
            work_nature: rule.work_type.work_nature().to_string(),
            analysis_reason: refinement.reason.to_string(),
            confidence: rule.confidence,
        }
    }

    /// Classify a record and extract its items.
    pub fn classify_record(&self, record: &WorkRecord) -> ClassifiedRecord {
        let content = record.content.as_deref();
        ClassifiedRecord {
            record: record.clone(),
            classification: self.classify(content),
            items: self.extractor.work_items(content, &self.lexicon),
        }
    }
}
