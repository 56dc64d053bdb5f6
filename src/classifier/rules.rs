//! The classification rule table.
//!
//! Each tier of the cascade is a [`Rule`]: a [`Condition`] over named
//! keyword sets plus an ordered list of [`Refinement`]s that pick the
//! subtype and technical area. The tables are plain data so they can be
//! inspected and tested one entry at a time.

use super::keywords::{KeywordSetId, Lexicon};
use crate::models::{TechnicalArea, WorkType};

pub const CONFIDENCE_TUNING: f64 = 0.9;
pub const CONFIDENCE_DEVELOPMENT: f64 = 0.85;
pub const CONFIDENCE_MAINTENANCE: f64 = 0.8;
pub const CONFIDENCE_INTEGRATION: f64 = 0.75;
pub const CONFIDENCE_LEARNING: f64 = 0.7;
pub const CONFIDENCE_FALLBACK: f64 = 0.3;
pub const CONFIDENCE_EMPTY: f64 = 0.0;

/// Every confidence value the classifier can emit.
pub const CONFIDENCE_TIERS: [f64; 7] = [
    CONFIDENCE_TUNING,
    CONFIDENCE_DEVELOPMENT,
    CONFIDENCE_MAINTENANCE,
    CONFIDENCE_INTEGRATION,
    CONFIDENCE_LEARNING,
    CONFIDENCE_FALLBACK,
    CONFIDENCE_EMPTY,
];

/// A predicate over lowercased content.
#[derive(Debug, Clone, Copy)]
pub enum Condition {
    /// Always holds.
    Always,
    /// At least one term of the set occurs.
    Any(KeywordSetId),
    /// At least `n` distinct terms of the set occur.
    AtLeast(KeywordSetId, usize),
    /// No term of the set occurs.
    Lacks(KeywordSetId),
    /// Every sub-condition holds.
    All(&'static [Condition]),
    /// Some sub-condition holds.
    Either(&'static [Condition]),
    /// The sub-condition does not hold.
    Not(&'static Condition),
}

impl Condition {
    /// Evaluate against lowercased text.
    pub fn holds(&self, text: &str, lexicon: &Lexicon) -> bool {
        match self {
            Condition::Always => true,
            Condition::Any(set) => lexicon.contains_any(*set, text),
            Condition::AtLeast(set, n) => lexicon.count_distinct(*set, text) >= *n,
            Condition::Lacks(set) => !lexicon.contains_any(*set, text),
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(text, lexicon)),
            Condition::Either(conditions) => conditions.iter().any(|c| c.holds(text, lexicon)),
            Condition::Not(condition) => !condition.holds(text, lexicon),
        }
    }
}

/// Where a refinement takes its technical area from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaSource {
    Fixed(TechnicalArea),
    /// Run the shared area inference over the content.
    Inferred,
}

/// One branch of a rule's secondary cascade.
#[derive(Debug, Clone, Copy)]
pub struct Refinement {
    pub when: Condition,
    pub subtype: &'static str,
    pub area: AreaSource,
    pub reason: &'static str,
}

/// One tier of the classification cascade.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub work_type: WorkType,
    pub confidence: f64,
    pub when: Condition,
    /// Tried in order; the last entry should be `Condition::Always`.
    pub refinements: &'static [Refinement],
}

impl Rule {
    /// Whether this rule claims the text.
    pub fn matches(&self, text: &str, lexicon: &Lexicon) -> bool {
        self.when.holds(text, lexicon)
    }

    /// First refinement whose condition holds.
    pub fn refine(&self, text: &str, lexicon: &Lexicon) -> Option<&'static Refinement> {
        self.refinements.iter().find(|r| r.when.holds(text, lexicon))
    }
}

const fn branch(
    when: Condition,
    subtype: &'static str,
    area: AreaSource,
    reason: &'static str,
) -> Refinement {
    Refinement {
        when,
        subtype,
        area,
        reason,
    }
}

use AreaSource::{Fixed, Inferred};
use Condition::{All, Always, Any, AtLeast, Either, Lacks, Not};
use KeywordSetId as K;

/// Learning statement without any development action.
const PURE_LEARNING: Condition = All(&[Any(K::Learning), Lacks(K::DevelopmentActions)]);

const TUNING: Rule = Rule {
    work_type: WorkType::EquipmentTuning,
    confidence: CONFIDENCE_TUNING,
    when: Either(&[
        Any(K::TuningPhrases),
        All(&[AtLeast(K::EquipmentContext, 2), Lacks(K::SoftwareIndicators)]),
    ]),
    refinements: &[
        branch(
            Any(K::TuningInstallation),
            "installation_config",
            Fixed(TechnicalArea::HardwareEquipment),
            "Equipment installation or configuration work",
        ),
        branch(
            Any(K::TuningCalibration),
            "calibration",
            Fixed(TechnicalArea::HardwareEquipment),
            "Equipment calibration work",
        ),
        branch(
            Any(K::TuningMaintenance),
            "equipment_maintenance",
            Fixed(TechnicalArea::HardwareEquipment),
            "Equipment maintenance work",
        ),
        branch(
            Any(K::TuningDebugging),
            "debugging_tuning",
            Fixed(TechnicalArea::HardwareEquipment),
            "Equipment debugging and tuning work",
        ),
        branch(
            Always,
            "general_tuning",
            Fixed(TechnicalArea::HardwareEquipment),
            "Equipment-related work without software activity",
        ),
    ],
};

const DEVELOPMENT: Rule = Rule {
    work_type: WorkType::SoftwareDevelopment,
    confidence: CONFIDENCE_DEVELOPMENT,
    when: All(&[
        Any(K::DevelopmentVerbs),
        Any(K::TechnicalNouns),
        Not(&PURE_LEARNING),
    ]),
    refinements: &[
        branch(
            Any(K::DevFrontend),
            "frontend_development",
            Fixed(TechnicalArea::Frontend),
            "Development of user interface features",
        ),
        branch(
            Any(K::DevBackend),
            "backend_development",
            Fixed(TechnicalArea::Backend),
            "Development of backend services or interfaces",
        ),
        branch(
            Any(K::DevAlgorithm),
            "algorithm_development",
            Fixed(TechnicalArea::AlgorithmAi),
            "Development of algorithms or models",
        ),
        branch(
            Any(K::DevArchitecture),
            "architecture_design",
            Fixed(TechnicalArea::SystemArchitecture),
            "System or architecture design work",
        ),
        branch(
            Any(K::DevTooling),
            "tool_development",
            Fixed(TechnicalArea::General),
            "Development of tools or scripts",
        ),
        branch(
            Always,
            "general_development",
            Fixed(TechnicalArea::General),
            "Development of new functionality",
        ),
    ],
};

const MAINTENANCE: Rule = Rule {
    work_type: WorkType::SoftwareMaintenance,
    confidence: CONFIDENCE_MAINTENANCE,
    when: Any(K::Maintenance),
    refinements: &[
        branch(
            Any(K::MaintBugfix),
            "bug_fix",
            Inferred,
            "Fixing defects or resolving problems",
        ),
        branch(
            Any(K::MaintPerformance),
            "performance_optimization",
            Inferred,
            "Performance optimization",
        ),
        branch(
            Any(K::MaintImprovement),
            "feature_improvement",
            Inferred,
            "Improving existing functionality",
        ),
        branch(
            Any(K::MaintRefactor),
            "code_refactoring",
            Inferred,
            "Refactoring or cleaning up code",
        ),
        branch(
            Any(K::MaintVersion),
            "version_update",
            Inferred,
            "Version update or upgrade",
        ),
        branch(
            Always,
            "general_maintenance",
            Inferred,
            "General maintenance work",
        ),
    ],
};

const INTEGRATION: Rule = Rule {
    work_type: WorkType::SystemIntegration,
    confidence: CONFIDENCE_INTEGRATION,
    when: Any(K::Integration),
    refinements: &[
        branch(
            Any(K::IntegThirdParty),
            "third_party_integration",
            Fixed(TechnicalArea::Integration),
            "Integration with third-party systems or APIs",
        ),
        branch(
            Any(K::IntegDevice),
            "device_integration",
            Fixed(TechnicalArea::Integration),
            "Integration with devices or hardware",
        ),
        branch(
            Any(K::IntegDatabase),
            "database_integration",
            Fixed(TechnicalArea::Integration),
            "Database integration",
        ),
        branch(
            Any(K::IntegNetwork),
            "network_integration",
            Fixed(TechnicalArea::Integration),
            "Network or protocol integration",
        ),
        branch(
            Always,
            "general_integration",
            Fixed(TechnicalArea::Integration),
            "Integration, deployment or testing work",
        ),
    ],
};

const LEARNING: Rule = Rule {
    work_type: WorkType::LearningResearch,
    confidence: CONFIDENCE_LEARNING,
    when: PURE_LEARNING,
    refinements: &[
        branch(
            Any(K::LearningResearch),
            "technical_research",
            Inferred,
            "Technical research or survey",
        ),
        branch(
            Always,
            "skill_learning",
            Inferred,
            "Learning new skills or codebases",
        ),
    ],
};

const OTHER: Rule = Rule {
    work_type: WorkType::OtherWork,
    confidence: CONFIDENCE_FALLBACK,
    when: Always,
    refinements: &[branch(
        Always,
        "unclassified",
        Inferred,
        "No classification rule matched",
    )],
};

/// The cascade, in evaluation order. The last rule always matches.
pub const RULES: &[Rule] = &[TUNING, DEVELOPMENT, MAINTENANCE, INTEGRATION, LEARNING, OTHER];

/// Ordered area inference table; `General` when nothing matches.
pub const AREA_RULES: &[(KeywordSetId, TechnicalArea)] = &[
    (K::AreaFrontend, TechnicalArea::Frontend),
    (K::AreaBackend, TechnicalArea::Backend),
    (K::AreaAlgorithm, TechnicalArea::AlgorithmAi),
    (K::AreaDevice, TechnicalArea::DeviceControl),
    (K::AreaArchitecture, TechnicalArea::SystemArchitecture),
    (K::AreaData, TechnicalArea::DataProcessing),
    (K::AreaTesting, TechnicalArea::Testing),
];

/// Infer the technical area of lowercased text.
pub fn infer_area(text: &str, lexicon: &Lexicon) -> TechnicalArea {
    AREA_RULES
        .iter()
        .find(|(set, _)| lexicon.contains_any(*set, text))
        .map(|(_, area)| *area)
        .unwrap_or(TechnicalArea::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::default()
    }

    #[test]
    fn test_every_rule_ends_with_catch_all() {
        for rule in RULES {
            let last = rule.refinements.last().expect("rule without refinements");
            assert!(matches!(last.when, Condition::Always), "{:?}", rule.work_type);
        }
    }

    #[test]
    fn test_last_rule_always_matches() {
        let last = RULES.last().unwrap();
        assert_eq!(last.work_type, WorkType::OtherWork);
        assert!(last.matches("", &lexicon()));
    }

    #[test]
    fn test_tuning_rule_needs_two_equipment_terms() {
        let lex = lexicon();
        assert!(TUNING.matches("plc与传感器接线检查", &lex));
        assert!(!TUNING.matches("检查传感器", &lex));
        // Software terms veto the equipment-context path.
        assert!(!TUNING.matches("plc与传感器的软件对接", &lex));
        // Unambiguous phrases do not.
        assert!(TUNING.matches("设备调试, 软件也看了", &lex));
        // A term nested in a longer one is not a second term.
        assert!(!TUNING.matches("设备通讯测试", &lex));
        assert!(TUNING.matches("电机与设备通讯检查", &lex));
    }

    #[test]
    fn test_development_rule_excludes_pure_learning() {
        let lex = lexicon();
        assert!(DEVELOPMENT.matches("设计报表模块", &lex));
        assert!(!DEVELOPMENT.matches("学习设计模块的思路", &lex));
        assert!(DEVELOPMENT.matches("学习并实现设计模块", &lex));
        // "ui" inside "build" is not a technical noun.
        assert!(!DEVELOPMENT.matches("build", &lex));
    }

    #[test]
    fn test_learning_rule() {
        let lex = lexicon();
        assert!(LEARNING.matches("学习rust", &lex));
        assert!(!LEARNING.matches("学习并开发", &lex));
    }

    #[test]
    fn test_refinement_order() {
        let lex = lexicon();
        let refinement = MAINTENANCE.refine("优化查询性能", &lex).unwrap();
        assert_eq!(refinement.subtype, "performance_optimization");
        let refinement = MAINTENANCE.refine("修复性能问题", &lex).unwrap();
        assert_eq!(refinement.subtype, "bug_fix");
    }

    #[test]
    fn test_infer_area_order() {
        let lex = lexicon();
        assert_eq!(infer_area("前端页面和后端接口", &lex), TechnicalArea::Frontend);
        assert_eq!(infer_area("后端接口", &lex), TechnicalArea::Backend);
        assert_eq!(infer_area("伺服参数", &lex), TechnicalArea::DeviceControl);
        assert_eq!(infer_area("导出数据", &lex), TechnicalArea::DataProcessing);
        assert_eq!(infer_area("编写用例", &lex), TechnicalArea::Testing);
        assert_eq!(infer_area("开会", &lex), TechnicalArea::General);
    }

    #[test]
    fn test_confidence_tiers_descend() {
        for rule in RULES {
            assert!(CONFIDENCE_TIERS.contains(&rule.confidence));
        }
        let confidences: Vec<f64> = RULES.iter().map(|r| r.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] > w[1]));
    }
}
