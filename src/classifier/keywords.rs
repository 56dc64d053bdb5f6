//! Named keyword sets shared by the classification rules.
//!
//! Every keyword list lives here under a stable name. Rules refer to sets
//! by [`KeywordSetId`], and the `[keywords]` config section can replace
//! any set by name without touching the rule table.

use crate::config::KeywordConfig;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use tracing::{debug, warn};

/// Version of the built-in keyword sets.
pub const KEYWORDS_VERSION: u32 = 1;

/// Identifier of a named keyword set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordSetId {
    // Top-level rule triggers
    TuningPhrases,
    EquipmentContext,
    SoftwareIndicators,
    DevelopmentVerbs,
    TechnicalNouns,
    DevelopmentActions,
    Maintenance,
    Integration,
    Learning,

    // Tuning subtypes
    TuningInstallation,
    TuningCalibration,
    TuningMaintenance,
    TuningDebugging,

    // Development subtypes
    DevFrontend,
    DevBackend,
    DevAlgorithm,
    DevArchitecture,
    DevTooling,

    // Maintenance subtypes
    MaintBugfix,
    MaintPerformance,
    MaintImprovement,
    MaintRefactor,
    MaintVersion,

    // Integration subtypes
    IntegThirdParty,
    IntegDevice,
    IntegDatabase,
    IntegNetwork,

    // Learning subtypes
    LearningResearch,

    // Technical area inference
    AreaFrontend,
    AreaBackend,
    AreaAlgorithm,
    AreaDevice,
    AreaArchitecture,
    AreaData,
    AreaTesting,

    // Item tagging
    ItemBug,
    ItemRequirement,
}

impl KeywordSetId {
    pub const ALL: [KeywordSetId; 37] = [
        KeywordSetId::TuningPhrases,
        KeywordSetId::EquipmentContext,
        KeywordSetId::SoftwareIndicators,
        KeywordSetId::DevelopmentVerbs,
        KeywordSetId::TechnicalNouns,
        KeywordSetId::DevelopmentActions,
        KeywordSetId::Maintenance,
        KeywordSetId::Integration,
        KeywordSetId::Learning,
        KeywordSetId::TuningInstallation,
        KeywordSetId::TuningCalibration,
        KeywordSetId::TuningMaintenance,
        KeywordSetId::TuningDebugging,
        KeywordSetId::DevFrontend,
        KeywordSetId::DevBackend,
        KeywordSetId::DevAlgorithm,
        KeywordSetId::DevArchitecture,
        KeywordSetId::DevTooling,
        KeywordSetId::MaintBugfix,
        KeywordSetId::MaintPerformance,
        KeywordSetId::MaintImprovement,
        KeywordSetId::MaintRefactor,
        KeywordSetId::MaintVersion,
        KeywordSetId::IntegThirdParty,
        KeywordSetId::IntegDevice,
        KeywordSetId::IntegDatabase,
        KeywordSetId::IntegNetwork,
        KeywordSetId::LearningResearch,
        KeywordSetId::AreaFrontend,
        KeywordSetId::AreaBackend,
        KeywordSetId::AreaAlgorithm,
        KeywordSetId::AreaDevice,
        KeywordSetId::AreaArchitecture,
        KeywordSetId::AreaData,
        KeywordSetId::AreaTesting,
        KeywordSetId::ItemBug,
        KeywordSetId::ItemRequirement,
    ];

    /// Name used for this set in the `[keywords.sets]` config table.
    pub fn key(&self) -> &'static str {
        match self {
            KeywordSetId::TuningPhrases => "tuning_phrases",
            KeywordSetId::EquipmentContext => "equipment_context",
            KeywordSetId::SoftwareIndicators => "software_indicators",
            KeywordSetId::DevelopmentVerbs => "development_verbs",
            KeywordSetId::TechnicalNouns => "technical_nouns",
            KeywordSetId::DevelopmentActions => "development_actions",
            KeywordSetId::Maintenance => "maintenance",
            KeywordSetId::Integration => "integration",
            KeywordSetId::Learning => "learning",
            KeywordSetId::TuningInstallation => "tuning_installation",
            KeywordSetId::TuningCalibration => "tuning_calibration",
            KeywordSetId::TuningMaintenance => "tuning_maintenance",
            KeywordSetId::TuningDebugging => "tuning_debugging",
            KeywordSetId::DevFrontend => "dev_frontend",
            KeywordSetId::DevBackend => "dev_backend",
            KeywordSetId::DevAlgorithm => "dev_algorithm",
            KeywordSetId::DevArchitecture => "dev_architecture",
            KeywordSetId::DevTooling => "dev_tooling",
            KeywordSetId::MaintBugfix => "maint_bugfix",
            KeywordSetId::MaintPerformance => "maint_performance",
            KeywordSetId::MaintImprovement => "maint_improvement",
            KeywordSetId::MaintRefactor => "maint_refactor",
            KeywordSetId::MaintVersion => "maint_version",
            KeywordSetId::IntegThirdParty => "integ_third_party",
            KeywordSetId::IntegDevice => "integ_device",
            KeywordSetId::IntegDatabase => "integ_database",
            KeywordSetId::IntegNetwork => "integ_network",
            KeywordSetId::LearningResearch => "learning_research",
            KeywordSetId::AreaFrontend => "area_frontend",
            KeywordSetId::AreaBackend => "area_backend",
            KeywordSetId::AreaAlgorithm => "area_algorithm",
            KeywordSetId::AreaDevice => "area_device",
            KeywordSetId::AreaArchitecture => "area_architecture",
            KeywordSetId::AreaData => "area_data",
            KeywordSetId::AreaTesting => "area_testing",
            KeywordSetId::ItemBug => "item_bug",
            KeywordSetId::ItemRequirement => "item_requirement",
        }
    }

    /// Look up a set by its config name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.key() == key)
    }

    /// Built-in terms of this set. All entries are lowercase.
    pub fn default_terms(&self) -> &'static [&'static str] {
        match self {
            KeywordSetId::TuningPhrases => &[
                "调机", "设备调试", "机器调试", "系统调机", "调试设备", "设备调整", "机台调试",
                "调试机器", "现场调试", "现场校准", "设备校准", "设备维护", "机器维护",
                "设备安装", "机器安装", "设备配置", "机器配置", "machine tuning",
                "equipment debugging", "equipment tuning", "on-site calibration",
            ],
            KeywordSetId::EquipmentContext => &[
                "设备", "机台", "机器", "产线", "plc", "传感器", "电机", "伺服", "气缸", "相机",
                "光源", "治具", "夹具", "设备通讯", "device communication", "sensor", "servo",
                "motor", "fixture",
            ],
            KeywordSetId::SoftwareIndicators => &[
                "软件", "代码", "程序", "界面", "前端", "后端", "数据库", "接口", "api", "算法",
                "功能", "模块", "bug", "脚本", "software", "code", "program", "script",
                "database", "frontend", "backend",
            ],
            KeywordSetId::DevelopmentVerbs => &[
                "开发", "实现", "编写", "创建", "构建", "设计", "新增", "添加", "develop",
                "implement", "write", "create", "build", "design", "add",
            ],
            KeywordSetId::TechnicalNouns => &[
                "功能", "模块", "接口", "api", "算法", "界面", "ui", "数据库", "系统", "平台",
                "页面", "组件", "feature", "module", "interface", "algorithm", "database",
                "system", "component",
            ],
            KeywordSetId::DevelopmentActions => &[
                "开发", "实现", "编写", "完成", "搭建", "部署", "上线", "develop", "implement",
                "deliver",
            ],
            KeywordSetId::Maintenance => &[
                "bug", "修复", "修改", "解决", "问题", "错误", "异常", "故障", "优化", "改进",
                "完善", "调整", "更新", "升级", "重构", "fix", "resolve", "problem", "error",
                "exception", "fault", "optimiz", "improve", "update", "upgrade", "refactor",
            ],
            KeywordSetId::Integration => &[
                "集成", "对接", "联调", "连接", "通讯", "通信", "协议", "部署", "测试", "上线",
                "integrat", "connect", "protocol", "deploy", "test",
            ],
            KeywordSetId::Learning => &[
                "学习", "了解", "研究", "调研", "熟悉", "learn", "understand", "research",
                "survey", "study",
            ],
            KeywordSetId::TuningInstallation => &[
                "安装", "配置", "布线", "接线", "install", "setup", "config",
            ],
            KeywordSetId::TuningCalibration => &["校准", "标定", "校正", "calibrat"],
            KeywordSetId::TuningMaintenance => &[
                "维护", "保养", "检修", "维修", "maintenance", "repair",
            ],
            KeywordSetId::TuningDebugging => &[
                "调试", "调机", "调整", "调校", "debug", "tuning", "tune",
            ],
            KeywordSetId::DevFrontend => &[
                "前端", "界面", "页面", "ui", "交互", "vue", "react", "web", "frontend",
            ],
            KeywordSetId::DevBackend => &[
                "后端", "服务", "接口", "api", "数据库", "服务器", "backend", "server",
                "service", "database",
            ],
            KeywordSetId::DevAlgorithm => &[
                "算法", "模型", "识别", "检测", "视觉", "深度学习", "神经网络", "人工智能",
                "algorithm", "model", "vision", "detection",
            ],
            KeywordSetId::DevArchitecture => &[
                "架构", "框架", "系统设计", "平台", "微服务", "architecture", "framework",
                "platform",
            ],
            KeywordSetId::DevTooling => &[
                "工具", "脚本", "自动化", "插件", "tool", "script", "automation", "plugin",
            ],
            KeywordSetId::MaintBugfix => &[
                "bug", "修复", "解决", "错误", "异常", "故障", "问题", "fix", "resolve",
                "error", "exception", "fault",
            ],
            KeywordSetId::MaintPerformance => &[
                "性能", "速度", "效率", "内存", "卡顿", "耗时", "performance", "speed",
                "latency", "memory",
            ],
            KeywordSetId::MaintImprovement => &[
                "优化", "改进", "完善", "调整", "optimiz", "improv", "enhance",
            ],
            KeywordSetId::MaintRefactor => &["重构", "整理", "清理", "refactor", "cleanup"],
            KeywordSetId::MaintVersion => &[
                "更新", "升级", "版本", "迭代", "update", "upgrade", "version", "release",
            ],
            KeywordSetId::IntegThirdParty => &[
                "第三方", "对接", "api", "接口", "sdk", "third-party", "third party",
            ],
            KeywordSetId::IntegDevice => &[
                "设备", "硬件", "plc", "传感器", "相机", "下位机", "device", "hardware",
                "sensor",
            ],
            KeywordSetId::IntegDatabase => &[
                "数据库", "sql", "mysql", "oracle", "redis", "database",
            ],
            KeywordSetId::IntegNetwork => &[
                "网络", "协议", "通讯", "通信", "tcp", "udp", "http", "modbus", "mqtt",
                "network", "protocol",
            ],
            KeywordSetId::LearningResearch => &[
                "研究", "调研", "预研", "分析", "research", "survey", "investigat",
            ],
            KeywordSetId::AreaFrontend => &[
                "前端", "界面", "页面", "ui", "vue", "react", "web", "frontend",
            ],
            KeywordSetId::AreaBackend => &[
                "后端", "服务", "接口", "api", "服务器", "backend", "server",
            ],
            KeywordSetId::AreaAlgorithm => &[
                "算法", "模型", "识别", "视觉", "深度学习", "神经网络", "人工智能",
                "algorithm", "model", "vision",
            ],
            KeywordSetId::AreaDevice => &[
                "设备", "plc", "电机", "伺服", "传感器", "运动控制", "下位机", "device",
                "motor", "servo", "sensor",
            ],
            KeywordSetId::AreaArchitecture => &[
                "架构", "框架", "系统", "平台", "architecture", "framework", "platform",
            ],
            KeywordSetId::AreaData => &[
                "数据", "报表", "统计", "导入", "导出", "data", "report", "etl",
            ],
            KeywordSetId::AreaTesting => &["测试", "验证", "用例", "test", "verif"],
            KeywordSetId::ItemBug => &[
                "bug", "修复", "修改", "解决", "问题", "错误", "异常", "故障", "fix", "resolve",
                "problem", "error", "exception", "fault",
            ],
            KeywordSetId::ItemRequirement => &[
                "实现", "开发", "新增", "添加", "功能", "需求", "特性", "implement", "develop",
                "add", "feature", "requirement",
            ],
        }
    }
}

/// Built-in sets keyed by config name, as written by `--init-config`.
pub fn default_sets() -> BTreeMap<String, Vec<String>> {
    KeywordSetId::ALL
        .iter()
        .map(|id| {
            let terms = id.default_terms().iter().map(|t| t.to_string()).collect();
            (id.key().to_string(), terms)
        })
        .collect()
}

/// Resolved keyword sets, lowercased and ready for matching.
#[derive(Debug, Clone)]
pub struct Lexicon {
    version: u32,
    sets: HashMap<KeywordSetId, Vec<String>>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let sets = KeywordSetId::ALL
            .iter()
            .map(|id| (*id, normalize_terms(id.default_terms().iter().copied())))
            .collect();

        Self {
            version: KEYWORDS_VERSION,
            sets,
        }
    }
}

impl Lexicon {
    /// Build a lexicon from configuration; named sets replace the built-ins.
    pub fn from_config(config: &KeywordConfig) -> Self {
        let mut lexicon = Self::default();
        lexicon.version = config.version;

        for (name, terms) in &config.sets {
            match KeywordSetId::from_key(name) {
                Some(id) => {
                    let terms = normalize_terms(terms.iter().map(String::as_str));
                    if terms.is_empty() {
                        warn!("Keyword set '{}' is empty; rules using it never match", name);
                    }
                    lexicon.sets.insert(id, terms);
                }
                None => warn!("Ignoring unknown keyword set '{}'", name),
            }
        }

        debug!(
            "Keyword lexicon v{} with {} sets",
            lexicon.version,
            lexicon.sets.len()
        );
        lexicon
    }

    /// Version of the keyword configuration in use.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Terms of a set.
    pub fn terms(&self, id: KeywordSetId) -> &[String] {
        self.sets.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `text` (already lowercased) contains any term of the set.
    pub fn contains_any(&self, id: KeywordSetId, text: &str) -> bool {
        self.terms(id)
            .iter()
            .any(|term| occurrences(text, term).next().is_some())
    }

    /// Number of distinct terms of the set found in `text`.
    ///
    /// Terms are matched longest first and a match may not overlap one
    /// already counted, so "设备通讯" counts once and not again as "设备".
    pub fn count_distinct(&self, id: KeywordSetId, text: &str) -> usize {
        let mut terms: Vec<&str> = self.terms(id).iter().map(String::as_str).collect();
        terms.sort_by_key(|term| Reverse(term.len()));

        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut count = 0;
        for term in terms {
            let free: Vec<Range<usize>> = occurrences(text, term)
                .map(|start| start..start + term.len())
                .filter(|span| {
                    claimed
                        .iter()
                        .all(|taken| span.end <= taken.start || taken.end <= span.start)
                })
                .collect();
            if !free.is_empty() {
                count += 1;
                claimed.extend(free);
            }
        }
        count
    }
}

/// Byte offsets at which `term` occurs in `text`.
///
/// A term starting with an ASCII letter or digit only matches at the start
/// of a word: "ui" does not match inside "build". The end stays open so
/// stems like "optimiz" still cover "optimized".
fn occurrences<'a>(text: &'a str, term: &'a str) -> impl Iterator<Item = usize> + 'a {
    let word_start = term
        .as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_alphanumeric());

    text.match_indices(term)
        .map(|(start, _)| start)
        .filter(move |&start| {
            !word_start || start == 0 || !text.as_bytes()[start - 1].is_ascii_alphanumeric()
        })
}

/// Lowercase, trim and dedupe terms, dropping empty ones.
fn normalize_terms<'a>(terms: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}
