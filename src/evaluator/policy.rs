//! 评审数据契约与验收规则
//!
//! 六项分数共用 0–10 区间；验收规则只依赖分数，确定性地重新计算，评审模型自报的 is_acceptable 不参与判定。

use serde::{Deserialize, Serialize};

/// 越界判定的保留前缀：feedback 以此开头即表示消息完全超出职业助理的范围
pub const OUT_OF_SCOPE_MARKER: &str = "OUT_OF_SCOPE";

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// 每一项分数的下限
pub const DEFAULT_SCORE_FLOOR: f64 = 5.0;
/// 六项平均分的验收阈值
pub const DEFAULT_SCORE_THRESHOLD: f64 = 5.0;
/// career_relevance 低于此值时强制判定越界（比 DEFAULT_SCORE_FLOOR 更低、优先级更高）
pub const DEFAULT_RELEVANCE_FLOOR: f64 = 2.0;

/// 六项评分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub professionalism: f64,
    pub clarity: f64,
    pub completeness: f64,
    pub safety: f64,
    pub relevance: f64,
    /// 话题相关性：消息本身是否与招聘 / 职业相关
    pub career_relevance: f64,
}

impl Scores {
    /// 按 professionalism, clarity, completeness, safety, relevance, career_relevance 顺序构造
    pub fn from_array(values: [f64; 6]) -> Self {
        let [professionalism, clarity, completeness, safety, relevance, career_relevance] = values;
        Self {
            professionalism,
            clarity,
            completeness,
            safety,
            relevance,
            career_relevance,
        }
    }

    pub fn uniform(value: f64) -> Self {
        Self::from_array([value; 6])
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.professionalism,
            self.clarity,
            self.completeness,
            self.safety,
            self.relevance,
            self.career_relevance,
        ]
    }

    pub fn mean(&self) -> f64 {
        self.values().iter().sum::<f64>() / 6.0
    }

    /// 均值归一化到 [0,1]
    pub fn normalized_mean(&self) -> f64 {
        (self.mean() / SCORE_MAX).clamp(0.0, 1.0)
    }

    /// 返回第一个非有限或越界的分数名
    pub fn out_of_range(&self) -> Option<&'static str> {
        const NAMES: [&str; 6] = [
            "professionalism",
            "clarity",
            "completeness",
            "safety",
            "relevance",
            "career_relevance",
        ];
        NAMES
            .into_iter()
            .zip(self.values())
            .find(|(_, v)| !v.is_finite() || *v < SCORE_MIN || *v > SCORE_MAX)
            .map(|(name, _)| name)
    }
}

/// 一次评审结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub is_acceptable: bool,
    pub feedback: String,
    pub confidence: f64,
    pub scores: Scores,
}

impl Evaluation {
    pub fn is_out_of_scope(&self) -> bool {
        self.feedback.starts_with(OUT_OF_SCOPE_MARKER)
    }
}

/// 验收规则：下限、阈值与越界下限均为配置项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    pub score_floor: f64,
    pub score_threshold: f64,
    pub relevance_floor: f64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            score_floor: DEFAULT_SCORE_FLOOR,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
        }
    }
}

impl AcceptancePolicy {
    /// 对分数应用验收规则，得到完整的 Evaluation
    ///
    /// 1. 全部分数 >= score_floor 且均值 >= score_threshold 才可接受；
    /// 2. career_relevance < relevance_floor 时强制不可接受，feedback 补上越界前缀；
    /// 3. feedback 已带越界前缀时同样不可接受；
    /// 4. confidence 未提供时取归一化均值，提供时截断到 [0,1]。
    pub fn judge(&self, scores: Scores, feedback: impl Into<String>, confidence: Option<f64>) -> Evaluation {
        let mut feedback = feedback.into();

        let passes_floor = scores.values().iter().all(|s| *s >= self.score_floor);
        let passes_threshold = scores.mean() >= self.score_threshold;
        let mut is_acceptable = passes_floor && passes_threshold;

        if scores.career_relevance < self.relevance_floor {
            is_acceptable = false;
            if !feedback.starts_with(OUT_OF_SCOPE_MARKER) {
                feedback = format!("{}: {}", OUT_OF_SCOPE_MARKER, feedback.trim());
            }
        } else if feedback.starts_with(OUT_OF_SCOPE_MARKER) {
            is_acceptable = false;
        }

        let confidence = confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or_else(|| scores.normalized_mean());

        Evaluation {
            is_acceptable,
            feedback,
            confidence,
            scores,
        }
    }
}
