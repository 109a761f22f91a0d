//! Text templates for reports and dialogue replies
//!
//! Like the rule tables, these are loaded once and shared read-only.

use crate::error::AssessError;
use crate::types::{Dimension, SeverityCategory};
use serde::{Deserialize, Serialize};

/// One value per severity category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub normal: T,
    pub mild: T,
    pub moderate: T,
    pub severe: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: SeverityCategory) -> &T {
        match category {
            SeverityCategory::Normal => &self.normal,
            SeverityCategory::Mild => &self.mild,
            SeverityCategory::Moderate => &self.moderate,
            SeverityCategory::Severe => &self.severe,
        }
    }
}

/// One value per cognitive dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerDimension<T> {
    pub memory: T,
    pub orientation: T,
    pub language: T,
    pub attention: T,
    pub problem_solving: T,
}

impl<T> PerDimension<T> {
    pub fn get(&self, dimension: Dimension) -> &T {
        match dimension {
            Dimension::Memory => &self.memory,
            Dimension::Orientation => &self.orientation,
            Dimension::Language => &self.language,
            Dimension::Attention => &self.attention,
            Dimension::ProblemSolving => &self.problem_solving,
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Narrative templates used by the report generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTemplates {
    pub observations_heading: String,
    pub recommendation_heading: String,
    /// Opening sentences, one picked at random
    pub narratives: PerCategory<Vec<String>>,
    /// Observation appended for each elevated dimension
    pub observations: PerDimension<String>,
    /// Fixed recommendation per category
    pub recommendations: PerCategory<String>,
}

impl Default for ReportTemplates {
    fn default() -> Self {
        Self {
            observations_heading: "具体观察：".to_string(),
            recommendation_heading: "建议：".to_string(),
            narratives: PerCategory {
                normal: owned(&[
                    "患者当前认知功能处于正常范围，未发现明显失智症状。",
                    "患者思维清晰，记忆、语言及问题解决能力正常。",
                    "评估显示患者认知功能良好，无需特别干预。",
                ]),
                mild: owned(&[
                    "患者表现出轻度认知障碍，可能处于失智症早期阶段。",
                    "患者在记忆和方向感方面有轻微困难，但日常功能基本正常。",
                    "评估显示患者有轻度认知功能衰退，建议定期监测。",
                ]),
                moderate: owned(&[
                    "患者表现出中度失智症状，认知功能明显下降。",
                    "患者在记忆、语言表达和日常决策方面存在显著困难。",
                    "评估显示患者认知能力中度受损，需要适当照护支持。",
                ]),
                severe: owned(&[
                    "患者表现出严重失智症状，认知功能严重受损。",
                    "患者在大多数认知领域表现出显著困难，需要全面照护。",
                    "评估显示患者处于失智症晚期阶段，需要专业护理支持。",
                ]),
            },
            observations: PerDimension {
                memory: "患者记忆力受损明显，表现为短期记忆困难。".to_string(),
                orientation: "患者在时间和空间定向方面表现出困难。".to_string(),
                language: "患者语言表达能力下降，词汇查找和句子构建困难。".to_string(),
                attention: "患者注意力难以集中，容易分心。".to_string(),
                problem_solving: "患者解决问题的能力下降，思维逻辑受损。".to_string(),
            },
            recommendations: PerCategory {
                normal: "保持健康生活方式，定期认知功能检查。".to_string(),
                mild: "增加认知刺激活动，考虑专业医疗评估，定期监测认知变化。".to_string(),
                moderate: "寻求专业医疗干预，制定照护计划，确保安全环境。".to_string(),
                severe: "需要专业全天候照护，制定详细照护方案，关注生活质量。".to_string(),
            },
        }
    }
}

impl ReportTemplates {
    pub fn validate(&self) -> Result<(), AssessError> {
        for category in SeverityCategory::ALL {
            if self.narratives.get(category).is_empty() {
                return Err(AssessError::InvalidRules(format!(
                    "no report narratives for {}",
                    category.as_str()
                )));
            }
            if self.recommendations.get(category).is_empty() {
                return Err(AssessError::InvalidRules(format!(
                    "no recommendation for {}",
                    category.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Phrase pools used by the dialogue agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueTemplates {
    pub acknowledgments: Vec<String>,
    pub encouragements: Vec<String>,
    /// Open-ended prompts for normal and mild patients
    pub question_bank: Vec<String>,
    /// Shorter encouragement for moderate and severe patients
    pub simple_encouragements: Vec<String>,
    /// Shorter follow-up questions for moderate and severe patients
    pub simple_questions: Vec<String>,
}

impl Default for DialogueTemplates {
    fn default() -> Self {
        Self {
            acknowledgments: owned(&[
                "谢谢您的回答。",
                "我明白了。",
                "感谢您分享这些信息。",
                "好的，我了解了。",
            ]),
            encouragements: owned(&[
                "您分享的内容很有帮助。",
                "请继续，您做得很好。",
                "您的回答非常清晰。",
                "非常感谢您的耐心。",
            ]),
            question_bank: owned(&[
                "您能告诉我今天是几月几号吗？",
                "您现在住在哪里？可以描述一下您的住所吗？",
                "您能回忆一下您今天早上做了什么吗？",
                "您能告诉我您最近一次看医生是什么时候吗？",
                "请描述一下您现在的心情。",
                "您最喜欢的食物是什么？为什么喜欢？",
                "您能告诉我您年轻时的一个美好回忆吗？",
                "您平时有什么爱好或兴趣吗？",
                "您能说说您的家人吗？您有几个孩子？",
                "如果您遇到困难，通常会怎么解决？",
            ]),
            simple_encouragements: owned(&["您做得很好。", "谢谢您的回答。", "您的分享很重要。"]),
            simple_questions: owned(&[
                "您能告诉我您的感受吗？",
                "您现在感觉如何？",
                "您能描述一下您看到的东西吗？",
                "您能告诉我现在是什么时间吗？",
            ]),
        }
    }
}

impl DialogueTemplates {
    pub fn validate(&self) -> Result<(), AssessError> {
        let pools = [
            ("acknowledgments", &self.acknowledgments),
            ("encouragements", &self.encouragements),
            ("question_bank", &self.question_bank),
            ("simple_encouragements", &self.simple_encouragements),
            ("simple_questions", &self.simple_questions),
        ];
        for (name, pool) in pools {
            if pool.is_empty() {
                return Err(AssessError::InvalidRules(format!(
                    "dialogue pool '{name}' is empty"
                )));
            }
        }
        Ok(())
    }
}
