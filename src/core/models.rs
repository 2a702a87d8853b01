use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Structured requirements extracted from a job posting by the analysis step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequirements {
    pub target_role: String,
    #[serde(default)]
    pub must_have_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub keywords_and_phrases: Vec<String>,
    #[serde(default)]
    pub core_responsibilities: Vec<String>,
}

impl JobRequirements {
    /// Single embedding query mixing role identity, hard constraints and soft
    /// signals. Trades precision for recall across all three.
    pub fn retrieval_query(&self) -> String {
        let mut query = self.target_role.clone();
        for skill in &self.must_have_skills {
            query.push(' ');
            query.push_str(skill);
        }
        for keyword in &self.keywords_and_phrases {
            query.push(' ');
            query.push_str(keyword);
        }
        query
    }
}

/// A skills category value in the master record: either one comma-separated
/// string or a list of skill strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SkillValue {
    Text(String),
    List(Vec<String>),
}

impl SkillValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Flattened, display-ready form of the value.
    pub fn joined(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Accepts any JSON value where a bullet list is expected. Anything that is
/// not an array of strings deserializes to an empty list so one malformed
/// entry never aborts a pipeline run.
fn lenient_bullets<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experience {
    pub position: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default, deserialize_with = "lenient_bullets")]
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub technologies: String,
    #[serde(default, deserialize_with = "lenient_bullets")]
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Education {
    pub degree: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
}

/// The candidate's full structured background. Section maps are BTreeMaps so
/// that iteration order is deterministic; re-flattening identical input must
/// yield identical unit id sequences.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MasterRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub portfolio_website: String,
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub experiences: BTreeMap<String, Experience>,
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillValue>,
    #[serde(default)]
    pub certifications: BTreeMap<String, Certification>,
    #[serde(default)]
    pub educations: BTreeMap<String, Education>,
}

/// ATS-style evaluation of the tailored record against the requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsReport {
    pub ats_score_percentage: u8,
    #[serde(default)]
    pub missing_critical_skills: Vec<String>,
    #[serde(default)]
    pub suggestions_for_improvement: Vec<String>,
}
