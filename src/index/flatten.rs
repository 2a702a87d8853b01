use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::core::models::MasterRecord;

/// Source section a unit was flattened from. Educations are deliberately not
/// represented: they are never retrieved or rewritten.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnitCategory {
    Experiences,
    Projects,
    Skills,
    Certifications,
}

/// Routing metadata carried alongside a unit's text through retrieval and
/// rewriting. The rewrite step must return it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitMetadata {
    pub source_id: String,
    pub category: UnitCategory,
    pub title: String,
}

/// The atomic retrievable item: one experience/project bullet, one skill
/// group, or one certification name. Units are regenerated on every flatten
/// pass and never outlive an index generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub text: String,
    pub category: UnitCategory,
    pub source_id: String,
    pub title: String,
}

impl Unit {
    pub fn metadata(&self) -> UnitMetadata {
        UnitMetadata {
            source_id: self.source_id.clone(),
            category: self.category,
            title: self.title.clone(),
        }
    }
}

/// Flattens the master record into independently retrievable units.
///
/// Ids are derived deterministically: `{source_id}_{ordinal}` for list-valued
/// descriptions, the source id itself for singleton fields. Map iteration is
/// over BTreeMaps, so flattening the same record twice yields the same id
/// sequence, which keeps reindexing idempotent.
pub fn flatten_master_record(record: &MasterRecord) -> Vec<Unit> {
    let mut units = Vec::new();

    for (exp_key, exp) in &record.experiences {
        for (i, bullet) in exp.description.iter().enumerate() {
            units.push(Unit {
                id: format!("{exp_key}_{i}"),
                text: bullet.clone(),
                category: UnitCategory::Experiences,
                source_id: exp_key.clone(),
                title: exp.position.clone(),
            });
        }
    }

    for (proj_key, proj) in &record.projects {
        for (i, bullet) in proj.description.iter().enumerate() {
            units.push(Unit {
                id: format!("{proj_key}_{i}"),
                text: bullet.clone(),
                category: UnitCategory::Projects,
                source_id: proj_key.clone(),
                title: proj.name.clone(),
            });
        }
    }

    // One unit per skills category; empty values produce nothing.
    for (category, value) in &record.skills {
        if value.is_empty() {
            continue;
        }
        units.push(Unit {
            id: category.clone(),
            text: value.joined(),
            category: UnitCategory::Skills,
            source_id: category.clone(),
            title: category.clone(),
        });
    }

    for (cert_key, cert) in &record.certifications {
        units.push(Unit {
            id: cert_key.clone(),
            text: cert.name.clone(),
            category: UnitCategory::Certifications,
            source_id: cert_key.clone(),
            title: cert.name.clone(),
        });
    }

    debug!("Flattened master record into {} units", units.len());
    units
}
