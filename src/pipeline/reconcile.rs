use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::core::models::{MasterRecord, SkillValue};
use crate::index::flatten::UnitCategory;
use crate::llm::rephrase::RewrittenUnit;

/// Folds the rewritten units back into a Master-Record shape.
///
/// Policy per section:
/// - `skills`: fully replaced by the incoming skills groups; original
///   categories without surviving units are dropped.
/// - `experiences`/`projects`: description replaced when the entry received
///   units, the whole entry pruned otherwise.
/// - `certifications`: binary retain/delete, entries kept unchanged.
/// - `educations`: passed through untouched (never indexed).
///
/// Units referencing a source id that does not exist in the master record are
/// orphans (stale index) and are ignored. The caller's record is taken by
/// value; output key sets for experiences/projects/certifications are always
/// subsets of the input's.
pub fn reconcile(master: MasterRecord, units: &[RewrittenUnit]) -> MasterRecord {
    let groups = group_by_source(units);
    let mut output = master;

    info!(
        "Reconciling {} rewritten units into resume structure",
        units.len()
    );

    // Skills are replaced wholesale, never merged.
    let skills_groups = groups.get(&UnitCategory::Skills);
    output.skills = skills_groups
        .map(|by_source| {
            by_source
                .iter()
                .map(|(group, texts)| (group.clone(), SkillValue::List(texts.clone())))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    let empty = HashMap::new();

    let experience_groups = groups.get(&UnitCategory::Experiences).unwrap_or(&empty);
    output.experiences.retain(|key, exp| {
        match experience_groups.get(key) {
            Some(texts) => {
                exp.description = texts.clone();
                true
            }
            None => {
                debug!("Removing experience {} (no relevant content)", key);
                false
            }
        }
    });

    let project_groups = groups.get(&UnitCategory::Projects).unwrap_or(&empty);
    output.projects.retain(|key, proj| {
        match project_groups.get(key) {
            Some(texts) => {
                proj.description = texts.clone();
                true
            }
            None => {
                debug!("Removing project {} (no relevant content)", key);
                false
            }
        }
    });

    let certification_groups = groups.get(&UnitCategory::Certifications).unwrap_or(&empty);
    output.certifications.retain(|key, _| {
        let keep = certification_groups.contains_key(key);
        if !keep {
            debug!("Removing certification {} (no relevant content)", key);
        }
        keep
    });

    output
}

/// Groups incoming unit texts by `(category, source_id)`, preserving the
/// order units were supplied in each group.
fn group_by_source(
    units: &[RewrittenUnit],
) -> HashMap<UnitCategory, HashMap<String, Vec<String>>> {
    let mut groups: HashMap<UnitCategory, HashMap<String, Vec<String>>> = HashMap::new();
    for unit in units {
        groups
            .entry(unit.metadata.category)
            .or_default()
            .entry(unit.metadata.source_id.clone())
            .or_default()
            .push(unit.text.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Certification, Education, Experience, Project};
    use crate::index::flatten::UnitMetadata;
    use std::collections::BTreeSet;

    fn unit(category: UnitCategory, source_id: &str, text: &str) -> RewrittenUnit {
        RewrittenUnit {
            text: text.to_string(),
            metadata: UnitMetadata {
                source_id: source_id.to_string(),
                category,
                title: "Title".to_string(),
            },
        }
    }

    fn master() -> MasterRecord {
        let mut record = MasterRecord::default();
        for key in ["experience_1", "experience_2"] {
            record.experiences.insert(
                key.to_string(),
                Experience {
                    position: "Engineer".to_string(),
                    company: "Acme".to_string(),
                    location: String::new(),
                    start_date: String::new(),
                    end_date: String::new(),
                    description: vec!["original bullet".to_string()],
                },
            );
        }
        record.projects.insert(
            "project_1".to_string(),
            Project {
                name: "Crawler".to_string(),
                technologies: "Rust".to_string(),
                description: vec!["original project bullet".to_string()],
            },
        );
        record.skills.insert(
            "languages".to_string(),
            SkillValue::Text("Rust, Python, Go".to_string()),
        );
        record.skills.insert(
            "tools".to_string(),
            SkillValue::Text("Docker, Kubernetes".to_string()),
        );
        record.certifications.insert(
            "certification_1".to_string(),
            Certification {
                name: "AWS SAA".to_string(),
                issuer: "AWS".to_string(),
                date: "2023".to_string(),
            },
        );
        record.educations.insert(
            "education_1".to_string(),
            Education {
                degree: "BSc".to_string(),
                field_of_study: "CS".to_string(),
                university: "MIT".to_string(),
                start_date: String::new(),
                end_date: String::new(),
            },
        );
        record
    }

    #[test]
    fn test_pruning_unmatched_experiences() {
        let units = vec![
            unit(UnitCategory::Experiences, "experience_1", "rewritten one"),
            unit(UnitCategory::Experiences, "experience_1", "rewritten two"),
        ];
        let output = reconcile(master(), &units);

        assert_eq!(output.experiences.len(), 1);
        assert_eq!(
            output.experiences["experience_1"].description,
            vec!["rewritten one", "rewritten two"]
        );
        assert!(!output.experiences.contains_key("experience_2"));
        // Untouched entry fields survive replacement.
        assert_eq!(output.experiences["experience_1"].company, "Acme");
    }

    #[test]
    fn test_skills_full_replacement() {
        let units = vec![unit(UnitCategory::Skills, "languages", "Rust, Python")];
        let output = reconcile(master(), &units);

        assert_eq!(output.skills.len(), 1);
        assert_eq!(
            output.skills["languages"],
            SkillValue::List(vec!["Rust, Python".to_string()])
        );
        assert!(!output.skills.contains_key("tools"));
    }

    #[test]
    fn test_zero_skills_units_empties_skills() {
        let units = vec![unit(UnitCategory::Experiences, "experience_1", "bullet")];
        let output = reconcile(master(), &units);
        assert!(output.skills.is_empty());
    }

    #[test]
    fn test_certification_retained_unchanged() {
        let units = vec![unit(
            UnitCategory::Certifications,
            "certification_1",
            "rewritten cert text is ignored",
        )];
        let output = reconcile(master(), &units);
        assert_eq!(
            output.certifications["certification_1"],
            master().certifications["certification_1"]
        );
    }

    #[test]
    fn test_certification_deleted_when_absent() {
        let output = reconcile(master(), &[]);
        assert!(output.certifications.is_empty());
    }

    #[test]
    fn test_educations_passed_through() {
        let output = reconcile(master(), &[]);
        assert_eq!(output.educations, master().educations);
    }

    #[test]
    fn test_orphaned_source_id_is_ignored() {
        let units = vec![
            unit(UnitCategory::Experiences, "experience_1", "kept"),
            unit(UnitCategory::Experiences, "experience_99", "stale index entry"),
            unit(UnitCategory::Projects, "project_99", "stale too"),
        ];
        let output = reconcile(master(), &units);
        assert_eq!(output.experiences.len(), 1);
        assert!(output.projects.is_empty());
    }

    #[test]
    fn test_subset_invariant() {
        let input = master();
        let units = vec![
            unit(UnitCategory::Experiences, "experience_2", "a"),
            unit(UnitCategory::Projects, "project_1", "b"),
            unit(UnitCategory::Skills, "brand_new_category", "c"),
        ];
        let output = reconcile(input.clone(), &units);

        let out_exp: BTreeSet<String> = output.experiences.keys().cloned().collect();
        let in_exp: BTreeSet<String> = input.experiences.keys().cloned().collect();
        assert!(out_exp.is_subset(&in_exp));

        let out_proj: BTreeSet<String> = output.projects.keys().cloned().collect();
        let in_proj: BTreeSet<String> = input.projects.keys().cloned().collect();
        assert!(out_proj.is_subset(&in_proj));

        let out_cert: BTreeSet<String> = output.certifications.keys().cloned().collect();
        let in_cert: BTreeSet<String> = input.certifications.keys().cloned().collect();
        assert!(out_cert.is_subset(&in_cert));
        // Skills key set is exactly the incoming groups.
        assert_eq!(
            output.skills.keys().cloned().collect::<Vec<_>>(),
            vec!["brand_new_category"]
        );
    }

    #[test]
    fn test_supplied_order_preserved_within_group() {
        let units = vec![
            unit(UnitCategory::Experiences, "experience_1", "third most relevant"),
            unit(UnitCategory::Experiences, "experience_1", "first supplied wins order"),
        ];
        let output = reconcile(master(), &units);
        assert_eq!(
            output.experiences["experience_1"].description,
            vec!["third most relevant", "first supplied wins order"]
        );
    }
}
