//! Project validation logic.

use std::collections::HashSet;

use tw_semantic::component_id_for;

use crate::schema::{Project, SemanticDef, SimulationDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let mut component_ids = HashSet::new();
    for component in &project.components {
        if component.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "components.id".to_string(),
                value: component.id.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if !component_ids.insert(component.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: component.id.clone(),
                context: "components".to_string(),
            });
        }
        component
            .kind
            .validate()
            .map_err(|e| ValidationError::InvalidValue {
                field: format!("components.{}", component.id),
                value: component.kind.type_name().to_string(),
                reason: e.to_string(),
            })?;
    }

    // Components discovered from the semantic description can be wired explicitly too.
    let mut known: HashSet<String> = component_ids.iter().map(|id| id.to_string()).collect();
    if let Some(semantic) = &project.semantic {
        validate_semantic(semantic)?;
        known.extend(semantic.nodes.iter().map(|n| component_id_for(&n.name)));
    }

    for conn in &project.connections {
        for (id, context) in [(&conn.from, "connection from"), (&conn.to, "connection to")] {
            if !known.contains(id.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: id.clone(),
                    context: context.to_string(),
                });
            }
        }
        for (port, field) in [(&conn.from_port, "from_port"), (&conn.to_port, "to_port")] {
            if port.is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: format!("connections.{field}"),
                    value: String::new(),
                    reason: format!("port of {} -> {} must not be empty", conn.from, conn.to),
                });
            }
        }
    }

    if let Some(sim) = &project.simulation {
        validate_simulation(sim)?;
    }

    Ok(())
}

fn validate_semantic(semantic: &SemanticDef) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for node in &semantic.nodes {
        if !names.insert(node.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: node.name.clone(),
                context: "semantic nodes".to_string(),
            });
        }
        if let Some((key, value)) = node.properties.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::InvalidValue {
                field: format!("semantic.nodes.{}.{}", node.name, key),
                value: value.to_string(),
                reason: "must be finite".to_string(),
            });
        }
    }

    for triple in &semantic.triples {
        for id in [&triple.subject, &triple.object] {
            if !names.contains(id.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: id.clone(),
                    context: format!("triple with predicate '{}'", triple.predicate),
                });
            }
        }
    }

    let mut classes = HashSet::new();
    for class in &semantic.classes {
        if !classes.insert(class.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: class.name.clone(),
                context: "semantic classes".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    if !sim.step_size_s.is_finite() || sim.step_size_s <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "simulation.step_size_s".to_string(),
            value: sim.step_size_s.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if sim.end <= sim.start {
        return Err(ValidationError::InvalidValue {
            field: "simulation.end".to_string(),
            value: sim.end.to_string(),
            reason: format!("must be after start {}", sim.start),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComponentDef, ConnectionDef, SemanticNodeDef, TripleDef};
    use tw_components::{ComponentConfig, Constant, Gain};

    fn component(id: &str, kind: ComponentConfig) -> ComponentDef {
        ComponentDef {
            id: id.to_string(),
            kind,
            save_history: true,
        }
    }

    fn project() -> Project {
        let mut p = Project::new("test");
        p.components = vec![
            component("a", ComponentConfig::Constant(Constant { value: 5.0 })),
            component("b", ComponentConfig::Gain(Gain { k: 2.0 })),
        ];
        p.connections = vec![ConnectionDef {
            from: "a".into(),
            from_port: "value".into(),
            to: "b".into(),
            to_port: "u".into(),
            feedback: false,
        }];
        p
    }

    #[test]
    fn valid_project_passes() {
        assert_eq!(validate_project(&project()), Ok(()));
    }

    #[test]
    fn duplicate_component_ids_are_rejected() {
        let mut p = project();
        p.components.push(component("a", ComponentConfig::Gain(Gain { k: 1.0 })));
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn dangling_connection_is_rejected() {
        let mut p = project();
        p.connections[0].to = "nowhere".into();
        assert_eq!(
            validate_project(&p),
            Err(ValidationError::MissingReference {
                id: "nowhere".into(),
                context: "connection to".into(),
            })
        );
    }

    #[test]
    fn connections_may_target_semantic_nodes() {
        let mut p = project();
        p.semantic = Some(SemanticDef {
            nodes: vec![SemanticNodeDef {
                name: "zone sensor".into(),
                class: "Sensor".into(),
                properties: Default::default(),
            }],
            ..SemanticDef::default()
        });
        p.connections[0].to = "zone_sensor".into();
        assert_eq!(validate_project(&p), Ok(()));
    }

    #[test]
    fn triples_must_reference_nodes() {
        let mut p = project();
        p.semantic = Some(SemanticDef {
            triples: vec![TripleDef {
                subject: "s".into(),
                predicate: "observes".into(),
                object: "t".into(),
            }],
            ..SemanticDef::default()
        });
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn bad_parameters_and_versions_are_rejected() {
        let mut p = project();
        p.components[1].kind = ComponentConfig::Gain(Gain { k: f64::NAN });
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::InvalidValue { .. })
        ));

        let mut p = project();
        p.version = 99;
        assert_eq!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion { version: 99 })
        );
    }

    #[test]
    fn simulation_period_is_checked() {
        let mut p = project();
        let t = chrono::NaiveDate::from_ymd_opt(2021, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        p.simulation = Some(SimulationDef {
            step_size_s: 600.0,
            start: t,
            end: t,
        });
        assert!(validate_project(&p).is_err());
    }
}
