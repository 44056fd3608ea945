use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable description of one container within a level.
///
/// `sprite_url` is carried for presentation layers and never consulted by
/// the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub id: String,
    pub name: String,
    /// Volume units (ml). Must be positive.
    pub capacity: u32,
    /// Starting fill, 0 ≤ initial_amount ≤ capacity.
    pub initial_amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_url: Option<String>,
}

/// One win condition. All of a level's targets must hold simultaneously.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TargetRepr", into = "TargetRepr")]
pub enum Target {
    /// Satisfied if some container holds exactly `amount`.
    Any { amount: u32 },
    /// Satisfied if the named container holds exactly `amount`.
    Container { id: String, amount: u32 },
}

/// Wire shape of a target. The catalog format spells the wildcard as the
/// literal container id "ANY".
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetRepr {
    container_id: String,
    amount: u32,
}

const ANY_CONTAINER: &str = "ANY";

impl From<TargetRepr> for Target {
    fn from(repr: TargetRepr) -> Self {
        if repr.container_id == ANY_CONTAINER {
            Target::Any { amount: repr.amount }
        } else {
            Target::Container {
                id: repr.container_id,
                amount: repr.amount,
            }
        }
    }
}

impl From<Target> for TargetRepr {
    fn from(target: Target) -> Self {
        match target {
            Target::Any { amount } => TargetRepr {
                container_id: ANY_CONTAINER.to_string(),
                amount,
            },
            Target::Container { id, amount } => TargetRepr {
                container_id: id,
                amount,
            },
        }
    }
}

/// Static description of one puzzle, consumed read-only by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Whether fill-from-tap and empty-to-sink are available on this level.
    pub has_sink_and_tap: bool,
    pub containers: Vec<ContainerSpec>,
    pub targets: Vec<Target>,
}

impl LevelDefinition {
    pub fn index_of(&self, container_id: &str) -> Option<usize> {
        self.containers.iter().position(|c| c.id == container_id)
    }

    pub fn spec(&self, container_id: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    /// Checks the level for configuration errors. Malformed definitions are
    /// rejected here, at load time; the engine itself never validates ids
    /// beyond treating unknown ones as no-ops.
    pub fn validate(&self) -> Result<(), LevelError> {
        for (i, container) in self.containers.iter().enumerate() {
            if container.id == ANY_CONTAINER {
                return Err(LevelError::ReservedContainerId {
                    id: container.id.clone(),
                });
            }
            if container.capacity == 0 {
                return Err(LevelError::ZeroCapacity {
                    id: container.id.clone(),
                });
            }
            if container.initial_amount > container.capacity {
                return Err(LevelError::InitialOverflow {
                    id: container.id.clone(),
                    initial: container.initial_amount,
                    capacity: container.capacity,
                });
            }
            if self.containers[..i].iter().any(|c| c.id == container.id) {
                return Err(LevelError::DuplicateContainer {
                    id: container.id.clone(),
                });
            }
        }
        for target in &self.targets {
            if let Target::Container { id, .. } = target
                && self.index_of(id).is_none()
            {
                return Err(LevelError::UnknownTargetContainer { id: id.clone() });
            }
        }
        Ok(())
    }
}

/// Configuration/data errors surfaced when a level is loaded or a catalog is
/// parsed. Runtime engine operations never produce these.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("container id {id:?} appears more than once")]
    DuplicateContainer { id: String },
    #[error("container {id:?} has zero capacity")]
    ZeroCapacity { id: String },
    #[error("container {id:?} starts with {initial} ml but holds only {capacity} ml")]
    InitialOverflow {
        id: String,
        initial: u32,
        capacity: u32,
    },
    #[error("target references unknown container {id:?}")]
    UnknownTargetContainer { id: String },
    #[error("container id {id:?} is reserved for the wildcard target")]
    ReservedContainerId { id: String },
    #[error("level catalog holds no levels")]
    EmptyCatalog,
    #[error("malformed level catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single solver move, indices into the level's container sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    Pour { from: usize, to: usize },
    Fill { to: usize },
    Empty { from: usize },
}

/// Parses an externally authored catalog (a JSON array of level
/// definitions) and validates every level in it.
pub fn catalog_from_json(json: &str) -> Result<Vec<LevelDefinition>, LevelError> {
    let levels: Vec<LevelDefinition> = serde_json::from_str(json)?;
    for level in &levels {
        level.validate()?;
    }
    Ok(levels)
}

/// The built-in three-level catalog.
pub fn builtin_levels() -> Vec<LevelDefinition> {
    vec![
        LevelDefinition {
            id: 1,
            title: "First Steps".to_string(),
            description: "Measure out exactly 400 ml in any container.".to_string(),
            has_sink_and_tap: false,
            containers: vec![
                ContainerSpec {
                    id: "c1".to_string(),
                    name: "Large jug".to_string(),
                    capacity: 500,
                    initial_amount: 500,
                    sprite_url: None,
                },
                ContainerSpec {
                    id: "c2".to_string(),
                    name: "Small jug".to_string(),
                    capacity: 300,
                    initial_amount: 0,
                    sprite_url: None,
                },
            ],
            targets: vec![Target::Any { amount: 400 }],
        },
        LevelDefinition {
            id: 2,
            title: "Tap and Sink".to_string(),
            description: "Use the tap to measure 400 ml with a 500 ml and a 300 ml container."
                .to_string(),
            has_sink_and_tap: true,
            containers: vec![
                ContainerSpec {
                    id: "c1".to_string(),
                    name: "Jar".to_string(),
                    capacity: 500,
                    initial_amount: 0,
                    sprite_url: None,
                },
                ContainerSpec {
                    id: "c2".to_string(),
                    name: "Glass".to_string(),
                    capacity: 300,
                    initial_amount: 0,
                    sprite_url: None,
                },
            ],
            targets: vec![Target::Any { amount: 400 }],
        },
        LevelDefinition {
            id: 3,
            title: "Fine Balance".to_string(),
            description:
                "Split 800 ml evenly (400 ml each) between the large and medium containers."
                    .to_string(),
            has_sink_and_tap: false,
            containers: vec![
                ContainerSpec {
                    id: "c1".to_string(),
                    name: "Churn".to_string(),
                    capacity: 800,
                    initial_amount: 800,
                    sprite_url: None,
                },
                ContainerSpec {
                    id: "c2".to_string(),
                    name: "Jug".to_string(),
                    capacity: 500,
                    initial_amount: 0,
                    sprite_url: None,
                },
                ContainerSpec {
                    id: "c3".to_string(),
                    name: "Mug".to_string(),
                    capacity: 300,
                    initial_amount: 0,
                    sprite_url: None,
                },
            ],
            targets: vec![
                Target::Container {
                    id: "c1".to_string(),
                    amount: 400,
                },
                Target::Container {
                    id: "c2".to_string(),
                    amount: 400,
                },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_jugs() -> LevelDefinition {
        builtin_levels().remove(0)
    }

    #[test]
    fn builtin_catalog_is_valid() {
        for level in builtin_levels() {
            level.validate().unwrap();
        }
    }

    #[test]
    fn duplicate_container_id_rejected() {
        let mut level = two_jugs();
        level.containers[1].id = "c1".to_string();
        assert!(matches!(
            level.validate(),
            Err(LevelError::DuplicateContainer { id }) if id == "c1"
        ));
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut level = two_jugs();
        level.containers[0].capacity = 0;
        assert!(matches!(
            level.validate(),
            Err(LevelError::ZeroCapacity { .. })
        ));
    }

    #[test]
    fn overfull_initial_amount_rejected() {
        let mut level = two_jugs();
        level.containers[1].initial_amount = 301;
        assert!(matches!(
            level.validate(),
            Err(LevelError::InitialOverflow {
                initial: 301,
                capacity: 300,
                ..
            })
        ));
    }

    #[test]
    fn target_must_reference_known_container() {
        let mut level = two_jugs();
        level.targets = vec![Target::Container {
            id: "c9".to_string(),
            amount: 100,
        }];
        assert!(matches!(
            level.validate(),
            Err(LevelError::UnknownTargetContainer { id }) if id == "c9"
        ));
    }

    #[test]
    fn any_is_a_reserved_id() {
        let mut level = two_jugs();
        level.containers[0].id = "ANY".to_string();
        assert!(matches!(
            level.validate(),
            Err(LevelError::ReservedContainerId { .. })
        ));
    }

    #[test]
    fn catalog_json_round_trip() {
        let json = serde_json::to_string(&builtin_levels()).unwrap();
        let parsed = catalog_from_json(&json).unwrap();
        assert_eq!(parsed, builtin_levels());
    }

    #[test]
    fn wildcard_target_parses_from_any_sentinel() {
        let json = r#"[{
            "id": 7,
            "title": "t",
            "hasSinkAndTap": true,
            "containers": [
                {"id": "a", "name": "A", "capacity": 100, "initialAmount": 50}
            ],
            "targets": [
                {"containerId": "ANY", "amount": 50},
                {"containerId": "a", "amount": 0}
            ]
        }]"#;
        let levels = catalog_from_json(json).unwrap();
        assert_eq!(levels[0].targets[0], Target::Any { amount: 50 });
        assert_eq!(
            levels[0].targets[1],
            Target::Container {
                id: "a".to_string(),
                amount: 0
            }
        );
    }

    #[test]
    fn malformed_catalog_is_a_parse_error() {
        assert!(matches!(
            catalog_from_json("not json"),
            Err(LevelError::Parse(_))
        ));
    }
}
