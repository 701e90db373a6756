//! Part behavior extensions.
//!
//! A part carries a list of extensions, each one variant of a closed set.
//! [`PartExtension::from_config`] is the single place that turns a catalog
//! entry into live state, and queries dispatch with a plain `match`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::control::ControllerId;
use super::orientation::{Direction, Orientation};
use super::resource::{Amount, ResourceId, ResourceRate, ResourceTag, Stack};
use crate::catalog::{ExtensionConfig, StoredItem};
use crate::error::PreconditionError;

/// A seat a controller can bind to. Vessels with at least one bound block
/// respond to input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlBlock {
    pub controller: Option<ControllerId>,
}

impl ControlBlock {
    /// Bind `controller` if the seat is free or already theirs.
    pub fn try_bind(&mut self, controller: ControllerId) -> bool {
        match self.controller {
            None => {
                self.controller = Some(controller);
                true
            }
            Some(current) => current == controller,
        }
    }

    pub fn unbind(&mut self) -> Option<ControllerId> {
        self.controller.take()
    }
}

/// Linear thruster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    pub thrust: f32,
    pub exhaust_length_multiplier: f32,
    pub thrust_point: Vec2,
    pub relative_direction: Direction,
    pub consumption: Vec<ResourceRate>,
}

impl Engine {
    /// Direction the engine pushes the vessel for a part in `orientation`.
    /// A mirrored part swaps sideways-facing nozzles.
    pub fn direction(&self, orientation: Orientation) -> Direction {
        let relative = if orientation.flip && self.relative_direction.is_horizontal() {
            self.relative_direction.opposite()
        } else {
            self.relative_direction
        };
        orientation.direction.sum(relative)
    }

    pub fn force(&self, orientation: Orientation) -> Vec2 {
        self.direction(orientation).unit() * self.thrust
    }

    /// Cells behind the nozzle that must stay clear of the vessel's own parts.
    pub fn exhaust_length(&self) -> i32 {
        (self.thrust * self.exhaust_length_multiplier).ceil().max(0.0) as i32
    }
}

/// Reaction wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gyro {
    pub torque: f32,
    pub consumption: Vec<ResourceRate>,
}

impl Gyro {
    /// Signed torque, counter-clockwise positive.
    pub fn torque(&self, clockwise: bool) -> f32 {
        if clockwise {
            -self.torque
        } else {
            self.torque
        }
    }
}

/// Tank or cargo hold. Holds at most `stack` of a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage<A> {
    pub stack: A,
    pub content: Stack<A>,
}

impl<A: Amount> Storage<A> {
    fn from_config(stack: A, start: &Option<StoredItem<A>>) -> Result<Self, PreconditionError> {
        if stack <= A::ZERO {
            return Err(PreconditionError::NonPositive {
                what: "storage stack",
                value: stack.to_f32(),
            });
        }
        let content = match start {
            None => Stack::empty(),
            Some(item) => {
                if item.amount.is_negative() || item.amount > stack {
                    return Err(PreconditionError::StorageOverfilled {
                        amount: item.amount.to_f32(),
                        stack: stack.to_f32(),
                    });
                }
                Stack::new(item.resource.clone(), item.amount)
            }
        };
        Ok(Self { stack, content })
    }

    pub fn free_space(&self) -> A {
        self.stack - self.content.amount
    }

    /// Resource this storage is dedicated to, if any.
    pub fn resource(&self) -> Option<&ResourceId> {
        self.content.tag.id()
    }

    /// Replace the content, clamped to the stack. Returns the overflow.
    pub fn refill(&mut self, id: &ResourceId, amount: A) -> A {
        let kept = if amount > self.stack { self.stack } else { amount };
        self.content = if kept > A::ZERO {
            Stack::new(id.clone(), kept)
        } else {
            Stack {
                tag: ResourceTag::Typed(id.clone()),
                amount: A::ZERO,
            }
        };
        amount - kept
    }
}

/// Converts inputs into outputs every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub consumption: Vec<ResourceRate>,
    pub output: Vec<ResourceRate>,
}

/// Live behavior attached to a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartExtension {
    ControlBlock(ControlBlock),
    Engine(Engine),
    Gyro(Gyro),
    Storage(Storage<f32>),
    SolidStorage(Storage<i32>),
    Generator(Generator),
}

impl PartExtension {
    /// Build live state from a catalog entry.
    pub fn from_config(config: &ExtensionConfig) -> Result<Self, PreconditionError> {
        Ok(match config {
            ExtensionConfig::ControlBlock => PartExtension::ControlBlock(ControlBlock::default()),
            ExtensionConfig::Engine {
                thrust,
                exhaust_length_multiplier,
                thrust_point,
                relative_direction,
                consumption,
            } => {
                if *thrust <= 0.0 || thrust.is_nan() {
                    return Err(PreconditionError::NonPositive {
                        what: "engine thrust",
                        value: *thrust,
                    });
                }
                PartExtension::Engine(Engine {
                    thrust: *thrust,
                    exhaust_length_multiplier: exhaust_length_multiplier.max(0.0),
                    thrust_point: *thrust_point,
                    relative_direction: *relative_direction,
                    consumption: consumption.clone(),
                })
            }
            ExtensionConfig::Gyro {
                torque,
                consumption,
            } => {
                if *torque <= 0.0 || torque.is_nan() {
                    return Err(PreconditionError::NonPositive {
                        what: "gyro torque",
                        value: *torque,
                    });
                }
                PartExtension::Gyro(Gyro {
                    torque: *torque,
                    consumption: consumption.clone(),
                })
            }
            ExtensionConfig::Storage { stack, start } => {
                PartExtension::Storage(Storage::from_config(*stack, start)?)
            }
            ExtensionConfig::SolidStorage { stack, start } => {
                PartExtension::SolidStorage(Storage::from_config(*stack, start)?)
            }
            ExtensionConfig::Generator {
                consumption,
                output,
            } => PartExtension::Generator(Generator {
                consumption: consumption.clone(),
                output: output.clone(),
            }),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PartExtension::ControlBlock(_) => "control block",
            PartExtension::Engine(_) => "engine",
            PartExtension::Gyro(_) => "gyro",
            PartExtension::Storage(_) => "storage",
            PartExtension::SolidStorage(_) => "solid storage",
            PartExtension::Generator(_) => "generator",
        }
    }

    /// Resources this extension consumes while active.
    pub fn consumption(&self) -> &[ResourceRate] {
        match self {
            PartExtension::Engine(e) => &e.consumption,
            PartExtension::Gyro(g) => &g.consumption,
            PartExtension::Generator(g) => &g.consumption,
            _ => &[],
        }
    }

    /// Resources this extension produces while active.
    pub fn output(&self) -> &[ResourceRate] {
        match self {
            PartExtension::Generator(g) => &g.output,
            _ => &[],
        }
    }

    /// Resource ids this extension declares a relation to.
    pub fn related_to(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self
            .consumption()
            .iter()
            .chain(self.output())
            .map(|r| r.resource.clone())
            .collect();
        match self {
            PartExtension::Storage(s) => ids.extend(s.resource().cloned()),
            PartExtension::SolidStorage(s) => ids.extend(s.resource().cloned()),
            _ => {}
        }
        ids
    }

    pub fn is_motion(&self) -> bool {
        matches!(self, PartExtension::Engine(_) | PartExtension::Gyro(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_config() {
        let ext = PartExtension::from_config(&ExtensionConfig::Engine {
            thrust: 4.0,
            exhaust_length_multiplier: 0.5,
            thrust_point: Vec2::new(0.5, 0.0),
            relative_direction: Direction::Up,
            consumption: vec![ResourceRate::new("fuel", 1.0)],
        })
        .unwrap();
        let PartExtension::Engine(engine) = &ext else {
            panic!("expected engine");
        };
        assert_eq!(engine.exhaust_length(), 2);
        assert_eq!(engine.force(Orientation::RIGHT), Vec2::new(4.0, 0.0));
        assert_eq!(engine.direction(Orientation::DOWN_FLIP), Direction::Down);
        assert_eq!(ext.related_to(), vec![ResourceId::new("fuel")]);
        assert!(ext.is_motion());
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        let gyro = ExtensionConfig::Gyro {
            torque: -1.0,
            consumption: vec![],
        };
        assert!(PartExtension::from_config(&gyro).is_err());

        let tank = ExtensionConfig::Storage {
            stack: 0.0,
            start: None,
        };
        assert!(PartExtension::from_config(&tank).is_err());

        let overfull = ExtensionConfig::SolidStorage {
            stack: 5,
            start: Some(StoredItem {
                resource: "ore".into(),
                amount: 6,
            }),
        };
        assert!(matches!(
            PartExtension::from_config(&overfull),
            Err(PreconditionError::StorageOverfilled { .. })
        ));
    }

    #[test]
    fn test_control_block_binding() {
        let mut block = ControlBlock::default();
        assert!(block.try_bind(ControllerId(1)));
        assert!(block.try_bind(ControllerId(1)));
        assert!(!block.try_bind(ControllerId(2)));
        assert_eq!(block.unbind(), Some(ControllerId(1)));
        assert!(block.try_bind(ControllerId(2)));
    }

    #[test]
    fn test_storage_refill_clamps() {
        let mut tank = Storage::from_config(
            10.0,
            &Some(StoredItem {
                resource: "fuel".into(),
                amount: 2.0,
            }),
        )
        .unwrap();
        let overflow = tank.refill(&"fuel".into(), 12.0);
        assert_eq!(overflow, 2.0);
        assert_eq!(tank.content.amount, 10.0);
        assert_eq!(tank.free_space(), 0.0);
    }

    #[test]
    fn test_gyro_sign() {
        let gyro = Gyro {
            torque: 3.0,
            consumption: vec![],
        };
        assert_eq!(gyro.torque(false), 3.0);
        assert_eq!(gyro.torque(true), -3.0);
    }
}
