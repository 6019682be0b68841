//! Persistent world entities and their ref-counted live instances

pub mod instances;
pub mod lifecycle;
pub mod record;

pub use instances::{InstanceArena, InstanceHandle, LiveEntity};
pub use lifecycle::{EntityLifecycleTracker, LifecycleEvent};
pub use record::{EntityTransform, PersistentEntityRecord};
