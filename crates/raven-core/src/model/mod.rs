// Canonical topology model.
//
// Core fields are typed; anything schema-flexible rides along in a
// flattened `extra` map so backend-specific keys survive a round trip.

pub mod link;
pub mod participant;
pub mod topology;

pub use link::{Endpoint, Link};
pub use participant::{Cpu, EffectiveCpu, Memory, Mount, Node, Participant, Role, Switch};
pub use topology::{EntityRef, Image, Topology};
