// Transport module — link stacks below the routing layer, consumers above it

pub mod abstraction;
pub mod lane;
pub mod packet;

pub use abstraction::{LinkError, LinkLayer, Protocol, UpperLayer};
pub use lane::Lane;
pub use packet::Packet;
