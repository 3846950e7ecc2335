pub mod bc;
pub mod channel;
pub mod conductances;
pub mod die;
pub mod fill;
pub mod floorplan;
pub mod layer;
pub mod material;
pub mod non_uniform;
pub mod stack;

pub use bc::TopBoundary;
pub use channel::{Channel, Coolant};
pub use conductances::Conductances;
pub use die::Die;
pub use floorplan::{Floorplan, FloorplanElement, IcElement, PowersQueue};
pub use layer::Layer;
pub use material::Material;
pub use non_uniform::{ConnectionConductances, NonUniformLayout};
pub use stack::{Stack, StackDescription, StackElement, StackElementKind, StackLayer};
