pub mod bjtwin;
pub mod blueprnt;
pub mod citycon;
pub mod flstory;
pub mod regions;
pub mod registry;
pub mod starfire;
pub mod supbtime;
pub mod wiping;

pub use bjtwin::BjtwinSystem;
pub use blueprnt::BlueprntSystem;
pub use citycon::CityconSystem;
pub use flstory::FlstorySystem;
pub use regions::{MachineError, RegionSpec, RomRegions};
pub use starfire::StarfireSystem;
pub use supbtime::SupbtimeSystem;
pub use wiping::WipingSystem;
