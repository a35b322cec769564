pub mod address_map;
pub mod bus;
pub mod machine;

pub use address_map::{AddressMap, AddressMapError};
pub use bus::{Bus, BusMaster, combine_word};
pub use machine::Machine;
