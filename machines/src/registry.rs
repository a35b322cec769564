//! Board registry for front-end discovery.
//!
//! Each board self-registers via [`inventory::submit!`] with a
//! [`MachineEntry`] holding its CLI name, the regions it reads and a factory
//! function. The front-end finds boards at runtime without a central list.

use marquee_core::core::machine::Machine;

use crate::regions::{MachineError, RegionSpec, RomRegions};

pub type MachineFactory = fn(&RomRegions) -> Result<Box<dyn Machine>, MachineError>;

/// Describes a front-end-capable board.
pub struct MachineEntry {
    /// CLI name used to select this board (e.g., "blueprnt").
    pub name: &'static str,
    /// Human-readable title.
    pub description: &'static str,
    /// Regions the factory reads.
    pub regions: &'static [RegionSpec],
    pub create: MachineFactory,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        regions: &'static [RegionSpec],
        create: MachineFactory,
    ) -> Self {
        Self {
            name,
            description,
            regions,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered boards, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a board by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_board_registers() {
        let names: Vec<_> = all().iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                "bjtwin", "blueprnt", "citycon", "flstory", "starfire", "supbtime", "wiping"
            ]
        );
    }

    #[test]
    fn find_unknown_board() {
        assert!(find("pacman").is_none());
        assert!(find("wiping").is_some());
    }

    #[test]
    fn every_board_boots_from_blank_regions() {
        use marquee_core::video::Bitmap;

        for entry in all() {
            let regions = RomRegions::from_entries(
                entry
                    .regions
                    .iter()
                    .map(|spec| (spec.name.to_string(), vec![0u8; spec.size])),
            );
            let mut machine = (entry.create)(&regions).unwrap();
            let (w, h) = machine.display_size();
            let mut bitmap = Bitmap::new(w as usize, h as usize);
            machine.refresh(&mut bitmap, true);
            let visible = machine.visible_area();
            assert!(visible.max_x < w as i32, "{}", entry.name);
            assert!(visible.max_y < h as i32, "{}", entry.name);
        }
    }
}
