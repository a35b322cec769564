use marquee_core::core::address_map::Mapped;
use marquee_core::core::{AddressMap, AddressMapError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom,
    Ram,
    Io,
}

fn map() -> AddressMap<Region> {
    AddressMap::new(
        0xFFFF,
        [
            (0x8000..=0x87FF, Region::Ram),
            (0x0000..=0x3FFF, Region::Rom),
            (0xC000..=0xC000, Region::Io),
        ],
    )
    .unwrap()
}

#[test]
fn test_resolve_returns_offset_within_range() {
    let m = map();
    assert_eq!(
        m.resolve(0x8010),
        Some(Mapped {
            handler: Region::Ram,
            offset: 0x10
        })
    );
    assert_eq!(m.resolve(0x0000).map(|r| r.handler), Some(Region::Rom));
    assert_eq!(m.resolve(0xC000).map(|r| r.offset), Some(0));
}

#[test]
fn test_unmapped_space() {
    let m = map();
    assert_eq!(m.resolve(0x4000), None);
    assert_eq!(m.resolve(0x8800), None);
    assert_eq!(m.resolve(0xC001), None);
}

#[test]
fn test_address_mask_applies_before_lookup() {
    let m = map();
    assert_eq!(m.resolve(0x1_8010).map(|r| r.offset), Some(0x10));
}

#[test]
fn test_overlap_rejected() {
    let err = AddressMap::new(0xFFFF, [(0x0000..=0x0FFF, 1u8), (0x0800..=0x17FF, 2u8)]).unwrap_err();
    assert_eq!(
        err,
        AddressMapError::Overlap {
            first: (0x0000, 0x0FFF),
            second: (0x0800, 0x17FF)
        }
    );
}
