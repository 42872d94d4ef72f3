// Licensed under the Apache-2.0 license

use booter::Radix3;
use booter_drivers::{Aperture, Dma, PhysAddr};
use booter_emu::{EmuDma, EmuTimer, Radix3Builder, SysMem};
use booter_error::BooterError;
use proptest::prelude::*;

const APERTURE: Aperture = Aperture::new(0x1000, 1 << 40);
const PAGES: usize = 1100;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A broken leaf pointer only affects the pages behind that leaf.
    #[test]
    fn test_bad_leaf_pointer_is_local(
        leaf in 0usize..3,
        bad in prop_oneof![Just(0u64), Just(0x20_0008u64), Just(1u64 << 41)],
        page in 0usize..PAGES,
        within in 0u64..4096,
    ) {
        let data = vec![0x11u8; PAGES * 4096];
        let mut sysmem = SysMem::default();
        let table = Radix3Builder::new(0x10_0000).build(&mut sysmem, &data);
        prop_assert_eq!(table.leaves.len(), 3);
        sysmem.write(table.mids[0] + 8 * leaf as u64, &bad.to_le_bytes());

        let mut engine = EmuDma::new(sysmem, 0x1000);
        let timer = EmuTimer::default();
        let mut dma = Dma::new(&mut engine, &timer);
        let radix3 = Radix3::new(PhysAddr(table.root), APERTURE).unwrap();

        let result = radix3.resolve(&mut dma, page as u64 * 4096 + within);
        if page / 512 == leaf {
            prop_assert_eq!(result, Err(BooterError::RADIX3_BAD_TABLE));
        } else {
            prop_assert_eq!(result, Ok(PhysAddr(table.pages[page] + within)));
        }
    }
}
