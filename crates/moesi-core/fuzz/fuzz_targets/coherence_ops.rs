#![no_main]

use libfuzzer_sys::fuzz_target;
use moesi_core::{AccessWidth, CacheId, CacheSystem, SystemConfig};

fuzz_target!(|data: &[u8]| {
    let Some((&shape, ops)) = data.split_first() else {
        return;
    };

    let mut config = SystemConfig::uniform(1 + shape % 4, 4, (shape >> 2) % 2);
    config.address_bits = 10;
    config.block_size = 1 << ((shape >> 3) % 4);
    let Ok(mut system) = CacheSystem::new(&config) else {
        return;
    };

    for op in ops.chunks_exact(4) {
        let id = CacheId(op[0] % 5);
        let width = match (op[0] >> 3) % 4 {
            0 => AccessWidth::Byte,
            1 => AccessWidth::HalfWord,
            2 => AccessWidth::Word,
            _ => AccessWidth::DoubleWord,
        };
        let address = u32::from(u16::from_be_bytes([op[1], op[2]])) % 1100;
        let result = if op[0] & 0x80 == 0 {
            system.read_sized(address, id, width).map(|_| ())
        } else {
            system.write_sized(address, id, width, u64::from(op[3]) * 0x0101_0101_0101_0101)
        };
        let _ = result;
        if let Err(violation) = system.audit() {
            panic!("{violation}");
        }
    }
});
