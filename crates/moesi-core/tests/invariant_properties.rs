//! Property coverage for coherence invariants over random access sequences.

#![allow(clippy::pedantic, clippy::nursery)]

use std::collections::HashMap;

use log as _;
use moesi_core::{AccessWidth, CacheConfig, CacheId, CacheSystem, SystemConfig};
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

#[derive(Debug, Clone)]
enum Op {
    Read {
        id: u8,
        width: AccessWidth,
        slot: u32,
    },
    Write {
        id: u8,
        width: AccessWidth,
        slot: u32,
        value: u64,
    },
}

fn width() -> impl Strategy<Value = AccessWidth> {
    prop_oneof![
        Just(AccessWidth::Byte),
        Just(AccessWidth::HalfWord),
        Just(AccessWidth::Word),
        Just(AccessWidth::DoubleWord),
    ]
}

/// Slots index aligned positions inside a small address window so that
/// blocks collide in the caches' sets.
fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0_u8..4, width(), 0_u32..32).prop_map(|(id, width, slot)| Op::Read { id, width, slot }),
        (0_u8..4, width(), 0_u32..32, any::<u64>()).prop_map(|(id, width, slot, value)| Op::Write {
            id,
            width,
            slot,
            value
        }),
    ]
}

fn config(block_size: u32) -> SystemConfig {
    SystemConfig {
        address_bits: 10,
        block_size,
        caches: vec![
            CacheConfig {
                id: CacheId(0),
                line_count: 2,
                index_bits: 0,
            },
            CacheConfig {
                id: CacheId(1),
                line_count: 4,
                index_bits: 1,
            },
            CacheConfig {
                id: CacheId(2),
                line_count: 4,
                index_bits: 0,
            },
            CacheConfig {
                id: CacheId(3),
                line_count: 2,
                index_bits: 1,
            },
        ],
    }
}

fn mask(width: AccessWidth) -> u64 {
    match width {
        AccessWidth::DoubleWord => u64::MAX,
        other => (1 << (other.bytes() * 8)) - 1,
    }
}

/// Shadow byte store holding the last value written at every address.
fn shadow_read(shadow: &HashMap<u32, u8>, address: u32, width: AccessWidth) -> u64 {
    (address..address + width.bytes())
        .fold(0, |value, byte| (value << 8) | u64::from(*shadow.get(&byte).unwrap_or(&0)))
}

fn shadow_write(shadow: &mut HashMap<u32, u8>, address: u32, width: AccessWidth, value: u64) {
    let bytes = value.to_be_bytes();
    let start = 8 - width.bytes() as usize;
    for (i, byte) in bytes[start..].iter().enumerate() {
        shadow.insert(address + i as u32, *byte);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn invariants_hold_and_reads_see_the_latest_write(
        block_size in prop_oneof![Just(1_u32), Just(2), Just(4), Just(8)],
        ops in prop::collection::vec(op(), 1..64),
    ) {
        let mut system = CacheSystem::new(&config(block_size)).expect("valid config");
        let mut shadow = HashMap::new();
        for op in ops {
            match op {
                Op::Read { id, width, slot } => {
                    let address = slot * width.bytes();
                    let value = system.read_sized(address, CacheId(id), width);
                    prop_assert_eq!(value, Ok(shadow_read(&shadow, address, width)));
                }
                Op::Write { id, width, slot, value } => {
                    let address = slot * width.bytes();
                    let value = value & mask(width);
                    prop_assert_eq!(system.write_sized(address, CacheId(id), width, value), Ok(()));
                    shadow_write(&mut shadow, address, width, value);
                }
            }
            prop_assert_eq!(system.audit(), Ok(()));
        }
    }

    #[test]
    fn read_hit_is_idempotent(
        ops in prop::collection::vec(op(), 0..32),
        id in 0_u8..4,
        slot in 0_u32..64,
    ) {
        let mut system = CacheSystem::new(&config(4)).expect("valid config");
        for op in ops {
            match op {
                Op::Read { id, width, slot } => {
                    let _ = system.read_sized(slot * width.bytes(), CacheId(id), width);
                }
                Op::Write { id, width, slot, value } => {
                    let _ = system.write_sized(slot * width.bytes(), CacheId(id), width, value & mask(width));
                }
            }
        }
        let address = slot * 4;
        let id = CacheId(id);
        system.read_word(address, id).expect("in range");

        let holders = system.holders(address);
        let listed = system.snooper().holders(address).to_vec();
        let traffic = system.memory().stats();
        system.read_word(address, id).expect("in range");
        prop_assert_eq!(system.holders(address), holders);
        prop_assert_eq!(system.snooper().holders(address), listed.as_slice());
        prop_assert_eq!(system.memory().stats(), traffic);
    }

    #[test]
    fn read_after_write_is_served_locally(
        id in 0_u8..4,
        slot in 0_u32..128,
        value in any::<u32>(),
    ) {
        let mut system = CacheSystem::new(&config(4)).expect("valid config");
        let address = slot * 4;
        system.write_word(address, CacheId(id), value).expect("in range");
        let traffic = system.memory().stats();
        prop_assert_eq!(system.read_word(address, CacheId(id)), Ok(value));
        prop_assert_eq!(system.memory().stats(), traffic);
    }
}
