//! End-to-end protocol scenarios driven through the sized entry points.
//!
//! Each test checks final MOESI states, snooper membership, returned data,
//! and per-cache telemetry together.

#![allow(clippy::pedantic, clippy::nursery)]

use log as _;
use moesi_core::{
    AccessFault, CacheConfig, CacheId, CacheSystem, HitStats, MemoryStats, MoesiState,
    SystemConfig,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const A: CacheId = CacheId(0);
const B: CacheId = CacheId(1);
const C: CacheId = CacheId(2);

fn one_set_of_two_lines(caches: u8) -> CacheSystem {
    CacheSystem::new(&SystemConfig::uniform(caches, 2, 0)).expect("valid config")
}

fn counts(system: &CacheSystem, id: CacheId) -> (u64, u64) {
    let stats = system.stats(id).unwrap_or_default();
    (stats.accesses(), stats.hits())
}

#[test]
fn write_share_rewrite_scenario() {
    let mut system = one_set_of_two_lines(2);

    system.write_word(0x0, A, 0xDEAD_BEEF).expect("A writes");
    assert_eq!(system.holders(0x0), vec![(A, MoesiState::Modified)]);
    assert_eq!(system.snooper().holders(0x0), &[A]);

    assert_eq!(system.read_word(0x0, B), Ok(0xDEAD_BEEF));
    assert_eq!(system.snooper().holders(0x0), &[A, B]);
    assert_eq!(
        system.holders(0x0),
        vec![(A, MoesiState::Shared), (B, MoesiState::Shared)]
    );

    system.write_word(0x0, A, 0x1).expect("A rewrites");
    assert_eq!(system.holders(0x0), vec![(A, MoesiState::Modified)]);
    assert_eq!(system.snooper().holders(0x0), &[A]);

    assert_eq!(counts(&system, A), (2, 1));
    assert_eq!(counts(&system, B), (1, 0));
    assert_eq!(system.audit(), Ok(()));
}

#[test]
fn read_after_write_needs_no_memory_traffic() {
    let mut system = one_set_of_two_lines(2);
    system.write_half_word(0x32, B, 0xBEEF).expect("write");
    let traffic = system.memory().stats();
    assert_eq!(system.read_half_word(0x32, B), Ok(0xBEEF));
    assert_eq!(system.memory().stats(), traffic);
}

#[test]
fn exclusive_reader_becomes_shared_when_a_peer_reads() {
    let mut system = one_set_of_two_lines(3);
    system.memory_mut().load(0x100, &[0x11, 0x22, 0x33, 0x44]).expect("preload");

    assert_eq!(system.read_word(0x100, C), Ok(0x1122_3344));
    assert_eq!(system.holders(0x100), vec![(C, MoesiState::Exclusive)]);

    assert_eq!(system.read_byte(0x103, A), Ok(0x44));
    assert_eq!(
        system.holders(0x100),
        vec![(A, MoesiState::Shared), (C, MoesiState::Shared)]
    );
    assert_eq!(
        system.memory().stats(),
        MemoryStats {
            block_reads: 1,
            block_writes: 0
        }
    );
}

#[test]
fn modified_data_survives_capacity_eviction() {
    let mut system = one_set_of_two_lines(2);
    for (i, address) in [0x0_u32, 0x10, 0x20, 0x30].into_iter().enumerate() {
        system.write_word(address, A, i as u32 + 1).expect("write");
    }
    // 0x0 and 0x10 were written back when A's only set overflowed.
    assert_eq!(system.memory().stats().block_writes, 2);
    for (i, address) in [0x0_u32, 0x10, 0x20, 0x30].into_iter().enumerate() {
        assert_eq!(system.read_word(address, B), Ok(i as u32 + 1));
    }
    assert_eq!(system.audit(), Ok(()));
}

#[test]
fn victim_is_the_least_recently_used_line() {
    let mut system = one_set_of_two_lines(1);
    system.read_word(0x0, A).expect("fill");
    system.read_word(0x10, A).expect("fill");
    system.read_word(0x0, A).expect("hit refreshes 0x0");
    system.read_word(0x20, A).expect("evicts 0x10");
    assert_eq!(system.holders(0x0), vec![(A, MoesiState::Exclusive)]);
    assert!(system.holders(0x10).is_empty());
    assert_eq!(system.audit(), Ok(()));
}

#[test]
fn caches_with_different_shapes_stay_coherent() {
    let config = SystemConfig {
        address_bits: 12,
        block_size: 8,
        caches: vec![
            CacheConfig {
                id: CacheId(4),
                line_count: 8,
                index_bits: 2,
            },
            CacheConfig {
                id: CacheId(9),
                line_count: 2,
                index_bits: 0,
            },
        ],
    };
    let mut system = CacheSystem::new(&config).expect("valid config");
    system.write_double_word(0x88, CacheId(4), 0x0123_4567_89AB_CDEF).expect("write");
    assert_eq!(system.read_word(0x8C, CacheId(9)), Ok(0x89AB_CDEF));
    system.write_byte(0x88, CacheId(9), 0xFF).expect("write");
    assert_eq!(
        system.read_double_word(0x88, CacheId(4)),
        Ok(0xFF23_4567_89AB_CDEF)
    );
    assert_eq!(system.audit(), Ok(()));
}

#[rstest]
#[case::unknown_cache(0x0, CacheId(7), AccessFault::UnknownCache(CacheId(7)))]
#[case::past_memory(0xFFFE, A, AccessFault::InvalidAddress { address: 0xFFFE, size: 4 })]
#[case::misaligned(0x6, A, AccessFault::Misaligned { address: 0x6, width: 4 })]
fn faults_leave_the_system_untouched(
    #[case] address: u32,
    #[case] id: CacheId,
    #[case] expected: AccessFault,
) {
    let mut system = one_set_of_two_lines(2);
    system.write_word(0x0, A, 7).expect("seed");
    let before = system.clone();
    assert_eq!(system.write_word(address, id, 1), Err(expected));
    assert_eq!(system.read_word(address, id), Err(expected));
    assert_eq!(system, before);
}

#[test]
fn hit_rate_is_reported_per_cache_and_reset_together() {
    let mut system = one_set_of_two_lines(2);
    assert_eq!(system.stats(A).and_then(|stats| stats.hit_rate()), None);
    system.read_byte(0x0, A).expect("miss");
    system.read_byte(0x1, A).expect("hit");
    system.read_byte(0x2, A).expect("hit");
    system.read_byte(0x3, A).expect("hit");
    assert_eq!(system.stats(A).and_then(|stats| stats.hit_rate()), Some(0.75));

    system.reset_stats();
    assert_eq!(system.stats(A), Some(HitStats::default()));
    assert_eq!(system.memory().stats().total(), 0);
}
