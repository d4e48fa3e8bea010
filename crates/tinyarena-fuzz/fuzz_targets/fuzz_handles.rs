#![no_main]
use libfuzzer_sys::fuzz_target;
use tinyarena_core::{Arena, ArenaConfig, BlockPtr};

// Arbitrary handles must be rejected without touching the list.
fuzz_target!(|data: &[u8]| {
    let mut region = vec![0u8; 2048];
    let mut arena = Arena::with_config(&mut region, ArenaConfig::default().with_lifecycle_log(false));
    let mut live = Vec::new();
    for size in [8, 0, 40, 16, 120] {
        live.push(arena.allocate(size).unwrap());
    }
    arena.release(Some(live.remove(2))).unwrap();
    let before = arena.blocks().unwrap();

    for chunk in data.chunks_exact(2) {
        let raw = u16::from_le_bytes([chunk[0], chunk[1]]) as usize;
        let Some(ptr) = BlockPtr::from_offset(raw) else {
            continue;
        };
        if live.contains(&ptr) {
            continue;
        }
        assert!(arena.release(Some(ptr)).is_err(), "accepted foreign handle {ptr}");
        assert!(arena.resize(Some(ptr), 8).is_err());
        assert_eq!(arena.blocks().unwrap(), before);
    }
    arena.verify().unwrap();
});
