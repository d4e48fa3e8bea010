#![no_main]
use libfuzzer_sys::fuzz_target;
use tinyarena_core::{Arena, ArenaConfig, ArenaError, BlockPtr};

const SLOTS: usize = 16;

// Each 4-byte chunk is one operation: opcode, slot, little-endian size.
fuzz_target!(|data: &[u8]| {
    let mut region = vec![0u8; 4096];
    let mut arena = Arena::with_config(&mut region, ArenaConfig::default().with_lifecycle_log(false));
    let mut slots: [Option<(BlockPtr, usize, u8)>; SLOTS] = [None; SLOTS];

    for (step, chunk) in data.chunks_exact(4).enumerate() {
        let slot = chunk[1] as usize % SLOTS;
        let size = u16::from_le_bytes([chunk[2], chunk[3]]) as usize % 1024;
        let fill = step as u8 | 1;

        match chunk[0] % 4 {
            0 => {
                if let Some((ptr, _, _)) = slots[slot].take() {
                    arena.release(Some(ptr)).unwrap();
                }
                match arena.allocate(size) {
                    Ok(ptr) => {
                        arena.data_mut(ptr).unwrap()[..size].fill(fill);
                        slots[slot] = Some((ptr, size, fill));
                    }
                    Err(ArenaError::OutOfMemory { .. }) => {}
                    Err(err) => panic!("allocate({size}): {err}"),
                }
            }
            1 => {
                let ptr = slots[slot].take().map(|(ptr, _, _)| ptr);
                arena.release(ptr).unwrap();
            }
            2 => {
                let Some((ptr, len, byte)) = slots[slot] else {
                    continue;
                };
                match arena.resize(Some(ptr), size) {
                    Ok(moved) => {
                        let kept = len.min(size);
                        assert!(arena.data(moved).unwrap()[..kept].iter().all(|&b| b == byte));
                        arena.data_mut(moved).unwrap()[..size].fill(fill);
                        slots[slot] = Some((moved, size, fill));
                    }
                    Err(ArenaError::OutOfMemory { .. }) => {
                        assert!(arena.data(ptr).unwrap()[..len].iter().all(|&b| b == byte));
                    }
                    Err(err) => panic!("resize({size}): {err}"),
                }
            }
            _ => {
                let stats = arena.stats().unwrap();
                assert!(stats.used_size <= stats.total_size);
                assert!(stats.allocated_size + stats.fragmentation_bytes <= stats.used_size);
                assert_eq!(stats.allocated_blocks, slots.iter().flatten().count());
            }
        }
        arena.verify().unwrap();
    }

    for (ptr, _, _) in slots.into_iter().flatten() {
        arena.release(Some(ptr)).unwrap();
    }
    assert!(arena.is_empty());
});
