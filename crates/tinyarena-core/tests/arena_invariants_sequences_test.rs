use tinyarena_core::{Arena, ArenaConfig, ArenaError, BlockInfo, BlockPtr, HEADER_LEN, WORD_SIZE};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

#[derive(Clone, Copy, Debug)]
struct Live {
    ptr: BlockPtr,
    requested: usize,
    fill: u8,
}

fn quiet() -> ArenaConfig {
    ArenaConfig::default().with_lifecycle_log(false)
}

fn fill_block(arena: &mut Arena<'_>, live: Live) {
    arena.data_mut(live.ptr).unwrap().fill(live.fill);
}

/// Compare the arena against the shadow slots and check every structural
/// property the list must keep between operations.
fn check_shadow(arena: &Arena<'_>, slots: &[Option<Live>]) {
    arena.verify().unwrap();
    let blocks = arena.blocks().unwrap();
    let stats = arena.stats().unwrap();

    let mut expected: Vec<BlockPtr> = slots.iter().flatten().map(|live| live.ptr).collect();
    expected.sort();
    let listed: Vec<BlockPtr> = blocks.iter().map(|block| block.ptr).collect();
    assert_eq!(listed, expected, "block list diverged from shadow");

    for pair in blocks.windows(2) {
        assert!(pair[0].header_offset < pair[1].header_offset);
        assert_eq!(pair[0].end() + pair[0].gap_after, pair[1].header_offset);
    }
    if let Some(last) = blocks.last() {
        assert_eq!(last.end() + last.gap_after, stats.total_size);
    }

    assert_eq!(stats.allocated_blocks, blocks.len());
    assert_eq!(arena.live_blocks(), blocks.len());
    assert_eq!(
        stats.allocated_size,
        blocks.iter().map(|b| b.size + HEADER_LEN).sum::<usize>()
    );
    assert_eq!(stats.used_size, blocks.last().map_or(0, BlockInfo::end));
    assert_eq!(
        stats.fragmentation_bytes,
        blocks.iter().rev().skip(1).map(|b| b.gap_after).sum::<usize>()
    );

    for live in slots.iter().flatten() {
        let data = arena.data(live.ptr).unwrap();
        assert_eq!(data.len(), live.requested.next_multiple_of(WORD_SIZE));
        assert!(
            data[..live.requested].iter().all(|&byte| byte == live.fill),
            "contents of {} were disturbed",
            live.ptr
        );
    }
}

#[test]
fn deterministic_sequences_hold_list_invariants() {
    const SEEDS: [u64; 4] = [1, 2, 3, 0x9E37_79B9_7F4A_7C15];
    const STEPS: usize = 1_500;
    const SLOTS: usize = 24;
    const REGION: usize = 2048;

    for seed in SEEDS {
        let mut region = vec![0u8; REGION];
        let mut arena = Arena::with_config(&mut region, quiet());
        let mut rng = XorShift64::new(seed);
        let mut slots: [Option<Live>; SLOTS] = [None; SLOTS];
        let mut stale: Vec<BlockPtr> = Vec::new();

        for step in 0..STEPS {
            let index = rng.gen_range_usize(0, SLOTS - 1);
            let roll = rng.next_u64() % 10;
            let fill = (step % 251) as u8 + 1;

            match slots[index] {
                None if roll < 7 => {
                    let size = rng.gen_range_usize(0, 96);
                    let before = arena.blocks().unwrap();
                    match arena.allocate(size) {
                        Ok(ptr) => {
                            let live = Live {
                                ptr,
                                requested: size,
                                fill,
                            };
                            fill_block(&mut arena, live);
                            slots[index] = Some(live);
                        }
                        Err(ArenaError::OutOfMemory { .. }) => {
                            assert_eq!(arena.blocks().unwrap(), before, "seed={seed} step={step}");
                        }
                        Err(other) => panic!("seed={seed} step={step}: unexpected {other}"),
                    }
                }
                None => {
                    if stale.is_empty() {
                        continue;
                    }
                    let ptr = stale[rng.gen_range_usize(0, stale.len() - 1)];
                    if slots.iter().flatten().any(|live| live.ptr == ptr) {
                        continue;
                    }
                    let before = arena.blocks().unwrap();
                    let err = arena.release(Some(ptr)).unwrap_err();
                    assert!(
                        matches!(
                            err,
                            ArenaError::NotLive { .. }
                                | ArenaError::InvalidPointer { .. }
                                | ArenaError::Corruption { .. }
                        ),
                        "seed={seed} step={step}: stale release gave {err}"
                    );
                    assert_eq!(arena.blocks().unwrap(), before);
                }
                Some(live) if roll < 5 => {
                    arena.release(Some(live.ptr)).unwrap();
                    stale.push(live.ptr);
                    slots[index] = None;
                }
                Some(live) => {
                    let new_size = rng.gen_range_usize(0, 160);
                    let before = arena.blocks().unwrap();
                    match arena.resize(Some(live.ptr), new_size) {
                        Ok(ptr) => {
                            let kept = live.requested.min(new_size);
                            assert!(
                                arena.data(ptr).unwrap()[..kept]
                                    .iter()
                                    .all(|&byte| byte == live.fill),
                                "seed={seed} step={step}: resize lost data"
                            );
                            if new_size.next_multiple_of(WORD_SIZE)
                                <= live.requested.next_multiple_of(WORD_SIZE)
                            {
                                assert_eq!(ptr, live.ptr, "shrink moved the block");
                            }
                            if ptr != live.ptr {
                                stale.push(live.ptr);
                            }
                            let moved = Live {
                                ptr,
                                requested: new_size,
                                fill,
                            };
                            fill_block(&mut arena, moved);
                            slots[index] = Some(moved);
                        }
                        Err(ArenaError::OutOfMemory { .. }) => {
                            assert_eq!(arena.blocks().unwrap(), before, "seed={seed} step={step}");
                        }
                        Err(other) => panic!("seed={seed} step={step}: unexpected {other}"),
                    }
                }
            }

            check_shadow(&arena, &slots);
        }

        for live in slots.iter_mut().filter_map(Option::take) {
            arena.release(Some(live.ptr)).unwrap();
        }
        assert!(arena.is_empty());
        assert_eq!(arena.stats().unwrap().used_size, 0);
    }
}

#[test]
fn fill_to_exhaustion_then_drain_in_shuffled_order() {
    const BLOCK: usize = 24;
    let mut region = vec![0u8; 4096];
    let mut arena = Arena::with_config(&mut region, quiet());
    let mut rng = XorShift64::new(42);

    let mut ptrs = Vec::new();
    while let Ok(ptr) = arena.allocate(BLOCK) {
        ptrs.push(ptr);
    }
    let footprint = HEADER_LEN + BLOCK.next_multiple_of(WORD_SIZE);
    assert_eq!(ptrs.len(), 4096 / footprint);
    assert!(ptrs.windows(2).all(|w| w[1].offset() - w[0].offset() == footprint));

    for i in (1..ptrs.len()).rev() {
        ptrs.swap(i, rng.gen_range_usize(0, i));
    }
    let mut remaining = ptrs.len();
    for ptr in ptrs {
        arena.release(Some(ptr)).unwrap();
        remaining -= 1;
        let stats = arena.stats().unwrap();
        assert_eq!(stats.allocated_blocks, remaining);
        assert_eq!(stats.allocated_size, remaining * footprint);
    }
    assert_eq!(arena.stats().unwrap().used_size, 0);
}

#[test]
fn zero_sized_requests_never_alias() {
    let mut region = vec![0u8; 1024];
    let mut arena = Arena::with_config(&mut region, quiet());
    let mut seen = Vec::new();
    while let Ok(ptr) = arena.allocate(0) {
        assert!(!seen.contains(&ptr));
        seen.push(ptr);
    }
    assert_eq!(seen.len(), 1024 / HEADER_LEN);
}
