use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use vesper_gc::heap::free_chunk;
use vesper_gc::{
    CardTableRemSet, FreeSpaceManager, HeapConfig, HeapRegion, RetireKind, LOG2_CARD_SIZE,
    MIN_FREE_CHUNK_BYTES,
};

// Deterministic generator so failures replay exactly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() >> 33) as usize % n
    }
}

// A space driven the way a VM drives it: the manager owns dead memory,
// the harness plays mutator and sweeper, and the remembered set listens
// to every boundary change. `live` and `garbage` shadow the cells the
// manager knows nothing about.
struct Heap {
    space: FreeSpaceManager<CardTableRemSet>,
    live: BTreeMap<usize, usize>,
    garbage: BTreeMap<usize, usize>,
}

impl Heap {
    fn new(size: usize) -> Self {
        let region = HeapRegion::new(size).expect("Failed to allocate region");
        let rset = CardTableRemSet::new(region.start(), region.size());
        let config = HeapConfig {
            region_size: size,
            min_reclaimable: 32,
            verify_heap: true,
        };
        let mut space =
            FreeSpaceManager::with_config(region, rset, &config).expect("invalid config");

        let start = space.region().start();
        space.release_dead(start, size);

        Self {
            space,
            live: BTreeMap::new(),
            garbage: BTreeMap::new(),
        }
    }

    fn start(&self) -> usize {
        self.space.region().start()
    }

    fn end(&self) -> usize {
        self.space.region().end()
    }

    // Allocate and format a cell, returning its address. The granted size
    // can exceed the request when an unformattable sliver is absorbed.
    fn alloc_cell(&mut self, size: usize) -> Option<usize> {
        let before = self.space.stats().live_bytes.load(Ordering::Relaxed);
        let ptr = self.space.allocate(size)?;
        let granted = (self.space.stats().live_bytes.load(Ordering::Relaxed) - before) as usize;
        let addr = ptr.as_ptr() as usize;

        // A real allocator writes the object header here; zeroing the
        // first word is enough to kill any stale dead-unit tag.
        unsafe { *(addr as *mut usize) = 0 };
        self.live.insert(addr, granted);
        Some(addr)
    }

    // Drop a cell from the root set; its memory stays untouched until the
    // next sweep reclaims it.
    fn drop_cell(&mut self, pick: usize) {
        if self.live.is_empty() {
            return;
        }
        let addr = *self.live.keys().nth(pick % self.live.len()).unwrap();
        let size = self.live.remove(&addr).unwrap();
        self.garbage.insert(addr, size);
    }

    // Mark-sweep: rebuild the free list from the shadow live set.
    fn sweep(&mut self) {
        self.space.begin_sweep();
        self.garbage.clear();

        let mut runs = Vec::new();
        let mut cursor = self.start();
        for (&addr, &size) in &self.live {
            if addr > cursor {
                runs.push((cursor, addr - cursor));
            }
            cursor = addr + size;
        }
        if cursor < self.end() {
            runs.push((cursor, self.end() - cursor));
        }

        for (start, len) in runs {
            if len >= MIN_FREE_CHUNK_BYTES {
                self.space.release_dead(start, len);
            } else {
                // Too small to track; must already be a dark-matter pad.
                unsafe {
                    assert_eq!(free_chunk::dead_unit_size(start), Some(len));
                }
            }
        }
    }

    // Size of the unit starting at `addr`, from headers or the shadow.
    fn unit_size(&self, addr: usize) -> Option<usize> {
        if let Some(size) = unsafe { free_chunk::dead_unit_size(addr) } {
            return Some(size);
        }
        self.live
            .get(&addr)
            .or_else(|| self.garbage.get(&addr))
            .copied()
    }

    // Parse the whole region unit by unit; every byte must be covered.
    fn walk(&self) {
        let mut addr = self.start();
        while addr < self.end() {
            let size = self
                .unit_size(addr)
                .unwrap_or_else(|| panic!("walk stuck at offset {:#x}", addr - self.start()));
            assert!(size > 0 && addr + size <= self.end());
            addr += size;
        }
        assert_eq!(addr, self.end());
    }

    // Every card must resolve to a unit at or before its first word, from
    // which a forward parse reaches the card.
    fn check_card_resolution(&self) {
        let rset = self.space.listener();
        for index in 0..rset.first_objects().len() {
            let card_start = rset.cards().card_start(index);
            let mut addr = rset.first_objects().cell_start(index);
            assert!(
                addr >= self.start() && addr <= card_start,
                "card {} resolves outside its prefix",
                index
            );
            loop {
                let size = self
                    .unit_size(addr)
                    .unwrap_or_else(|| panic!("card {} resolved mid-unit", index));
                if addr + size > card_start {
                    break;
                }
                addr += size;
            }
        }
    }
}

#[test]
fn test_release_and_allocate_accounting() {
    let mut heap = Heap::new(16 * 1024);
    assert_eq!(
        heap.space.stats().free_bytes.load(Ordering::Relaxed),
        16 * 1024
    );

    let a = heap.alloc_cell(100).expect("alloc failed");
    let b = heap.alloc_cell(256).expect("alloc failed");
    assert_eq!(a, heap.start());
    assert_eq!(b, a + 104); // 100 rounds up to the next word

    let stats = heap.space.stats();
    assert_eq!(stats.live_bytes.load(Ordering::Relaxed), 104 + 256);
    assert_eq!(
        stats.free_bytes.load(Ordering::Relaxed),
        16 * 1024 - 104 - 256
    );
    assert_eq!(stats.tracked_bytes(), 16 * 1024);
    heap.walk();

    // Drop the first cell; the sweep returns its bytes to the free list
    // and restarts the occupancy tallies.
    heap.drop_cell(0);
    heap.sweep();
    assert_eq!(heap.space.stats().live_bytes.load(Ordering::Relaxed), 0);
    assert_eq!(
        heap.space.stats().free_bytes.load(Ordering::Relaxed),
        16 * 1024 - 256
    );
    heap.walk();

    // The reclaimed gap is allocatable again.
    let c = heap.alloc_cell(104).expect("alloc failed");
    assert_eq!(c, heap.start());
}

#[test]
fn test_random_traffic_stays_walkable() {
    let mut heap = Heap::new(64 * 1024);
    let mut rng = Lcg(0x5eed);

    for round in 0..400 {
        match rng.below(10) {
            0..=5 => {
                let size = 24 + 8 * rng.below(61);
                if heap.alloc_cell(size).is_none() {
                    heap.sweep();
                    let _ = heap.alloc_cell(size);
                }
            }
            6..=8 => {
                let pick = rng.below(64);
                heap.drop_cell(pick);
            }
            _ => {
                // A mutator barrier dirties the card it wrote into.
                let offset = rng.below(64 * 1024);
                heap.space.listener().dirty(heap.start() + offset);
            }
        }

        if round % 16 == 0 {
            heap.walk();
            assert!(heap.space.stats().tracked_bytes() <= 64 * 1024);
        }
    }

    heap.sweep();
    heap.walk();
    heap.check_card_resolution();
}

#[test]
fn test_refill_retire_cycle() {
    let mut heap = Heap::new(16 * 1024);

    let (ptr, got) = heap.space.refill(2048).expect("refill failed");
    let start = ptr.as_ptr() as usize;
    assert_eq!(start, heap.start());
    assert_eq!(got, 16 * 1024); // first fit hands over the whole chunk

    // Carve three cells off the front, allocator-style: format each and
    // cover it in the first-object table (refills leave that to us).
    let mut cursor = start;
    for size in [512usize, 264, 1024] {
        unsafe { *(cursor as *mut usize) = 0 };
        heap.space
            .listener()
            .first_objects()
            .set(cursor, cursor + size);
        heap.live.insert(cursor, size);
        cursor += size;
    }

    // Retire the unused tail in two pieces: a dark pad, then a chunk that
    // goes straight back on the free list.
    heap.space.retire(cursor, 16, RetireKind::Dead);
    cursor += 16;
    heap.space
        .retire(cursor, start + 16 * 1024 - cursor, RetireKind::Free);

    heap.walk();
    heap.check_card_resolution();

    let stats = heap.space.stats();
    assert_eq!(stats.live_bytes.load(Ordering::Relaxed), 512 + 264 + 1024);
    assert_eq!(stats.dark_bytes.load(Ordering::Relaxed), 16);
    assert_eq!(
        stats.free_bytes.load(Ordering::Relaxed),
        16 * 1024 - 512 - 264 - 1024 - 16
    );
    assert_eq!(stats.tracked_bytes(), 16 * 1024);

    // The retired tail feeds the next allocation.
    let next = heap.alloc_cell(4096).expect("alloc failed");
    assert_eq!(next, cursor);
}

#[test]
fn test_dirty_card_scan_finds_cells() {
    let mut heap = Heap::new(32 * 1024);
    let mut rng = Lcg(0xfeed_f00d);

    // Fill the region, then drop every other cell and sweep, leaving a
    // striped heap with survivors separated by free chunks.
    let mut cells = Vec::new();
    while let Some(addr) = heap.alloc_cell(24 + 8 * rng.below(40)) {
        cells.push(addr);
    }
    for (i, addr) in cells.iter().enumerate() {
        if i % 2 == 1 {
            let size = heap.live.remove(addr).unwrap();
            heap.garbage.insert(*addr, size);
        }
    }
    heap.sweep();
    heap.walk();

    // Mutator writes dirty the survivors' cards.
    let survivors: Vec<usize> = heap.live.keys().copied().collect();
    assert!(!survivors.is_empty());
    for i in 0..survivors.len().min(20) {
        heap.space
            .listener()
            .dirty(survivors[(i * 7) % survivors.len()]);
    }

    // Scan dirty cards the way a minor collection would: resolve the
    // card's first cell, parse forward to the card, then across it.
    let rset = heap.space.listener();
    let mut scanned = 0;
    rset.for_each_dirty_card(|card_start, card_end| {
        let index = (card_start - heap.start()) >> LOG2_CARD_SIZE;
        let mut addr = rset.first_objects().cell_start(index);
        loop {
            let size = heap.unit_size(addr).expect("scan landed mid-unit");
            if addr + size > card_start {
                break;
            }
            addr += size;
        }
        while addr < card_end {
            let size = heap.unit_size(addr).expect("scan lost its footing");
            if heap.live.contains_key(&addr) {
                scanned += 1;
            }
            addr += size;
        }
    });
    assert!(scanned > 0, "dirty cards covered no live cells");
}
