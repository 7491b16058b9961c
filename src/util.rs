use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// Splits `num_items` into `num_parts` contiguous ranges whose lengths differ by at
/// most one, the longer ranges coming first.
pub fn get_partition_range(num_parts: usize, part_id: usize, num_items: usize) -> Range<usize> {
    let min_partition_size = num_items / num_parts;
    let remainder = num_items % num_parts;

    if part_id < remainder {
        let partition_size = min_partition_size + 1;
        let start = partition_size * part_id;
        let end = start + partition_size;
        Range { start, end }
    } else {
        let start =
            (min_partition_size + 1) * remainder + min_partition_size * (part_id - remainder);
        let end = start + min_partition_size;
        Range { start, end }
    }
}

pub fn calculate_hash<T: Hash>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Seed for one trial, independent of how trials are spread across threads.
pub fn trial_seed(base_seed: u64, trial_idx: usize) -> u64 {
    calculate_hash(&(base_seed, trial_idx))
}
