//! Index name helpers.

use rustc_hash::{FxHashMap, FxHashSet};

/// Make a list of names unique while keeping the first occurrence of each
/// name unchanged.
///
/// Repeats are suffixed with `-1`, `-2`, ... in order of appearance. A
/// candidate that is already present in the list (or was handed out earlier)
/// is skipped and the counter advances, so `["a", "a", "a-1"]` becomes
/// `["a", "a-2", "a-1"]`.
///
/// Returns the number of names that were changed.
pub fn make_unique(names: &mut [String]) -> usize {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for name in names.iter() {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    if counts.values().all(|&n| n == 1) {
        return 0;
    }

    let mut taken: FxHashSet<String> = names.iter().cloned().collect();
    let mut next_suffix: FxHashMap<String, usize> = FxHashMap::default();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut renamed = 0;

    for name in names.iter_mut() {
        if seen.insert(name.clone()) {
            continue;
        }
        let suffix = next_suffix.entry(name.clone()).or_insert(1);
        let candidate = loop {
            let candidate = format!("{}-{}", name, suffix);
            *suffix += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(candidate.clone());
        *name = candidate;
        renamed += 1;
    }

    renamed
}

/// Names that appear more than once, in order of first repeat.
pub fn duplicated(names: &[String]) -> Vec<&str> {
    let mut seen = FxHashSet::default();
    let mut reported = FxHashSet::default();
    names
        .iter()
        .filter(|name| !seen.insert(name.as_str()) && reported.insert(name.as_str()))
        .map(|name| name.as_str())
        .collect()
}

/// Positional names `"0"`, `"1"`, ... used when a file carries no labels.
pub fn positional(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}
