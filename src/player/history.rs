use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;

/// Bounded FIFO of recently played catalog indices.
#[derive(Debug, Clone)]
pub(crate) struct PlayHistory {
    entries: VecDeque<usize>,
    capacity: usize,
}

impl PlayHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, index: usize) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(index);
    }

    /// The newest `n` entries, most recent last.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = usize> + '_ {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().copied().skip(skip)
    }

    /// Forget `removed` and shift higher indices down by one.
    pub fn remove_index(&mut self, removed: usize) {
        self.entries.retain(|&i| i != removed);
        for i in self.entries.iter_mut() {
            if *i > removed {
                *i -= 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Most-recently-loaded paths. Only used to decide what to forget under
/// memory pressure; playback never depends on it.
#[derive(Debug, Clone)]
pub(crate) struct RecentPaths {
    paths: VecDeque<PathBuf>,
    capacity: usize,
}

impl RecentPaths {
    pub fn new(capacity: usize) -> Self {
        Self {
            paths: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Mark `path` as just loaded, returning whatever fell out of the cache.
    pub fn touch(&mut self, path: &Path) -> Vec<PathBuf> {
        self.paths.retain(|p| p != path);
        self.paths.push_back(path.to_path_buf());
        let mut evicted = Vec::new();
        while self.paths.len() > self.capacity {
            evicted.extend(self.paths.pop_front());
        }
        evicted
    }

    pub fn forget(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Choose the index to play after `cursor`.
///
/// Sequential order ignores `avoid`. With shuffle on, a uniform pick among
/// indices not in `avoid`; when that leaves nothing, any index other than
/// `cursor`.
pub(crate) fn pick_next_index<R: Rng + ?Sized>(
    cursor: usize,
    len: usize,
    shuffle: bool,
    avoid: &[usize],
    rng: &mut R,
) -> usize {
    if len == 0 {
        return 0;
    }
    if !shuffle {
        return (cursor + 1) % len;
    }

    let mut candidates: Vec<usize> = (0..len).filter(|i| !avoid.contains(i)).collect();
    if candidates.is_empty() {
        candidates = (0..len).filter(|&i| i != cursor).collect();
    }
    candidates.choose(rng).copied().unwrap_or(cursor)
}
