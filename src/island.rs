/// contiguous slice of the population owned by one island, both ends inclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IslandRange {
    pub start: usize,
    pub end: usize,
}

impl IslandRange {
    /// `[0, n-1]`. callers guarantee `n >= 1`.
    pub fn whole(n: usize) -> Self {
        Self { start: 0, end: n.saturating_sub(1) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// never true for a range built by [`partition`]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    /// half-open form for slicing
    #[inline]
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end + 1
    }
}

/// split `population_size` slots into `island_count` contiguous islands.
/// every island gets `population_size / island_count`, the last one also takes
/// the remainder. returns an empty list when the split is impossible.
pub fn partition(population_size: usize, island_count: usize) -> Vec<IslandRange> {
    if island_count == 0 || population_size < island_count {
        return Vec::new();
    }
    let base = population_size / island_count;
    (0..island_count)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == island_count { population_size - 1 } else { start + base - 1 };
            IslandRange { start, end }
        })
        .collect()
}
