//! Longest-matching-block similarity.
//!
//! The ratio is `2·M / T`, where `M` is the total size of the matching blocks
//! found by recursively splitting both strings around their longest common
//! substring, and `T` is the combined character count. This is an
//! order-sensitive alignment metric, not an edit distance: `ratio(a, b)` and
//! `ratio(b, a)` may differ because ties in the longest-match search resolve
//! toward the earliest position in `a`.

use std::collections::HashMap;

/// Sequences at least this long on the `b` side get the popular-element
/// heuristic.
const POPULAR_MIN_LEN: usize = 200;

/// A run of equal characters: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    /// Start offset in the first sequence (in chars).
    pub a: usize,
    /// Start offset in the second sequence (in chars).
    pub b: usize,
    /// Length of the run.
    pub size: usize,
}

/// Compares a fixed first sequence against one second sequence.
struct BlockMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// Positions of every non-popular char in `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl BlockMatcher {
    fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        let n = b.len();
        if n >= POPULAR_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Finds the longest block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among equally long blocks the one starting earliest in `a` wins, and
    /// among those the one starting earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);

        // j2len[j] = length of the longest match ending at a[i - 1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular chars never anchor a match but may still extend one.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        MatchingBlock {
            a: best_i,
            b: best_j,
            size: best_size,
        }
    }

    fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let mut stack = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = stack.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            if alo < block.a && blo < block.b {
                stack.push((alo, block.a, blo, block.b));
            }
            if block.a + block.size < ahi && block.b + block.size < bhi {
                stack.push((block.a + block.size, ahi, block.b + block.size, bhi));
            }
            blocks.push(block);
        }

        blocks.sort_by_key(|block| (block.a, block.b));

        let mut collapsed: Vec<MatchingBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            match collapsed.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => collapsed.push(block),
            }
        }
        collapsed
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self.matching_blocks().iter().map(|block| block.size).sum();
        2.0 * matched as f64 / total as f64
    }
}

/// Returns the matching blocks of `a` against `b`, ordered by position.
///
/// Adjacent blocks are merged; no zero-size sentinel is appended.
#[must_use]
pub fn matching_blocks(a: &str, b: &str) -> Vec<MatchingBlock> {
    BlockMatcher::new(a, b).matching_blocks()
}

/// Similarity of `a` against `b` in `[0, 1]`; `1.0` means identical.
///
/// Two empty strings are considered identical.
///
/// # Examples
///
/// ```
/// use mediaflow::matching::sequence_ratio;
///
/// assert_eq!(sequence_ratio("Attack on Titan", "Attack on Titan"), 1.0);
/// assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
/// ```
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    BlockMatcher::new(a, b).ratio()
}
