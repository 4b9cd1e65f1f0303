//! 查询 agent：持有 IBF 的共享借用和一块复用的结果缓冲区。
//!
//! 每个线程各建一个 agent；返回的引用在下一次查询前有效。

use super::counting::{BinningBitVector, Counter, CountingVector};
use super::{BloomWords, HASH_SEEDS, MAX_HASH_FUNCTIONS};

pub struct MembershipAgent<'f, F> {
    ibf: &'f F,
    result: BinningBitVector,
}

impl<'f, F: BloomWords> MembershipAgent<'f, F> {
    pub fn new(ibf: &'f F) -> Self {
        Self { ibf, result: BinningBitVector::new(ibf.bin_count()) }
    }

    /// 一次批量访存判断 `value` 在哪些 bin 中（可能有假阳性，没有假阴性）。
    pub fn bulk_contains(&mut self, value: u64) -> &BinningBitVector {
        let layout = self.ibf.layout();
        let funs = layout.hash_function_count();
        let mut indices = [0usize; MAX_HASH_FUNCTIONS];
        for (idx, &seed) in indices.iter_mut().zip(&HASH_SEEDS[..funs]) {
            *idx = layout.hash_and_fit(value, seed);
        }

        for batch in 0..layout.bin_words() {
            let mut word = !0u64;
            for idx in &mut indices[..funs] {
                word &= self.ibf.word_at(*idx);
                *idx += 64;
            }
            self.result.set_word(batch, word);
        }
        &self.result
    }
}

/// 对一串哈希值逐个 `bulk_contains` 并累加到每个 bin 的计数上。
pub struct CountingAgent<'f, F, T> {
    membership: MembershipAgent<'f, F>,
    result: CountingVector<T>,
}

impl<'f, F: BloomWords, T: Counter> CountingAgent<'f, F, T> {
    pub fn new(ibf: &'f F) -> Self {
        Self { membership: MembershipAgent::new(ibf), result: CountingVector::new(ibf.bin_count()) }
    }

    pub fn bulk_count<I>(&mut self, values: I) -> &CountingVector<T>
    where
        I: IntoIterator<Item = u64>,
    {
        self.result.reset();
        for value in values {
            self.result += self.membership.bulk_contains(value);
        }
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibf::{BinCount, BinIndex, BinSize, HashFunctionCount, InterleavedBloomFilter};

    fn filled() -> InterleavedBloomFilter {
        let mut f = InterleavedBloomFilter::new(BinCount(70), BinSize(8192), HashFunctionCount(2)).unwrap();
        // bin b 收到 b % 7 + 1 个值：100*b .. 100*b + b%7
        for b in 0..70usize {
            for k in 0..=(b % 7) as u64 {
                f.emplace(100 * b as u64 + k, BinIndex(b));
            }
        }
        f
    }

    #[test]
    fn result_buffer_is_sized_to_bins() {
        let f = filled();
        let mut agent = f.membership_agent();
        assert_eq!(agent.bulk_contains(0).len(), 70);
        assert!(agent.bulk_contains(6_903).get(69));
    }

    #[test]
    fn every_inserted_value_is_counted() {
        let f = filled();
        let mut counter = f.counting_agent::<u16>();
        for b in 0..70usize {
            let values: Vec<u64> = (0..=(b % 7) as u64).map(|k| 100 * b as u64 + k).collect();
            let counts = counter.bulk_count(values.iter().copied());
            assert_eq!(counts[b] as usize, values.len(), "bin {}", b);
        }
    }

    #[test]
    fn buffer_is_reset_between_queries() {
        let f = filled();
        let mut counter = f.counting_agent::<u32>();
        let first = counter.bulk_count([100, 101]).to_vec();
        let second = counter.bulk_count([100, 101]).to_vec();
        assert_eq!(first, second);
        assert!(counter.bulk_count(std::iter::empty()).iter().all(|&c| c == 0));
    }

    #[test]
    fn counting_equals_summed_membership() {
        let f = filled();
        let values = [5u64, 105, 205, 1_000_000, 6_900];
        let mut expected = CountingVector::<u64>::new(70);
        let mut membership = f.membership_agent();
        for &v in &values {
            expected += membership.bulk_contains(v);
        }
        let mut counter = f.counting_agent::<u64>();
        assert_eq!(counter.bulk_count(values), &expected);
    }

    #[test]
    fn compressed_agents_count_the_same() {
        let f = filled();
        let c = f.compress();
        let values: Vec<u64> = (0..7_000).step_by(13).collect();
        let a = f.counting_agent::<u32>().bulk_count(values.iter().copied()).clone();
        let b = c.counting_agent::<u32>().bulk_count(values.iter().copied()).clone();
        assert_eq!(a, b);
    }
}
