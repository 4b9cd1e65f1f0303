use std::fmt::Debug;
use std::ops::{AddAssign, Deref, DerefMut, SubAssign};

use serde::{Deserialize, Serialize};

/// `bulk_contains` 的结果：每个 bin 一位，按 64 位字存放。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinningBitVector {
    bins: usize,
    words: Vec<u64>,
}

impl BinningBitVector {
    pub fn new(bins: usize) -> Self {
        Self { bins, words: vec![0; bins.div_ceil(64)] }
    }

    pub fn len(&self) -> usize {
        self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.bins == 0
    }

    #[inline]
    pub fn get(&self, bin: usize) -> bool {
        debug_assert!(bin < self.bins);
        (self.words[bin >> 6] >> (bin & 63)) & 1 == 1
    }

    pub fn set(&mut self, bin: usize, value: bool) {
        debug_assert!(bin < self.bins);
        let mask = 1u64 << (bin & 63);
        if value {
            self.words[bin >> 6] |= mask;
        } else {
            self.words[bin >> 6] &= !mask;
        }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub(crate) fn set_word(&mut self, batch: usize, word: u64) {
        self.words[batch] = word;
    }

    /// 重新设定长度；多出的位清零。
    pub(crate) fn resize(&mut self, bins: usize) {
        self.bins = bins;
        self.words.resize(bins.div_ceil(64), 0);
        if bins & 63 != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << (bins & 63)) - 1;
            }
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// 置位的 bin 下标，升序。
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| SetBits(w).map(move |b| (wi << 6) + b))
    }
}

/// 逐个取出字中置位的下标（trailing_zeros 扫描）。
struct SetBits(u64);

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let tz = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(tz)
    }
}

/// 计数向量的元素类型。
pub trait Counter: Copy + Default + PartialEq + Debug + AddAssign + SubAssign + From<u8> {}

impl<T> Counter for T where T: Copy + Default + PartialEq + Debug + AddAssign + SubAssign + From<u8> {}

/// 每个 bin 一个计数器。溢出属于调用方违例（debug 构建下 panic）。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountingVector<T> {
    counts: Vec<T>,
}

impl<T: Counter> CountingVector<T> {
    pub fn new(bins: usize) -> Self {
        Self { counts: vec![T::default(); bins] }
    }

    pub fn reset(&mut self) {
        self.counts.fill(T::default());
    }

    pub(crate) fn resize(&mut self, bins: usize) {
        self.counts.resize(bins, T::default());
    }

    pub fn into_inner(self) -> Vec<T> {
        self.counts
    }
}

impl<T> Deref for CountingVector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.counts
    }
}

impl<T> DerefMut for CountingVector<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.counts
    }
}

impl<T> From<Vec<T>> for CountingVector<T> {
    fn from(counts: Vec<T>) -> Self {
        Self { counts }
    }
}

impl<T: Counter> AddAssign<&BinningBitVector> for CountingVector<T> {
    /// 只访问置位的 bin。
    fn add_assign(&mut self, bits: &BinningBitVector) {
        debug_assert_eq!(self.counts.len(), bits.len());
        let one = T::from(1);
        for bin in bits.ones() {
            self.counts[bin] += one;
        }
    }
}

impl<T: Counter> SubAssign<&BinningBitVector> for CountingVector<T> {
    fn sub_assign(&mut self, bits: &BinningBitVector) {
        debug_assert_eq!(self.counts.len(), bits.len());
        let one = T::from(1);
        for bin in bits.ones() {
            self.counts[bin] -= one;
        }
    }
}

impl<T: Counter> AddAssign<&CountingVector<T>> for CountingVector<T> {
    fn add_assign(&mut self, rhs: &CountingVector<T>) {
        debug_assert_eq!(self.counts.len(), rhs.counts.len());
        for (a, &b) in self.counts.iter_mut().zip(&rhs.counts) {
            *a += b;
        }
    }
}

impl<T: Counter> SubAssign<&CountingVector<T>> for CountingVector<T> {
    fn sub_assign(&mut self, rhs: &CountingVector<T>) {
        debug_assert_eq!(self.counts.len(), rhs.counts.len());
        for (a, &b) in self.counts.iter_mut().zip(&rhs.counts) {
            *a -= b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(bins: usize, set: &[usize]) -> BinningBitVector {
        let mut v = BinningBitVector::new(bins);
        for &b in set {
            v.set(b, true);
        }
        v
    }

    #[test]
    fn bit_scan_visits_only_set_bins() {
        let v = bits(130, &[0, 63, 64, 129]);
        assert_eq!(v.ones().collect::<Vec<_>>(), vec![0, 63, 64, 129]);
        assert_eq!(v.count_ones(), 4);
        assert!(v.get(63) && !v.get(62));
    }

    #[test]
    fn resize_clears_bits_past_the_end() {
        let mut v = bits(70, &[3, 69]);
        v.resize(65);
        assert_eq!(v.ones().collect::<Vec<_>>(), vec![3]);
        v.resize(128);
        assert_eq!(v.words().len(), 2);
        assert_eq!(v.count_ones(), 1);
    }

    #[test]
    fn accumulation_is_order_independent() {
        let a = bits(100, &[1, 5, 64, 99]);
        let b = bits(100, &[5, 6, 99]);

        let mut ab = CountingVector::<u16>::new(100);
        ab += &a;
        ab += &b;
        let mut ba = CountingVector::<u16>::new(100);
        ba += &b;
        ba += &a;
        assert_eq!(ab, ba);
        assert_eq!((ab[5], ab[99], ab[1], ab[6], ab[0]), (2, 2, 1, 1, 0));

        // 先分别计数再相加
        let mut only_a = CountingVector::<u16>::new(100);
        only_a += &a;
        let mut only_b = CountingVector::<u16>::new(100);
        only_b += &b;
        only_a += &only_b;
        assert_eq!(only_a, ab);

        ab -= &b;
        let mut expected = CountingVector::<u16>::new(100);
        expected += &a;
        assert_eq!(ab, expected);
        ab -= &expected;
        assert_eq!(ab, CountingVector::new(100));
    }

    #[test]
    fn works_for_every_counter_width() {
        let v = bits(3, &[2]);
        let mut a = CountingVector::<u8>::new(3);
        a += &v;
        let mut b = CountingVector::<u64>::new(3);
        b += &v;
        let mut c = CountingVector::<usize>::new(3);
        c += &v;
        assert_eq!((&a[..], &b[..], &c[..]), (&[0u8, 0, 1][..], &[0u64, 0, 1][..], &[0usize, 0, 1][..]));
    }
}
