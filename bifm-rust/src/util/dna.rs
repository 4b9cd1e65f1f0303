//! DNA 字母表：字符 <-> rank 映射。
//!
//! rank 取值 `0..SIGMA`（A=0, C=1, G=2, T=3, N=4）。索引内部会统一加 1，
//! 把 0 留给序列分隔符，所以这里不需要预留 `$`。

pub const SIGMA: usize = 5; // {0:A, 1:C, 2:G, 3:T, 4:N}

/// 不含 N 的核心字母表大小，k-mer 哈希只在这四个字符上定义。
pub const DNA4: usize = 4;

pub const N_RANK: u8 = 4;

#[inline]
pub fn to_rank(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' | b'U' => 3,
        _ => N_RANK, // IUPAC 模糊碱基统一当作 N
    }
}

#[inline]
pub fn from_rank(r: u8) -> u8 {
    match r {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        3 => b'T',
        _ => b'N',
    }
}

/// 把任意 ASCII 序列编码为 rank 序列。
pub fn encode(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| to_rank(b)).collect()
}

pub fn decode(ranks: &[u8]) -> Vec<u8> {
    ranks.iter().map(|&r| from_rank(r)).collect()
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&b| match b.to_ascii_uppercase() {
            up @ (b'A' | b'C' | b'G' | b'T') => up,
            b'U' => b'T',
            _ => b'N',
        })
        .collect()
}

/// rank 层面的互补：A<->T, C<->G, N 保持不变。
#[inline]
pub fn complement_rank(r: u8) -> u8 {
    if r < DNA4 as u8 { 3 - r } else { N_RANK }
}

#[inline]
pub fn complement(base: u8) -> u8 {
    from_rank(complement_rank(to_rank(base)))
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

pub fn revcomp_ranks(ranks: &[u8]) -> Vec<u8> {
    ranks.iter().rev().map(|&r| complement_rank(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_mapping_is_case_insensitive() {
        assert_eq!(encode(b"acgtN"), vec![0, 1, 2, 3, 4]);
        assert_eq!(encode(b"U"), vec![3]);
        assert_eq!(to_rank(b'R'), N_RANK);
    }

    #[test]
    fn decode_inverts_encode_for_canonical_bases() {
        assert_eq!(decode(&encode(b"GATTACAN")), b"GATTACAN");
    }

    #[test]
    fn normalize_maps_unknown_to_n() {
        assert_eq!(normalize_seq(b"acgu-x"), b"ACGTNN");
    }

    #[test]
    fn revcomp_works_on_bytes_and_ranks() {
        assert_eq!(revcomp(b"AACGTN"), b"NACGTT");
        assert_eq!(revcomp_ranks(&[0, 0, 1, 2, 3, 4]), vec![4, 0, 1, 2, 3, 3]);
    }
}
