/// 构建后缀数组（倍增法，O(n log² n)）。
///
/// 输入为索引内部文本：字符 = rank + 1，0 是序列分隔符，文本中可以有多个 0。
/// 多个 0 之间按后续字符比较（与朴素字典序一致），所以同一位置上的分隔符
/// 不需要做成互不相同的哨兵。
pub fn build_sa(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<u32> = (0..n as u32).collect();
    // rank = -1 表示越过文本末尾，保证短后缀排在前面
    let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).collect();
    let mut next_rank = vec![0i64; n];

    let mut k = 1usize;
    loop {
        let key = |i: u32| -> (i64, i64) {
            let i = i as usize;
            (rank[i], if i + k < n { rank[i + k] } else { -1 })
        };
        sa.sort_unstable_by_key(|&i| key(i));

        let mut classes = 0i64;
        next_rank[sa[0] as usize] = 0;
        for w in 1..n {
            if key(sa[w]) != key(sa[w - 1]) {
                classes += 1;
            }
            next_rank[sa[w] as usize] = classes;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        // 所有后缀已两两可区分
        if classes as usize == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }
    sa
}
