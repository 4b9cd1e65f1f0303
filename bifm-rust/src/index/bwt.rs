/// 由后缀数组得到 BWT：`bwt[i] = text[SA[i] - 1]`（循环意义下）。
///
/// 文本以分隔符 0 结尾，所以 `SA[i] == 0` 的行得到的也是分隔符。
pub fn build_bwt(text: &[u8], sa: &[u32]) -> Vec<u8> {
    let n = text.len();
    sa.iter()
        .map(|&p| match p as usize {
            0 => text[n - 1],
            i => text[i - 1],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::build_sa;

    #[test]
    fn bwt_of_banana() {
        // b=2 a=1 n=3，末尾分隔符 0
        let text = [2u8, 1, 3, 1, 3, 1, 0];
        let sa = build_sa(&text);
        // 排序后缀：$ a$ ana$ anana$ banana$ na$ nana$
        assert_eq!(sa, vec![6, 5, 3, 1, 0, 4, 2]);
        assert_eq!(build_bwt(&text, &sa), vec![1, 3, 3, 2, 0, 1, 1]);
    }

    #[test]
    fn bwt_is_a_permutation_of_text() {
        let text = [1u8, 2, 0, 3, 1, 0];
        let sa = build_sa(&text);
        let mut a = build_bwt(&text, &sa);
        let mut b = text.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}
