//! 宛先の許可パターン判定
//!
//! パターンは次の順で評価する:
//!
//! 1. パターンが空なら常に許可（フェイルオープン）
//! 2. `"*"` またはアドレスと完全一致すれば許可
//! 3. `*` を含むパターンは、最初の `*` より後ろの文字列をアドレスが
//!    **部分文字列として含めば** 許可する
//!
//! 3 はグロブではない。`*` より前の文字列は無視され、後ろの文字列も
//! 末尾一致ではなく部分一致で判定される（`"*@example.com"` は
//! `"x@example.com.evil"` も許可する）。`*` が複数ある場合も分割点は最初の 1 つ。

/// アドレスがパターンのいずれかに許可されているか判定する
pub fn is_allowed(address: &str, patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|pattern| matches(pattern, address))
}

fn matches(pattern: &str, address: &str) -> bool {
    if pattern == "*" || pattern == address {
        return true;
    }
    pattern
        .split_once('*')
        .is_some_and(|(_, rest)| address.contains(rest))
}

/// 宛先フィルタ
///
/// 起動時に設定された許可パターンを保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    patterns: Vec<String>,
}

impl AddressFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_allowed(&self, address: &str) -> bool {
        is_allowed(address, &self.patterns)
    }

    /// すべての宛先が許可されているか判定する
    pub fn allows_all(&self, addresses: &[String]) -> bool {
        addresses.iter().all(|address| self.is_allowed(address))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn patterns(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[rstest]
    #[case("user@example.com")]
    #[case("")]
    #[case("not an address")]
    fn test_パターンが空なら常に許可する(#[case] address: &str) {
        assert!(is_allowed(address, &[]));
    }

    #[rstest]
    #[case("user@example.com")]
    #[case("someone@other.org")]
    fn test_アスタリスク単体はすべて許可する(#[case] address: &str) {
        assert!(is_allowed(address, &patterns(&["*"])));
    }

    #[test]
    fn test_完全一致で許可する() {
        let p = patterns(&["admin@example.com"]);
        assert!(is_allowed("admin@example.com", &p));
        assert!(!is_allowed("other@example.com", &p));
    }

    #[rstest]
    #[case("x@example.com", true)]
    #[case("x@other.com", false)]
    fn test_ワイルドカードはアスタリスク以降の部分一致で判定する(
        #[case] address: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_allowed(address, &patterns(&["*@example.com"])), expected);
    }

    #[test]
    fn test_ワイルドカードは末尾一致ではなく部分一致() {
        let p = patterns(&["*@example.com"]);
        assert!(is_allowed("x@example.com.evil", &p));
    }

    #[test]
    fn test_アスタリスクより前の文字列は無視される() {
        let p = patterns(&["admin*@example.com"]);
        assert!(is_allowed("guest@example.com", &p));
    }

    #[test]
    fn test_複数のアスタリスクは最初の位置で分割する() {
        // 分割後の "@*.com" がそのまま部分一致の対象になる
        let p = patterns(&["*@*.com"]);
        assert!(!is_allowed("x@example.com", &p));
        assert!(is_allowed("x@*.com", &p));
    }

    #[test]
    fn test_いずれかのパターンに一致すれば許可する() {
        let p = patterns(&["admin@example.com", "*@staging.example.com"]);
        assert!(is_allowed("qa@staging.example.com", &p));
        assert!(!is_allowed("user@example.com", &p));
    }

    #[test]
    fn test_allows_allはすべての宛先が許可される場合のみtrue() {
        let filter = AddressFilter::new(patterns(&["*@example.com"]));

        assert!(filter.allows_all(&patterns(&["a@example.com", "b@example.com"])));
        assert!(!filter.allows_all(&patterns(&["a@example.com", "b@other.com"])));
    }
}
