//! # 閲覧 URL
//!
//! 本文中の `{viewUrl}` に埋め込む「ブラウザで表示」リンクを生成する。
//! 閲覧エンドポイント自体はホストアプリケーションが提供する。

use postflow_domain::email::EmailMessageId;

/// 閲覧 URL の生成を担当するトレイト
pub trait ViewUrlBuilder: Send + Sync {
    fn view_url(&self, id: &EmailMessageId) -> String;
}

/// `{base_url}/email/view/{id}` 形式の URL を生成する
#[derive(Debug, Clone)]
pub struct BaseUrlViewUrlBuilder {
    base_url: String,
}

impl BaseUrlViewUrlBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ViewUrlBuilder for BaseUrlViewUrlBuilder {
    fn view_url(&self, id: &EmailMessageId) -> String {
        format!("{}/email/view/{id}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://mail.example.com")]
    #[case("https://mail.example.com/")]
    fn test_ベースurlとidから閲覧urlを生成する(#[case] base_url: &str) {
        let id = EmailMessageId::from_uuid(
            "01900000-0000-7000-8000-000000000001".parse().unwrap(),
        );

        assert_eq!(
            BaseUrlViewUrlBuilder::new(base_url).view_url(&id),
            "https://mail.example.com/email/view/01900000-0000-7000-8000-000000000001"
        );
    }
}
