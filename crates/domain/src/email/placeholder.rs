//! プレースホルダ置換
//!
//! 件名や本文中の `{key}` をテンプレートデータの値で置換する。
//! 置換後の文字列は再走査しないため、値に `{other}` が含まれていても
//! 二重に展開されることはない。

use serde_json::Value;

/// テンプレートデータ（プレースホルダ名 → 値）
pub type TemplateData = serde_json::Map<String, Value>;

/// `{key}` を `data[key]` の文字列表現で置換する
///
/// `data` に存在しないキーはそのまま残す（エラーにしない）。
pub fn substitute(source: &str, data: &TemplateData) -> String {
    if data.is_empty() {
        return source.to_string();
    }

    let mut output = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];

        let replaced = candidate.find('}').and_then(|close| {
            data.get(&candidate[..close])
                .map(|value| (value_to_string(value), close))
        });

        match replaced {
            Some((value, close)) => {
                output.push_str(&value);
                rest = &candidate[close + 1..];
            }
            None => {
                output.push('{');
                rest = candidate;
            }
        }
    }
    output.push_str(rest);

    output
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
