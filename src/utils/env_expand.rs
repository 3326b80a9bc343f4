//! `%VAR%` 形式的环境变量展开
//!
//! 与 Windows 的展开规则一致：未定义的变量原样保留。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([^%]+)%").expect("环境变量匹配模式无效"));

/// 展开字符串中所有 `%NAME%` 引用
pub fn expand_environment_variables(value: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
