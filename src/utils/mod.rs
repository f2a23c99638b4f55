use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub mod markdown;
pub mod version;

/// 将 kebab-case 的 slug 转为 PascalCase，例如 `directory-listing` -> `DirectoryListing`
pub fn pascal_case(slug: &str) -> String {
    slug.split(|c| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// 由 slug 推导入口名，例如 (`directory-listing`, `Plugin`) -> `DirectoryListingPlugin`
pub fn class_name(slug: &str, suffix: &str) -> String {
    format!("{}{}", pascal_case(slug), suffix)
}

/// slug 只允许小写字母、数字、`-` 和 `_`，防止路径穿越
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// 递归删除目录；目录不存在时视为成功并返回 `false`
pub fn remove_dir_tolerant(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).with_context(|| format!("删除目录失败: {}", path.display()))?;
    Ok(true)
}
