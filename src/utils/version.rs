//! 宽松的版本解析与比较

use anyhow::{anyhow, Result};
use semver::{Version, VersionReq};

use crate::error::PressliError;

/// 解析版本号，缺少的次版本和修订号补 0，例如 `8.1` -> `8.1.0`
pub fn parse_lenient(input: &str) -> Result<Version> {
    let trimmed = input.trim().trim_start_matches('v');
    let core_end = trimmed.find(|c| c == '-' || c == '+').unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(core_end);

    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    let normalized = format!("{}{}", parts.join("."), rest);

    Version::parse(&normalized)
        .map_err(|e| anyhow!(PressliError::config(format!("无法解析版本号 {}: {}", input, e))))
}

/// 判断 `actual` 是否满足要求
///
/// 要求可以是最低版本（低于即不满足），也可以是 semver 表达式，如 `>=1.2, <2`。
pub fn satisfies(actual: &Version, requirement: &str) -> Result<bool> {
    if let Ok(minimum) = parse_lenient(requirement) {
        return Ok(actual >= &minimum);
    }
    let req = VersionReq::parse(requirement)
        .map_err(|e| anyhow!(PressliError::config(format!("无法解析版本要求 {}: {}", requirement, e))))?;
    Ok(req.matches(actual))
}
