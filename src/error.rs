use thiserror::Error;

/// Pressli 核心错误类型
///
/// 配置类错误是致命的，应当中止当前请求；`NotFound` 是可恢复的分支，
/// 调用方可以先用 `has()` 预检或自行捕获。
#[derive(Error, Debug)]
pub enum PressliError {
    #[error("配置错误: {message}")]
    ConfigError {
        message: String,
    },

    #[error("未找到{kind}: {name}")]
    NotFound {
        kind: &'static str,
        name: String,
    },

    #[error("依赖错误: 主题 {theme} 需要 {requirement} {required}，当前为 {actual}")]
    DependencyError {
        theme: String,
        requirement: String,
        required: String,
        actual: String,
    },

    #[error("加载失败: {message}")]
    LoadError {
        message: String,
    },

    #[error("执行钩子失败: 插件 {plugin} 在执行 {hook} 时出错: {message}")]
    HookError {
        plugin: String,
        hook: &'static str,
        message: String,
    },
}

impl PressliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// 配置错误与依赖错误都属于致命的配置类错误
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError { .. } | Self::DependencyError { .. })
    }
}

/// 从 anyhow 错误链中取出 `PressliError`
pub fn classify(err: &anyhow::Error) -> Option<&PressliError> {
    err.downcast_ref::<PressliError>()
}
