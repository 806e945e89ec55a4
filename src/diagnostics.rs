// ==========================================
// 零售补货分析系统 - 诊断流
// ==========================================
// 职责: 定义诊断行发布 trait,解耦引擎与日志/界面表面
// 说明: 引擎与摄取管道只面向 trait 发布;调用方决定落地方式
//       (丢弃/有界队列/tracing 转发)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 诊断行
// ==========================================

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Info => write!(f, "INFO"),
            DiagnosticLevel::Warning => write!(f, "WARNING"),
            DiagnosticLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// 一条人类可读的诊断行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLine {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl DiagnosticLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
        }
    }
}

// ==========================================
// 诊断发布 Trait
// ==========================================

/// 诊断行发布者
///
/// 管道内部持 `&dyn DiagnosticsSink` 逐行发布;
/// 发布方永不因消费方缓慢而失败 (实现自行决定丢弃策略)
pub trait DiagnosticsSink: Send + Sync {
    /// 发布一条诊断行
    fn emit(&self, line: DiagnosticLine);
}

/// 空操作发布者 (单元测试或无界面场景)
#[derive(Debug, Clone, Default)]
pub struct NoOpSink;

impl DiagnosticsSink for NoOpSink {
    fn emit(&self, _line: DiagnosticLine) {}
}

/// tracing 转发发布者
///
/// 将诊断行按级别转入 tracing,适合无交互界面的批处理运行
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, line: DiagnosticLine) {
        match line.level {
            DiagnosticLevel::Info => tracing::info!("{}", line.message),
            DiagnosticLevel::Warning => tracing::warn!("{}", line.message),
            DiagnosticLevel::Error => tracing::error!("{}", line.message),
        }
    }
}

/// 有界队列发布者
///
/// 诊断行进入有界 tokio 通道,由调用方 (界面线程) 异步排空。
/// 队列打满时丢弃该行而非阻塞工作线程。
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<DiagnosticLine>,
}

impl ChannelSink {
    /// 创建发布者与配套接收端
    ///
    /// # 参数
    /// - capacity: 队列容量 (打满即丢弃)
    pub fn bounded(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<DiagnosticLine>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn emit(&self, line: DiagnosticLine) {
        // try_send: 队列满时丢弃,不阻塞分析工作线程
        let _ = self.tx.try_send(line);
    }
}
