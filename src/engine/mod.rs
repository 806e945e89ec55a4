// ==========================================
// 零售补货分析系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: 判定引擎为纯函数;阈值显式传入,不读共享可变配置
// ==========================================

pub mod error;
pub mod orchestrator;
pub mod reconciler;
pub mod replenishment;
pub mod rolling;
pub mod status;
pub mod velocity;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use orchestrator::{run_detached, AnalysisOrchestrator};
pub use reconciler::{LocationReconciler, ReconcileInput};
pub use replenishment::ReplenishmentPlanner;
pub use rolling::{RollingVelocity, RollingVelocityEngine};
pub use status::StatusClassifier;
pub use velocity::{VelocityModel, DEFAULT_SILENCE_THRESHOLD};
