// ==========================================
// 日间活动排班系统 - 日志初始化
// ==========================================
// 职责: 进程启动时装配 tracing 订阅器
// 红线: 只初始化一次; 过滤规则以环境变量优先
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 缺省过滤: 依赖库压到 warn, 排班系统自身 info
const DEFAULT_FILTER: &str = "warn,day_program_roster=info";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 覆盖缺省过滤器
///   例如: RUST_LOG=debug 或 RUST_LOG=day_program_roster=trace
///
/// # 示例
/// ```no_run
/// use day_program_roster::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 引擎层全开 debug, 写入测试捕获器, 重复调用安全
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("day_program_roster=debug"))
        .with_test_writer()
        .try_init();
}
