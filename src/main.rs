// ==========================================
// 日间活动排班系统 - 进程入口
// ==========================================
// 运行模式:
//   day-program-roster roll    执行一次窗口滚动后退出
//   day-program-roster verify  执行一次排班核对后退出
//   day-program-roster serve   守护进程, 按配置时刻每日滚动 + 核对 (默认)
//
// 数据库路径: 环境变量 DAY_PROGRAM_ROSTER_DB, 缺省 ./day_program_roster.db
// ==========================================

use anyhow::Context;
use day_program_roster::config::SettingsStore;
use day_program_roster::domain::calendar::OrgClock;
use day_program_roster::engine::{ScheduleVerifier, WindowRoller};
use day_program_roster::{db, logging, APP_NAME, VERSION};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

const DEFAULT_DB_PATH: &str = "day_program_roster.db";

/// 守护进程的轮询间隔
const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or("serve");

    let db_path = std::env::var("DAY_PROGRAM_ROSTER_DB")
        .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    info!(app = APP_NAME, version = VERSION, db = %db_path, %mode, "启动");

    let conn = db::open_sqlite_connection(&db_path)
        .with_context(|| format!("打开数据库失败: {}", db_path))?;
    db::init_schema(&conn).context("初始化数据库结构失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let settings = SettingsStore::from_connection(conn.clone())?;
    let clock = OrgClock::new(settings.tz_offset_minutes()?);

    match mode {
        "roll" => {
            let roller = WindowRoller::new(conn.clone(), settings, clock);
            let summary = roller.run_daily_roll()?;
            info!(
                window_end = %summary.window_end,
                instances_upserted = summary.instances_upserted,
                "滚动完成"
            );
        }
        "verify" => {
            let verifier = ScheduleVerifier::new(conn.clone(), clock);
            let report = verifier.run_verification()?;
            if report.is_clean() {
                info!(date = %report.verify_date, "核对通过");
            } else {
                warn!(date = %report.verify_date, findings = ?report.findings, "核对发现问题");
            }
        }
        "serve" => {
            serve(conn, settings, clock).await?;
        }
        other => {
            eprintln!("未知模式: {}", other);
            eprintln!("用法: {} [roll|verify|serve]", APP_NAME);
            std::process::exit(2);
        }
    }

    Ok(())
}

/// 守护进程主循环
///
/// 每分钟醒来一次, 越过配置的触发时刻就执行对应动作, 每个动作每天至多一次。
/// 单次失败已在引擎内落审计, 这里只记日志, 进程继续存活等次日重试。
async fn serve(
    conn: Arc<Mutex<Connection>>,
    settings: SettingsStore,
    clock: OrgClock,
) -> anyhow::Result<()> {
    let loop_settings = SettingsStore::from_connection(conn.clone())?;
    let roller = WindowRoller::new(conn.clone(), settings, clock);
    let verifier = ScheduleVerifier::new(conn.clone(), clock);

    let mut last_roll_date: Option<NaiveDate> = None;
    let mut last_verify_date: Option<NaiveDate> = None;

    info!("守护进程就绪");
    loop {
        let today = clock.today();
        let now_time = clock.now().time();

        match loop_settings.roll_time() {
            Ok(roll_time) => {
                if now_time >= roll_time && last_roll_date != Some(today) {
                    info!(%today, "触发每日滚动");
                    if let Err(e) = roller.run_daily_roll() {
                        error!(error = %e, "每日滚动失败, 次日重试");
                    }
                    last_roll_date = Some(today);
                }
            }
            Err(e) => warn!(error = %e, "滚动触发时刻配置非法, 本轮跳过"),
        }

        match loop_settings.verify_time() {
            Ok(verify_time) => {
                if now_time >= verify_time && last_verify_date != Some(today) {
                    info!(%today, "触发排班核对");
                    if let Err(e) = verifier.run_verification() {
                        error!(error = %e, "排班核对失败");
                    }
                    last_verify_date = Some(today);
                }
            }
            Err(e) => warn!(error = %e, "核对触发时刻配置非法, 本轮跳过"),
        }

        tokio::time::sleep(TICK_INTERVAL).await;
    }
}
