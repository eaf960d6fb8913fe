use chrono::Local;
use env_logger::Builder;
use log::Level;
use std::io::{IsTerminal, Write};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

pub fn init_logger() {
    init_logger_with_filter(DEFAULT_FILTER);
}

pub fn init_logger_with_filter(default_filter: &str) {
    // 非终端输出时不加颜色
    let colored = std::io::stderr().is_terminal();

    Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(move |buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let (level_color, reset) = if colored {
                (level_color(record.level()), "\x1b[0m")
            } else {
                ("", "")
            };
            writeln!(
                buf,
                "{} {}{:<5}{} [{}] {}",
                time,
                level_color,
                record.level(),
                reset,
                record.target(),
                record.args(),
            )
        })
        .init();
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m\x1b[1m", // 红色
        Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
        Level::Info => "\x1b[32m\x1b[1m",  // 绿色
        Level::Debug => "\x1b[36m\x1b[1m", // 青色
        Level::Trace => "\x1b[90m\x1b[1m", // 灰色
    }
}
