use std::{
    fmt,
    io::{self, Write},
    sync::Once,
    thread,
};

use log::{Level, LevelFilter, Log, Metadata, Record};

pub fn init() {
    static LOGGER: SimpleLogger = SimpleLogger;
    static INIT: Once = Once::new();

    // テストから何度呼ばれても 1 回だけ設定する
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level_from_env(std::env::var("LOG").ok().as_deref()));
        }
    });
}

pub fn level_from_env(var: Option<&str>) -> LevelFilter {
    match var {
        Some("error") => LevelFilter::Error,
        Some("warn") => LevelFilter::Warn,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Add escape sequence to print with color in Linux console
macro_rules! with_color {
    ($args: ident, $color_code: ident) => {
        format_args!("\u{1B}[{}m{}\u{1B}[0m", $color_code, $args)
    };
}

fn print_in_color(args: fmt::Arguments, color_code: u8) {
    // 1 行まるごと stdout のロックを取って書くので、スレッド間で行が混ざらない
    let mut out = io::stdout().lock();
    // 標準出力が閉じられていてもシミュレーションは止めない
    let _ = out.write_fmt(with_color!(args, color_code));
}

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let current = thread::current();
        print_in_color(
            format_args!(
                "[{:>5}][{}] {}\n",
                record.level(),
                current.name().unwrap_or("-"),
                record.args()
            ),
            level_to_color_code(record.level()),
        );
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}
