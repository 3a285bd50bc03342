use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use crate::error::{Result, SimError};

// 食事を取りに行く時間と食べる時間の上限 (ミリ秒)
const DEFAULT_MAX_FOOD_MS: u64 = 500;
const DEFAULT_MAX_DINE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Threads, // 学生 1 人に OS スレッド 1 つ、モニタで同期
    Tasks,   // 学生 1 人に tokio タスク 1 つ、アービタで同期
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub students: usize,
    pub backend: Backend,
    pub max_food: Duration,
    pub max_dine: Duration,
    // 設定されていれば、退席をこの時間ごとに区切って待つ
    pub patience: Option<Duration>,
    pub observe: bool,
}

impl Config {
    /// コマンドライン引数と環境変数から設定を作る
    ///
    /// 人数が引数で与えられなければ標準入力から聞く。
    pub fn from_env() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let stdin = io::stdin();
        let mut input = stdin.lock();
        Config::parse(&args, |name| std::env::var(name).ok(), &mut input)
    }

    pub fn parse<F, R>(args: &[String], env: F, input: &mut R) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        R: BufRead,
    {
        let mut count = None;
        let mut backend = Backend::Threads;
        let mut observe = false;

        for arg in args {
            match arg.as_str() {
                "--async" => backend = Backend::Tasks,
                "--observe" => observe = true,
                s if s.starts_with("--") => return Err(SimError::UnknownOption(s.to_string())),
                s if count.is_none() => count = Some(s.to_string()),
                s => return Err(SimError::UnknownOption(s.to_string())),
            }
        }

        let count = match count {
            Some(c) => c,
            None => prompt_count(input)?,
        };

        let config = Config {
            students: parse_count(&count)?,
            backend,
            max_food: millis(&env, "DINING_MAX_FOOD_MS")?
                .unwrap_or(Duration::from_millis(DEFAULT_MAX_FOOD_MS)),
            max_dine: millis(&env, "DINING_MAX_DINE_MS")?
                .unwrap_or(Duration::from_millis(DEFAULT_MAX_DINE_MS)),
            patience: millis(&env, "DINING_PATIENCE_MS")?,
            observe,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.students < 2 {
            return Err(SimError::TooFewStudents(self.students as i64));
        }
        if self.patience == Some(Duration::ZERO) {
            return Err(SimError::InvalidSetting {
                name: "DINING_PATIENCE_MS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn prompt_count<R: BufRead>(input: &mut R) -> Result<String> {
    print!("Number of students: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SimError::InvalidCount(String::new()));
    }
    Ok(line)
}

fn parse_count(s: &str) -> Result<usize> {
    let s = s.trim();
    let n: i64 = s
        .parse()
        .map_err(|_| SimError::InvalidCount(s.to_string()))?;
    if n < 2 {
        return Err(SimError::TooFewStudents(n));
    }
    usize::try_from(n).map_err(|_| SimError::InvalidCount(s.to_string()))
}

fn millis<F>(env: &F, name: &'static str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match env(name) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| SimError::InvalidSetting { name, value: v }),
    }
}
