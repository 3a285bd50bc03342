use std::process::ExitCode;

use log::{error, info, warn};

mod arbiter;
mod config;
mod driver;
mod error;
mod logging;
mod monitor;
mod observer;
mod student;
mod table;

use config::Config;

// 食堂のルール: 誰もひとりで食べてはいけない
// 1. ひとりで座ることになるなら、相方が来るまで着席を待つ
// 2. 自分が出るとひとりが取り残されるなら、退席を待つ
fn main() -> ExitCode {
    logging::init();

    let result = Config::from_env().and_then(|config| driver::run(&config));
    match result {
        Ok(summary) => {
            if let Some(report) = summary.observed {
                info!(
                    "observed {} samples, at most {} at the table, {} lone diner(s)",
                    report.samples, report.peak, report.stranded
                );
                if !report.is_clean() {
                    warn!("the table was observed in an unexpected state: {report:?}");
                }
            }
            info!("{} students served", summary.served);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
