use std::{sync::Arc, thread, time::Duration};

use log::{debug, info};

use crate::{
    arbiter::Hall,
    config::{Backend, Config},
    error::{Result, SimError},
    monitor::DiningMonitor,
    observer::{AsyncObserver, Observer, Report},
    student::{self, Work},
};

// 観測者がテーブルを覗く間隔
const OBSERVE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub served: usize,
    pub observed: Option<Report>,
}

impl From<&Config> for Work {
    fn from(config: &Config) -> Self {
        Work {
            max_food: config.max_food,
            max_dine: config.max_dine,
            patience: config.patience,
        }
    }
}

pub fn run(config: &Config) -> Result<Summary> {
    config.validate()?;
    info!(
        "--- starting the dining hall simulation with {} students ---",
        config.students
    );

    let summary = match config.backend {
        Backend::Threads => run_threads(config)?,
        Backend::Tasks => run_tasks(config)?,
    };

    info!("--- all students have left, simulation finished ---");
    Ok(summary)
}

/// 学生 1 人につき 1 スレッド。同期はモニタで行う
pub fn run_threads(config: &Config) -> Result<Summary> {
    let monitor = Arc::new(DiningMonitor::with_roster(config.students));
    let work = Work::from(config);

    let observer = if config.observe {
        Some(Observer::spawn(monitor.clone(), OBSERVE_INTERVAL)?)
    } else {
        None
    };

    let mut v = Vec::with_capacity(config.students);
    for id in 1..=config.students {
        let m = monitor.clone();
        // 1 人でも生成できなければシミュレーション全体を失敗とする。
        // 生成済みの学生は join せずに置いていく (相方が来ずに止まったままになりうる)。
        // 呼び出し元の main はこのエラーで終了するので、そのまま回収される
        let t = thread::Builder::new()
            .name(format!("student-{id}"))
            .spawn(move || student::run(id, &m, &work))
            .map_err(|source| SimError::Spawn { id, source })?;
        v.push((id, t));
    }

    let mut failed = None;
    for (id, t) in v {
        if t.join().is_err() {
            failed.get_or_insert(SimError::StudentPanicked(id));
        }
    }

    let observed = observer.map(Observer::stop).transpose()?;
    if let Some(e) = failed {
        return Err(e);
    }

    let last = monitor.state();
    debug!("final state: {last:?}");
    debug_assert!(last.is_empty());
    Ok(Summary {
        served: config.students,
        observed,
    })
}

/// 学生 1 人につき 1 タスク。同期はアービタタスクへのメッセージで行う
pub fn run_tasks(config: &Config) -> Result<Summary> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .thread_name("student-pool")
        .enable_all()
        .build()?;

    rt.block_on(simulate_tasks(config))
}

async fn simulate_tasks(config: &Config) -> Result<Summary> {
    let (hall, arbiter) = Hall::open(Some(config.students));
    let work = Work::from(config);

    let observer = config
        .observe
        .then(|| AsyncObserver::spawn(hall.clone(), OBSERVE_INTERVAL));

    let mut join_handles = Vec::with_capacity(config.students);
    for id in 1..=config.students {
        let t = tokio::spawn(student::run_async(id, hall.clone(), work));
        join_handles.push((id, t));
    }

    let mut failed = None;
    for (id, t) in join_handles {
        match t.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed.get_or_insert(e);
            }
            Err(e) => {
                failed.get_or_insert(SimError::TaskFailed(id, e.to_string()));
            }
        }
    }

    let observed = match observer {
        Some(o) => Some(o.stop().await?),
        None => None,
    };

    // 最後のハンドルを drop するとアービタが終わる
    drop(hall);
    let last = arbiter
        .await
        .map_err(|e| SimError::TaskFailed(0, e.to_string()))?;
    debug!("final state: {last:?}");

    if let Some(e) = failed {
        return Err(e);
    }
    debug_assert!(last.is_empty());

    Ok(Summary {
        served: config.students,
        observed,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(students: usize, backend: Backend) -> Config {
        Config {
            students,
            backend,
            max_food: Duration::from_millis(5),
            max_dine: Duration::from_millis(5),
            patience: None,
            observe: true,
        }
    }

    #[test]
    fn test_run_threads() {
        for n in [2, 3, 7] {
            let summary = run(&config(n, Backend::Threads)).unwrap();
            assert_eq!(summary.served, n);
            let report = summary.observed.unwrap();
            assert!(report.is_clean(), "{report:?}");
        }
    }

    #[test]
    fn test_run_tasks() {
        for n in [2, 3, 7] {
            let summary = run(&config(n, Backend::Tasks)).unwrap();
            assert_eq!(summary.served, n);
            assert!(summary.observed.unwrap().is_clean());
        }
    }

    #[test]
    fn test_run_with_patience() {
        let mut c = config(5, Backend::Threads);
        c.patience = Some(Duration::from_millis(1));
        c.observe = false;
        let summary = run(&c).unwrap();
        assert_eq!(summary.served, 5);
        assert_eq!(summary.observed, None);
    }

    #[test]
    fn test_rejects_lone_student() {
        let res = run(&config(1, Backend::Threads));
        assert!(matches!(res, Err(SimError::TooFewStudents(1))));
    }
}
