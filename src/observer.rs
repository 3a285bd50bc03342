use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::{
    arbiter::Hall,
    error::{Result, SimError},
    monitor::DiningMonitor,
    table::TableState,
};

// 観測結果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub samples: usize,
    pub peak: usize,         // 同時に着席していた最大人数
    pub stranded: usize,     // ひとりきりで座っていた回数
    pub inconsistent: usize, // 着席人数より退席待ちが多かった回数
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.stranded == 0 && self.inconsistent == 0
    }

    fn record(&mut self, s: &TableState) {
        self.samples += 1;
        self.peak = self.peak.max(s.eating);

        if s.has_stranded_diner() {
            warn!("a student is dining alone: {s:?}");
            self.stranded += 1;
        }
        if !s.is_consistent() {
            warn!("more students leaving than eating: {s:?}");
            self.inconsistent += 1;
        }
    }
}

/// テーブルを一定間隔で覗いて、ひとりで食べている人がいないか見張る
pub struct Observer {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Report>,
}

impl Observer {
    pub fn spawn(monitor: Arc<DiningMonitor>, interval: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop0 = stop.clone();

        let handle = thread::Builder::new()
            .name("observer".to_string())
            .spawn(move || observe(&monitor, &stop0, interval))
            .map_err(SimError::Io)?;

        Ok(Observer { stop, handle })
    }

    /// 観測をやめて結果を受け取る
    pub fn stop(self) -> Result<Report> {
        self.stop.store(true, Ordering::Release);
        self.handle
            .join()
            .map_err(|_| SimError::TaskFailed(0, "observer panicked".to_string()))
    }
}

fn observe(monitor: &DiningMonitor, stop: &AtomicBool, interval: Duration) -> Report {
    let mut report = Report::default();

    while !stop.load(Ordering::Acquire) {
        report.record(&monitor.state());
        thread::sleep(interval);
    }

    debug!("observer finished: {report:?}");
    report
}

/// Observer のアービタ版。tokio タスクとしてアービタに状態を問い合わせる
pub struct AsyncObserver {
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<Report>,
}

impl AsyncObserver {
    pub fn spawn(hall: Hall, interval: Duration) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(observe_hall(hall, stop_rx, interval));
        AsyncObserver { stop, handle }
    }

    pub async fn stop(self) -> Result<Report> {
        // 先に止まっていれば受け手はもういない
        let _ = self.stop.send(());
        self.handle
            .await
            .map_err(|e| SimError::TaskFailed(0, e.to_string()))
    }
}

async fn observe_hall(hall: Hall, mut stop: oneshot::Receiver<()>, interval: Duration) -> Report {
    let mut report = Report::default();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match hall.state().await {
            Ok(s) => report.record(&s),
            Err(_) => break,
        }
    }

    debug!("observer finished: {report:?}");
    report
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_observe_busy_hall() {
        const NUM_STUDENTS: usize = 32;

        let monitor = Arc::new(DiningMonitor::with_roster(NUM_STUDENTS));
        let observer = Observer::spawn(monitor.clone(), Duration::ZERO).unwrap();

        let v: Vec<_> = (1..=NUM_STUDENTS)
            .map(|id| {
                let m = monitor.clone();
                thread::spawn(move || {
                    m.arrive_to_eat(id);
                    thread::sleep(Duration::from_millis(1));
                    m.arrive_to_leave(id);
                })
            })
            .collect();
        for t in v {
            t.join().unwrap();
        }

        let report = observer.stop().unwrap();
        assert!(report.samples > 0);
        assert!(report.peak <= NUM_STUDENTS);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_record() {
        let mut report = Report::default();
        report.record(&TableState {
            eating: 3,
            ready_to_eat: 0,
            ready_to_leave: 1,
            remaining: None,
        });
        report.record(&TableState {
            eating: 1,
            ready_to_eat: 0,
            ready_to_leave: 0,
            remaining: None,
        });
        assert_eq!(report.samples, 2);
        assert_eq!(report.peak, 3);
        assert_eq!(report.stranded, 1);
        assert!(!report.is_clean());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_observe_arbiter() {
        const NUM_STUDENTS: usize = 16;

        let (hall, arbiter) = Hall::open(Some(NUM_STUDENTS));
        let observer = AsyncObserver::spawn(hall.clone(), Duration::from_millis(1));

        let v: Vec<_> = (1..=NUM_STUDENTS)
            .map(|id| {
                let h = hall.clone();
                tokio::spawn(async move {
                    h.arrive_to_eat(id).await?;
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    h.arrive_to_leave(id).await
                })
            })
            .collect();
        for t in v {
            t.await.unwrap().unwrap();
        }

        let report = observer.stop().await.unwrap();
        assert!(report.is_clean(), "{report:?}");

        drop(hall);
        assert!(arbiter.await.unwrap().is_empty());
    }

    #[test]
    fn test_observe_idle_hall() {
        let monitor = Arc::new(DiningMonitor::new());
        let observer = Observer::spawn(monitor, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        let report = observer.stop().unwrap();
        assert!(report.samples > 0);
        assert_eq!(report.peak, 0);
        assert!(report.is_clean());
    }
}
