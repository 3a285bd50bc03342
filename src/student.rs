use std::{thread, time::Duration};

use log::{info, warn};
use rand::Rng;

use crate::{arbiter::Hall, error::Result, monitor::DiningMonitor};

// 学生ごとの模擬作業の長さ
#[derive(Debug, Clone, Copy)]
pub struct Work {
    pub max_food: Duration,
    pub max_dine: Duration,
    pub patience: Option<Duration>,
}

impl Work {
    fn food_time(&self) -> Duration {
        random_duration(self.max_food)
    }

    fn dine_time(&self) -> Duration {
        random_duration(self.max_dine)
    }
}

// 0 以上 max 以下のランダムな長さ
fn random_duration(max: Duration) -> Duration {
    rand::thread_rng().gen_range(Duration::ZERO..=max)
}

pub fn get_food(id: usize, work: &Work) {
    info!("student {id} is getting food...");
    thread::sleep(work.food_time());
}

pub fn dine(id: usize, at_table: usize, work: &Work) {
    info!("-> student {id} is EATING (at the table: {at_table})");
    thread::sleep(work.dine_time());
}

pub fn leave(id: usize, at_table: usize) {
    info!("<- student {id} LEFT (still at the table: {at_table})");
}

/// 1 人の学生の一生: 食事を取る -> 着席 -> 食べる -> 退席 -> 帰る
pub fn run(id: usize, monitor: &DiningMonitor, work: &Work) {
    get_food(id, work);

    match work.patience {
        None => monitor.arrive_to_eat(id),
        Some(p) => {
            // 時間切れになっても諦めずに並び直す
            while let Err(e) = monitor.arrive_to_eat_timeout(id, p) {
                warn!("{e}, trying again");
            }
        }
    }

    dine(id, monitor.state().eating, work);

    match work.patience {
        None => monitor.arrive_to_leave(id),
        Some(p) => {
            while let Err(e) = monitor.arrive_to_leave_timeout(id, p) {
                warn!("{e}, trying again");
            }
        }
    }

    leave(id, monitor.state().eating);
}

/// run の非同期版。同期はアービタにまかせる
pub async fn run_async(id: usize, hall: Hall, work: Work) -> Result<()> {
    info!("student {id} is getting food...");
    tokio::time::sleep(work.food_time()).await;

    let at_table = hall.arrive_to_eat(id).await?;

    info!("-> student {id} is EATING (at the table: {at_table})");
    tokio::time::sleep(work.dine_time()).await;

    let at_table = hall.arrive_to_leave(id).await?;
    leave(id, at_table);
    Ok(())
}
