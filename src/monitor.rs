use std::{
    sync::{Condvar, Mutex, MutexGuard},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    error::{Phase, Result, SimError},
    table::TableState,
};

/// ひとりで食べる人を出さないための食堂のモニタ
///
/// 3 つのカウンタを 1 つの Mutex で守り、着席側と退席側で条件変数を分ける。
/// 学生はかならず arrive_to_eat -> (食事) -> arrive_to_leave の順に呼ぶ。
pub struct DiningMonitor {
    table: Mutex<TableState>,
    ok_to_sit: Condvar,   // 着席待ちが待つ条件変数
    ok_to_leave: Condvar, // 退席待ちが待つ条件変数
}

impl Default for DiningMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DiningMonitor {
    pub fn new() -> Self {
        Self::from_state(TableState::new())
    }

    /// 参加する学生の人数が分かっている場合のモニタ
    ///
    /// 最後の 1 人が食堂に取り残されないよう、退席の条件に食堂全体の人数も使う。
    pub fn with_roster(students: usize) -> Self {
        Self::from_state(TableState::with_roster(students))
    }

    fn from_state(table: TableState) -> Self {
        DiningMonitor {
            table: Mutex::new(table),
            ok_to_sit: Condvar::new(),
            ok_to_leave: Condvar::new(),
        }
    }

    /// 現在のカウンタのスナップショット
    pub fn state(&self) -> TableState {
        *self.table.lock().unwrap()
    }

    pub fn arrive_to_eat(&self, id: usize) {
        let mut table = self.enter(id);

        // 誰も食べていなくて相方もいないなら待つ
        while table.must_wait_to_sit() {
            table = self.ok_to_sit.wait(table).unwrap();
        }

        self.sit(id, &mut table);
    }

    pub fn arrive_to_leave(&self, id: usize) {
        let mut table = self.finish(id);

        while table.must_wait_to_leave() {
            info!("student {id} stays so as not to leave a companion alone");
            table = self.ok_to_leave.wait(table).unwrap();
        }

        self.depart(id, &mut table);
    }

    /// arrive_to_eat の待ち時間上限つき版
    ///
    /// 時間切れのときは自分の ready_to_eat を取り消し、呼ぶ前の状態に戻して
    /// `SimError::TimedOut` を返す。
    pub fn arrive_to_eat_timeout(&self, id: usize, timeout: Duration) -> Result<()> {
        let table = self.enter(id);
        let (mut table, res) = self
            .ok_to_sit
            .wait_timeout_while(table, timeout, |t| t.must_wait_to_sit())
            .unwrap();

        // 時間切れでも条件が成立していれば座ってよい
        if res.timed_out() && table.must_wait_to_sit() {
            table.withdraw_eat();
            warn!("student {id} gave up waiting for a companion");
            return Err(SimError::TimedOut {
                id,
                phase: Phase::Eat,
            });
        }

        self.sit(id, &mut table);
        Ok(())
    }

    /// arrive_to_leave の待ち時間上限つき版
    ///
    /// 時間切れの学生は着席したままで、もう一度呼び直せる。
    pub fn arrive_to_leave_timeout(&self, id: usize, timeout: Duration) -> Result<()> {
        let table = self.finish(id);
        if table.must_wait_to_leave() {
            info!("student {id} stays so as not to leave a companion alone");
        }

        let (mut table, res) = self
            .ok_to_leave
            .wait_timeout_while(table, timeout, |t| t.must_wait_to_leave())
            .unwrap();

        if res.timed_out() && table.must_wait_to_leave() {
            // ready_to_leave が減っても他の退席待ちの条件は緩まないので通知は不要
            table.withdraw_leave();
            warn!("student {id} is still waiting for a companion to finish");
            return Err(SimError::TimedOut {
                id,
                phase: Phase::Leave,
            });
        }

        self.depart(id, &mut table);
        Ok(())
    }

    // ロックを取って ready_to_eat に自分を数える
    fn enter(&self, id: usize) -> MutexGuard<'_, TableState> {
        let mut table = self.table.lock().unwrap();
        table.arrive_to_eat();
        info!(
            "student {id} is ready to eat (waiting: {}, eating: {})",
            table.ready_to_eat, table.eating
        );
        table
    }

    // ロックを取って ready_to_leave に自分を数える
    fn finish(&self, id: usize) -> MutexGuard<'_, TableState> {
        let mut table = self.table.lock().unwrap();
        table.arrive_to_leave();
        info!(
            "student {id} finished and wants to leave (eating: {}, leaving: {})",
            table.eating, table.ready_to_leave
        );
        table
    }

    fn sit(&self, id: usize, table: &mut MutexGuard<'_, TableState>) {
        table.sit();
        debug!("student {id} sat down: {:?}", **table);

        // ペアが成立したなら、待っている相方を起こす
        self.ok_to_sit.notify_one();

        // 3 人以上になれば 2 人のテーブルで足止めされていた人が出られる
        if table.unblocks_leavers() {
            self.ok_to_leave.notify_all();
        }
    }

    fn depart(&self, id: usize, table: &mut MutexGuard<'_, TableState>) {
        table.depart();
        debug!("student {id} left the table: {:?}", **table);

        // 退席待ちは全員 eating が変わったので条件を見直す
        self.ok_to_leave.notify_all();
    }
}
