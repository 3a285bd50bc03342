use std::collections::VecDeque;

use log::{debug, info, warn};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::{Result, SimError},
    table::TableState,
};

// アービタへのリクエストを溜めておけるキューの長さ
const QUEUE_DEPTH: usize = 64;

// 返信用の oneshot にはその時点で着席している人数を載せる
enum Request {
    Eat {
        id: usize,
        reply: oneshot::Sender<usize>,
    },
    Leave {
        id: usize,
        reply: oneshot::Sender<usize>,
    },
    State {
        reply: oneshot::Sender<TableState>,
    },
}

/// メッセージパッシング版の食堂
///
/// テーブルの状態は 1 つのアービタタスクだけが持ち、ロックは使わない。
/// 学生はリクエストを送り、自分用の oneshot で返事が来るまで待つ。
#[derive(Clone)]
pub struct Hall {
    tx: mpsc::Sender<Request>,
}

impl Hall {
    /// アービタタスクを起動する。tokio ランタイムの中で呼ぶこと
    ///
    /// すべての Hall が drop されるとアービタは止まり、最後の状態を返す。
    pub fn open(roster: Option<usize>) -> (Hall, JoinHandle<TableState>) {
        let table = match roster {
            Some(n) => TableState::with_roster(n),
            None => TableState::new(),
        };
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let handle = tokio::spawn(serve(rx, table));
        (Hall { tx }, handle)
    }

    pub async fn arrive_to_eat(&self, id: usize) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Eat { id, reply }).await?;
        rx.await.map_err(|_| SimError::HallClosed)
    }

    pub async fn arrive_to_leave(&self, id: usize) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Leave { id, reply }).await?;
        rx.await.map_err(|_| SimError::HallClosed)
    }

    pub async fn state(&self) -> Result<TableState> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::State { reply }).await?;
        rx.await.map_err(|_| SimError::HallClosed)
    }

    async fn request(&self, req: Request) -> Result<()> {
        self.tx.send(req).await.map_err(|_| SimError::HallClosed)
    }
}

async fn serve(mut rx: mpsc::Receiver<Request>, table: TableState) -> TableState {
    let mut arbiter = Arbiter {
        table,
        eaters: VecDeque::new(),
        leavers: VecDeque::new(),
    };

    while let Some(req) = rx.recv().await {
        arbiter.handle(req);
    }

    debug!("dining hall closed: {:?}", arbiter.table);
    arbiter.table
}

// 返事を待つ相手。None は返事を待たずに消えた学生の代わりに退席させる分
type Waiter = (usize, Option<oneshot::Sender<usize>>);

struct Arbiter {
    table: TableState,
    eaters: VecDeque<Waiter>,  // 着席待ち
    leavers: VecDeque<Waiter>, // 退席待ち
}

impl Arbiter {
    fn handle(&mut self, req: Request) {
        match req {
            Request::Eat { id, reply } => {
                self.table.arrive_to_eat();
                info!(
                    "student {id} is ready to eat (waiting: {}, eating: {})",
                    self.table.ready_to_eat, self.table.eating
                );
                self.eaters.push_back((id, Some(reply)));
            }
            Request::Leave { id, reply } => {
                self.table.arrive_to_leave();
                info!(
                    "student {id} finished and wants to leave (eating: {}, leaving: {})",
                    self.table.eating, self.table.ready_to_leave
                );
                self.leavers.push_back((id, Some(reply)));
            }
            Request::State { reply } => {
                // 去った学生を片付けてから答える
                self.settle();
                let _ = reply.send(self.table);
                return;
            }
        }

        self.settle();

        if !self.leavers.is_empty() && self.table.must_wait_to_leave() {
            debug!(
                "{} student(s) stay so as not to leave a companion alone",
                self.leavers.len()
            );
        }
    }

    // 返事を待たずに去った学生 (future が drop された) の登録を取り消す。
    // 着席待ちは座らなかったことに、退席待ちは座ったままに戻す
    fn drop_abandoned(&mut self) {
        let table = &mut self.table;
        self.eaters.retain(|(id, reply)| {
            let gone = reply.as_ref().is_some_and(|r| r.is_closed());
            if gone {
                debug!("student {id} gave up waiting for a seat");
                table.withdraw_eat();
            }
            !gone
        });
        self.leavers.retain(|(id, reply)| {
            let gone = reply.as_ref().is_some_and(|r| r.is_closed());
            if gone {
                debug!("student {id} gave up leaving and stays at the table");
                table.withdraw_leave();
            }
            !gone
        });
    }

    // 待っている学生のうち、条件を満たした人を動けなくなるまで通す。
    // 返事は最後にまとめて送るので、同時に通った学生には同じ人数が見える
    fn settle(&mut self) {
        loop {
            self.drop_abandoned();
            let (seated, departed) = self.admit();

            for (id, reply) in departed.into_iter().filter_map(|(id, r)| Some((id, r?))) {
                if reply.send(self.table.eating).is_err() {
                    debug!("student {id} left without waiting for the answer");
                }
            }

            // 座らせた直後に去った学生は、相方を残さないよう代わりに退席させる
            let mut vanished = false;
            for (id, reply) in seated.into_iter().filter_map(|(id, r)| Some((id, r?))) {
                if reply.send(self.table.eating).is_err() {
                    warn!("student {id} vanished after sitting down, clearing the seat");
                    self.table.arrive_to_leave();
                    self.leavers.push_back((id, None));
                    vanished = true;
                }
            }
            if !vanished {
                break;
            }
        }
    }

    fn admit(&mut self) -> (Vec<Waiter>, Vec<Waiter>) {
        let mut seated = Vec::new();
        let mut departed = Vec::new();

        loop {
            let mut progressed = false;

            while !self.table.must_wait_to_sit() {
                let Some((id, reply)) = self.eaters.pop_front() else {
                    break;
                };
                self.table.sit();
                debug!("student {id} sat down: {:?}", self.table);
                seated.push((id, reply));
                progressed = true;
            }

            while !self.table.must_wait_to_leave() {
                let Some((id, reply)) = self.leavers.pop_front() else {
                    break;
                };
                self.table.depart();
                debug!("student {id} left the table: {:?}", self.table);
                departed.push((id, reply));
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        (seated, departed)
    }
}
