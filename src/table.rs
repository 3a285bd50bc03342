// テーブルの状態 (eating, ready_to_eat, ready_to_leave)
// モニタとアービタの両方がこの状態遷移を共有する
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableState {
    pub eating: usize,         // 着席して食べている人数
    pub ready_to_eat: usize,   // トレイを持って着席待ちの人数
    pub ready_to_leave: usize, // 食べ終わって退席待ちの人数
    // 参加人数が分かっているときだけ、まだ食堂を出ていない人数 (未到着を含む)
    pub remaining: Option<usize>,
}

impl TableState {
    pub fn new() -> Self {
        TableState::default()
    }

    pub fn with_roster(students: usize) -> Self {
        TableState {
            remaining: Some(students),
            ..TableState::default()
        }
    }

    // 3 つのカウンタがすべて 0
    pub fn is_empty(&self) -> bool {
        self.eating == 0 && self.ready_to_eat == 0 && self.ready_to_leave == 0
    }

    // 誰も食べておらず、相手もいないなら着席できない
    pub fn must_wait_to_sit(&self) -> bool {
        self.eating == 0 && self.ready_to_eat < 2
    }

    // 自分が抜けると 1 人残る、かつ食べている全員がまだ退席を決めていないなら待つ
    // (eating - 1 == 1 と同じ。usize なので引き算はしない)
    // ひとりで座っているのは相方が着席待ちから起こされた直後だけ。
    // 相方が座る前に抜けると、相方は空のテーブルの前で次のペアを待つことになる
    //
    // 参加人数が分かっているなら、食堂全体で同じことを考える。
    // 自分が出ると食堂に 1 人しか残らず、その 1 人が退席待ちでもないなら待つ
    pub fn must_wait_to_leave(&self) -> bool {
        (self.eating == 2 && self.ready_to_leave < self.eating)
            || (self.eating == 1 && self.ready_to_eat > 0)
            || self
                .remaining
                .is_some_and(|r| r == 2 && self.ready_to_leave < r)
    }

    pub fn arrive_to_eat(&mut self) {
        self.ready_to_eat += 1;
    }

    pub fn sit(&mut self) {
        debug_assert!(self.ready_to_eat > 0);
        self.ready_to_eat -= 1;
        self.eating += 1;
    }

    // 着席待ちをやめる
    pub fn withdraw_eat(&mut self) {
        debug_assert!(self.ready_to_eat > 0);
        self.ready_to_eat -= 1;
    }

    pub fn arrive_to_leave(&mut self) {
        self.ready_to_leave += 1;
    }

    pub fn depart(&mut self) {
        debug_assert!(self.eating > 0 && self.ready_to_leave > 0);
        self.eating -= 1;
        self.ready_to_leave -= 1;
        if let Some(r) = self.remaining.as_mut() {
            *r -= 1;
        }
    }

    // 退席待ちをやめて座り続ける
    pub fn withdraw_leave(&mut self) {
        debug_assert!(self.ready_to_leave > 0);
        self.ready_to_leave -= 1;
    }

    // 3 人目が座ったことで、2 人のテーブルから抜けられずにいた人が抜けられる
    pub fn unblocks_leavers(&self) -> bool {
        self.eating > 2
    }

    // ひとりで座ったまま、誰も入ってこないし本人も出ようとしていない
    pub fn has_stranded_diner(&self) -> bool {
        self.eating == 1 && self.ready_to_eat == 0 && self.ready_to_leave == 0
    }

    // 退席待ちは必ず着席中の誰か
    pub fn is_consistent(&self) -> bool {
        self.ready_to_leave <= self.eating
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn state(eating: usize, ready_to_eat: usize, ready_to_leave: usize) -> TableState {
        TableState {
            eating,
            ready_to_eat,
            ready_to_leave,
            remaining: None,
        }
    }

    #[test]
    fn test_first_arrival_waits_for_a_pair() {
        let mut t = TableState::new();
        t.arrive_to_eat();
        assert!(t.must_wait_to_sit());

        t.arrive_to_eat();
        assert!(!t.must_wait_to_sit());
        t.sit();
        assert_eq!(t, state(1, 1, 0));

        // 2 人目が座るまでの一瞬だけ 1 人になるが、相手は ready_to_eat に数えられている
        assert!(!t.has_stranded_diner());
        assert!(!t.must_wait_to_sit());
        t.sit();
        assert_eq!(t, state(2, 0, 0));
    }

    #[test]
    fn test_join_running_table() {
        let mut t = state(2, 0, 0);
        t.arrive_to_eat();
        assert!(!t.must_wait_to_sit());
        t.sit();
        assert_eq!(t, state(3, 0, 0));
        assert!(t.unblocks_leavers());
    }

    #[test]
    fn test_pair_leaving_together() {
        let mut t = state(2, 0, 0);

        t.arrive_to_leave();
        assert!(t.must_wait_to_leave());

        t.arrive_to_leave();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert_eq!(t, state(1, 0, 1));
        assert!(!t.has_stranded_diner());

        // 残った 1 人は 1 - 1 == 0 なので抜けられる
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert!(t.is_empty());
    }

    #[test]
    fn test_first_leaver_of_three() {
        let mut t = state(3, 0, 0);
        t.arrive_to_leave();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert_eq!(t, state(2, 0, 0));

        t.arrive_to_leave();
        assert!(t.must_wait_to_leave());
    }

    #[test]
    fn test_newcomer_keeps_leaver_seated() {
        // 2 人とも出ようとして 1 人が抜けた直後に新しい人が座る
        let mut t = state(1, 0, 1);
        t.arrive_to_eat();
        assert!(!t.must_wait_to_sit());
        t.sit();
        assert_eq!(t, state(2, 0, 1));

        // 残っていた人は新しい人を置き去りにできない
        assert!(t.must_wait_to_leave());
    }

    #[test]
    fn test_leaver_waits_for_woken_companion() {
        // 2 人目が座って 1 人目を起こしたが、1 人目がまだロックを取れていない
        let mut t = TableState::new();
        t.arrive_to_eat();
        t.arrive_to_eat();
        t.sit();
        assert_eq!(t, state(1, 1, 0));

        // 先に座った方がすぐ食べ終わっても、相方が座るまでは出られない
        t.arrive_to_leave();
        assert!(t.must_wait_to_leave());

        t.sit();
        assert_eq!(t, state(2, 0, 1));
        assert!(t.must_wait_to_leave());

        t.arrive_to_leave();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert!(t.is_empty());
    }

    #[test]
    fn test_last_pair_waits_for_straggler() {
        // 3 人中 2 人が食べ終わったが、3 人目はまだ来ていない
        let mut t = TableState::with_roster(3);
        t.arrive_to_eat();
        t.arrive_to_eat();
        t.sit();
        t.sit();

        t.arrive_to_leave();
        assert!(t.must_wait_to_leave());
        t.arrive_to_leave();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert_eq!(t.remaining, Some(2));

        // 残った 1 人が出ると 3 人目がひとりきりになる
        assert!(t.must_wait_to_leave());

        // 3 人目はすぐ座れて、2 人で一緒に出る
        t.arrive_to_eat();
        assert!(!t.must_wait_to_sit());
        t.sit();
        assert!(t.must_wait_to_leave());
        t.arrive_to_leave();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert!(!t.must_wait_to_leave());
        t.depart();
        assert!(t.is_empty());
        assert_eq!(t.remaining, Some(0));
    }

    #[test]
    fn test_withdraw() {
        let mut t = TableState::new();
        t.arrive_to_eat();
        t.withdraw_eat();
        assert!(t.is_empty());

        let mut t = state(2, 0, 0);
        t.arrive_to_leave();
        t.withdraw_leave();
        assert_eq!(t, state(2, 0, 0));
    }

    #[test]
    fn test_consistency() {
        assert!(state(2, 0, 2).is_consistent());
        assert!(!state(1, 0, 2).is_consistent());
        assert!(state(1, 0, 0).has_stranded_diner());
    }
}
