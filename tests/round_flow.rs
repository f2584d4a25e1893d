//! End-to-end round flows through the public API: win, loss by exhaustion,
//! mid-open redirect, and round reuse.

use std::sync::Arc;
use std::time::Duration;
use treasurehunt::{
    ChestState, Currency, CurrencyLedger, EventBus, GameConfig, GameEvent, Reward, RewardSource,
    RoundController, RoundState, SelectionOutcome, WinnerPicker,
};

struct FixedReward(Reward);

impl RewardSource for FixedReward {
    fn draw(&self, _min_amount: u32, _max_amount: u32) -> Reward {
        self.0
    }
}

struct FixedWinner(usize);

impl WinnerPicker for FixedWinner {
    fn pick_winner(&self, _chest_count: usize) -> usize {
        self.0
    }
}

fn game(winner: usize, reward: Reward) -> Arc<RoundController> {
    let config = GameConfig {
        chest_count: 5,
        max_attempts: 3,
        open_duration_ms: 200,
        min_reward_amount: 10,
        max_reward_amount: 100,
    };
    Arc::new(
        RoundController::with_parts(
            config,
            Arc::new(FixedReward(reward)),
            Arc::new(FixedWinner(winner)),
            Arc::new(CurrencyLedger::new()),
            EventBus::default(),
        )
        .expect("valid config"),
    )
}

fn winner_count(game: &RoundController) -> usize {
    (0..game.chest_count())
        .filter(|&i| game.chest(i).expect("chest exists").is_winning())
        .count()
}

#[tokio::test(start_paused = true)]
async fn full_round_win_credits_ledger() {
    let reward = Reward::new(Currency::Gems, 42);
    let game = game(2, reward);
    let mut events = game.events().subscribe();
    let mut ledger_changes = game.ledger().subscribe();

    game.start_round();
    assert_eq!(game.state(), RoundState::Active);
    assert_eq!(winner_count(&game), 1);

    let outcome = game.select_chest(2).await.expect("in range");
    assert_eq!(outcome, SelectionOutcome::Won { reward });
    assert_eq!(game.state(), RoundState::Won);
    assert_eq!(game.ledger().balance(Currency::Gems), 42);

    let change = ledger_changes.try_recv().expect("ledger notified");
    assert_eq!(change.currency, Currency::Gems);
    assert_eq!(change.total, 42);

    let mut won = 0;
    while let Ok(event) = events.try_recv() {
        if let GameEvent::RoundWon { reward: r } = event {
            assert_eq!(r, reward);
            won += 1;
        }
    }
    assert_eq!(won, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausting_attempts_loses_the_round() {
    let game = game(4, Reward::new(Currency::Coins, 10));
    let mut events = game.events().subscribe();
    game.start_round();

    for (pick, expected_remaining) in [(0usize, 2u32), (1, 1), (2, 0)] {
        let outcome = game.select_chest(pick).await.expect("in range");
        assert_eq!(
            outcome,
            SelectionOutcome::Missed {
                remaining_attempts: expected_remaining
            }
        );
    }

    assert_eq!(game.state(), RoundState::Lost);
    assert_eq!(game.remaining_attempts(), 0);
    // the winning chest was never opened, nothing was credited
    assert_eq!(game.ledger().balance(Currency::Coins), 0);

    let mut attempts = Vec::new();
    let mut losses = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            GameEvent::AttemptsChanged { remaining } => attempts.push(remaining),
            GameEvent::RoundLost => losses += 1,
            _ => {}
        }
    }
    assert_eq!(attempts, vec![3, 2, 1, 0]);
    assert_eq!(losses, 1);
}

#[tokio::test(start_paused = true)]
async fn redirect_mid_open_only_settles_the_new_pick() {
    let game = game(4, Reward::new(Currency::Coins, 10));
    game.start_round();

    let first = {
        let game = game.clone();
        tokio::spawn(async move { game.select_chest(0).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        game.chest(0).expect("chest exists").state(),
        ChestState::Opening
    );

    let second = game.select_chest(1).await.expect("in range");
    assert_eq!(
        second,
        SelectionOutcome::Missed {
            remaining_attempts: 2
        }
    );

    let first = first.await.expect("task").expect("in range");
    assert_eq!(first, SelectionOutcome::Cancelled);

    // the abandoned chest is selectable again; only the settled open
    // consumed an attempt
    assert_eq!(
        game.chest(0).expect("chest exists").state(),
        ChestState::Closed
    );
    assert_eq!(
        game.chest(1).expect("chest exists").state(),
        ChestState::Opened
    );
    assert_eq!(game.remaining_attempts(), 2);
    assert_eq!(game.state(), RoundState::Active);
}

#[tokio::test(start_paused = true)]
async fn rounds_restart_cleanly_after_win_and_loss() {
    let game = game(0, Reward::new(Currency::Coins, 10));

    // round one: immediate win
    game.start_round();
    game.select_chest(0).await.expect("in range");
    assert_eq!(game.state(), RoundState::Won);

    // round two: fresh deal from the terminal state
    game.start_round();
    assert_eq!(game.state(), RoundState::Active);
    assert_eq!(game.remaining_attempts(), 3);
    assert_eq!(game.chest_states(), vec![ChestState::Closed; 5]);
    assert_eq!(winner_count(&game), 1);

    // lose round two, then restart again
    for pick in [1, 2, 3] {
        game.select_chest(pick).await.expect("in range");
    }
    assert_eq!(game.state(), RoundState::Lost);

    game.start_round();
    assert_eq!(game.state(), RoundState::Active);
    assert_eq!(game.remaining_attempts(), 3);
    assert_eq!(game.ledger().balance(Currency::Coins), 10);
}
