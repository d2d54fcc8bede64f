use tetris_duel::{Action, GameOverEvent, GameOverFlow, GameOverStage};

#[test]
fn initials_entry() {
    let mut flow = GameOverFlow::new(true);
    assert_eq!(flow.stage(), GameOverStage::EnteringInitials);
    assert_eq!(flow.initials(), "AAA");

    assert_eq!(flow.handle(Action::MoveLeft), None);
    assert_eq!(flow.initials(), "ZAA");
    assert_eq!(flow.handle(Action::HardDrop), None);
    assert_eq!(flow.handle(Action::Rotate), None);
    assert_eq!(flow.cursor(), 1);
    flow.handle(Action::MoveRight);
    flow.handle(Action::MoveRight);
    flow.handle(Action::Rotate);
    assert_eq!(
        flow.handle(Action::Rotate),
        Some(GameOverEvent::InitialsEntered("ZCA".to_string()))
    );
    assert_eq!(flow.stage(), GameOverStage::AwaitingLeaderboard);
}

#[test]
fn leaderboard_then_restart() {
    let mut flow = GameOverFlow::new(false);
    assert_eq!(flow.stage(), GameOverStage::AwaitingLeaderboard);
    assert_eq!(flow.handle(Action::MoveLeft), None);
    assert_eq!(flow.handle(Action::Rotate), None);
    assert_eq!(flow.stage(), GameOverStage::ShowingLeaderboard);
    assert_eq!(flow.handle(Action::Rotate), Some(GameOverEvent::RestartRequested));
}
