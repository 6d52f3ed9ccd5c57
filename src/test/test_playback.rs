#[cfg(test)]
mod test {
    use crate::core::{Direction, Direction::*, GridWorld, InvalidMove, MoveOutcome};
    use crate::playback::*;
    use crate::rules::{ActionKind, RewardTable};
    use crate::test::fakes::{FakeSolver, ManualClock, RecordingObserver, ScriptedSource, Step};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    // the box is out of the player's reach, so no move string solves this level
    const CORRIDOR: &str = "#####\n#..b#\n#.#.#\n#p#x#\n#####";

    type TestDriver = PlaybackDriver<ManualClock, ScriptedSource, RecordingObserver>;

    fn driver_with(level: &str, script: Vec<Step>, observer: RecordingObserver) -> TestDriver {
        PlaybackDriver::new(
            GridWorld::from_map_string(level).unwrap(),
            PlaybackConfig::default(),
            PlaybackSettings::new(1.0),
            ManualClock::new(),
            ScriptedSource::new(script),
            observer,
        )
    }

    fn driver(level: &str, script: Vec<Step>) -> TestDriver {
        driver_with(level, script, RecordingObserver::new())
    }

    #[tokio::test]
    async fn plays_each_new_generation_until_sentinel() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Missing,
            Step::Text("UU\n"),
            Step::Text("UU\nUD\n"),
            Step::Text("UU\nUD\nEND"),
        ]);

        let report = driver.run().await.unwrap();

        assert_eq!(report, PlaybackReport { generations_played: 2, last_generation: Some(2), solved: false });
        let observer = driver.observer();
        assert_eq!(observer.generations, vec![1, 2]);
        assert_eq!(observer.moves.len(), 4);
        assert_eq!(observer.states, vec![
            PlaybackState::Polling,
            PlaybackState::PlayingGeneration { generation: 1 },
            PlaybackState::Polling,
            PlaybackState::PlayingGeneration { generation: 2 },
            PlaybackState::Polling,
            PlaybackState::Done,
        ]);
        assert_eq!(observer.finished, Some(Ok(report)));
        assert_eq!(driver.state(), PlaybackState::Done);
    }

    #[tokio::test]
    async fn sentinel_plays_generation_that_was_never_shown() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Text("UU\n"),
            Step::Text("UU\nUD\nEND"),
        ]);

        let report = driver.run().await.unwrap();

        assert_eq!(report.generations_played, 2);
        assert_eq!(driver.observer().generations, vec![1, 2]);
    }

    #[tokio::test]
    async fn partial_line_waits_for_its_newline() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Text("U"),
            Step::Text("UU\nU"),
            Step::Text("UU\nUD\n"),
            Step::Text("UU\nUD\nEND"),
        ]);

        driver.run().await.unwrap();

        assert_eq!(driver.observer().generations, vec![1, 2]);
        assert_eq!(driver.observer().summaries[1].moves_applied, 2);
    }

    #[tokio::test]
    async fn only_newest_of_several_new_lines_is_played() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Text("U\nUU\nD\n"),
            Step::Text("U\nUU\nD\nEND"),
        ]);

        let report = driver.run().await.unwrap();

        assert_eq!(driver.observer().generations, vec![3]);
        assert_eq!(report.last_generation, Some(3));
    }

    #[tokio::test]
    async fn world_is_reset_after_each_generation_and_at_end() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Text("UU\n"),
            Step::Text("UU\nEND"),
        ]);
        let start = driver.world().clone();

        driver.run().await.unwrap();

        assert_eq!(driver.world(), &start);
        // once after the generation, once during cleanup
        assert_eq!(driver.observer().resets, 2);
    }

    #[tokio::test]
    async fn missing_output_means_solver_did_not_start() {
        let mut driver = driver(CORRIDOR, vec![Step::Missing]);

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::SolverDidNotStart), "got {:?}", err);
        assert_eq!(driver.state(), PlaybackState::Failed);
        assert!(driver.observer().generations.is_empty());
    }

    #[tokio::test]
    async fn output_that_stays_empty_times_out() {
        let mut driver = driver(CORRIDOR, vec![Step::Missing, Step::Text("")]);

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::ArtifactEmpty), "got {:?}", err);
    }

    #[tokio::test]
    async fn output_that_stays_locked_times_out() {
        let mut driver = driver(CORRIDOR, vec![Step::Locked]);

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::ArtifactUnreadable), "got {:?}", err);
    }

    #[tokio::test]
    async fn locked_output_is_retried() {
        let mut driver = driver(CORRIDOR, vec![
            Step::Locked,
            Step::Text("UU\n"),
            Step::Locked,
            Step::Text("UU\nEND"),
        ]);

        let report = driver.run().await.unwrap();

        assert_eq!(report.generations_played, 1);
    }

    #[tokio::test]
    async fn no_new_generation_reports_stall() {
        let mut driver = driver(CORRIDOR, vec![Step::Text("UU\n")]);

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::Stalled { generation: Some(1) }), "got {:?}", err);
        assert_eq!(driver.observer().generations, vec![1]);
    }

    #[tokio::test]
    async fn invalid_characters_are_skipped() {
        let mut driver = driver("#p.#\n#bx#", vec![
            Step::Text("R?L\n"),
            Step::Text("R?L\nEND"),
        ]);

        driver.run().await.unwrap();

        let observer = driver.observer();
        assert_eq!(observer.invalid, vec![InvalidMove { index: 1, symbol: '?' }]);
        assert_eq!(observer.moves, vec![(Right, MoveOutcome::Walked), (Left, MoveOutcome::Walked)]);
        assert_eq!(observer.summaries[0].invalid_moves, 1);
        assert_eq!(observer.summaries[0].moves_applied, 2);
    }

    #[tokio::test]
    async fn solve_is_reported_once_and_ends_generation_early() {
        let mut driver = driver("#pbx#", vec![
            Step::Text("RRL\n"),
            Step::Text("RRL\nR\n"),
            Step::Text("RRL\nR\nEND"),
        ]);

        let report = driver.run().await.unwrap();

        let observer = driver.observer();
        assert!(report.solved);
        assert_eq!(observer.solved, vec![1]);
        assert_eq!(observer.summaries[0].moves_applied, 1);
        assert!(observer.summaries[0].solved);
        assert!(observer.summaries[1].solved);
        assert!(!driver.world().is_solved());
    }

    #[tokio::test]
    async fn generation_reward_follows_rules() {
        let mut rewards = RewardTable::new();
        rewards.set(ActionKind::MoveIntoWall, -10);
        rewards.set(ActionKind::EmptySpace, -1);
        rewards.set(ActionKind::MoveBox, 5);
        rewards.set(ActionKind::WinGame, 100);
        let mut driver = driver("#p.b.x#", vec![
            Step::Text("LRRR\n"),
            Step::Text("LRRR\nEND"),
        ])
        .with_rewards(rewards);

        driver.run().await.unwrap();

        assert_eq!(driver.observer().summaries[0].reward, 94);
    }

    #[tokio::test]
    async fn cancel_before_start_cleans_up() {
        let solver = FakeSolver::running();
        let mut driver = driver(CORRIDOR, vec![Step::Text("UU\n")])
            .with_solver(Box::new(solver.clone()));
        driver.cancel_flag().cancel();

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::Cancelled));
        assert_eq!(driver.state(), PlaybackState::Done);
        assert!(solver.was_killed());
        assert_eq!(driver.observer().finished, Some(Err("playback cancelled".to_string())));
    }

    #[tokio::test]
    async fn cancel_during_generation_resets_level_and_kills_solver() {
        let solver = FakeSolver::running();
        let flag = CancelFlag::new();
        let mut driver = driver_with(
            CORRIDOR,
            vec![Step::Text("UUDD\n")],
            RecordingObserver::cancel_after_moves(1, flag.clone()),
        )
        .with_cancel_flag(flag)
        .with_solver(Box::new(solver.clone()));
        let start = driver.world().clone();

        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, PlaybackError::Cancelled));
        assert_eq!(driver.observer().moves, vec![(Up, MoveOutcome::Walked)]);
        assert!(driver.observer().summaries.is_empty());
        assert_eq!(driver.world(), &start);
        assert!(solver.was_killed());
    }

    #[tokio::test]
    async fn solver_exit_before_output_reports_diagnostics() {
        let solver = FakeSolver::exited(1, "Traceback: level file not found\n");
        let mut driver = driver(CORRIDOR, vec![Step::Missing])
            .with_solver(Box::new(solver.clone()));

        let err = driver.run().await.unwrap_err();

        match err {
            PlaybackError::SolverError { status, diagnostics } => {
                assert_eq!(status, "exit code 1");
                assert_eq!(diagnostics, "Traceback: level file not found");
            }
            other => panic!("expected solver error, got {:?}", other),
        }
        assert!(!solver.was_killed());
    }

    #[tokio::test]
    async fn solver_exit_mid_run_fails_after_last_lines_are_played() {
        let solver = FakeSolver::exited(2, "");
        let mut driver = driver(CORRIDOR, vec![Step::Text("UU\n")])
            .with_solver(Box::new(solver));

        let err = driver.run().await.unwrap_err();

        assert!(
            matches!(&err, PlaybackError::SolverError { diagnostics, .. } if diagnostics == "no diagnostics"),
            "got {:?}",
            err
        );
        assert_eq!(driver.observer().generations, vec![1]);
    }

    #[tokio::test]
    async fn handle_cancel_is_idempotent() {
        let mut idle = PlaybackHandle::idle();
        idle.cancel();
        idle.cancel();
        assert!(!idle.is_playing());
        assert!(idle.finish().await.is_none());

        let solver = FakeSolver::running();
        let driver = driver(CORRIDOR, vec![Step::Missing]).with_solver(Box::new(solver.clone()));
        let mut handle = PlaybackHandle::spawn(driver);
        handle.cancel();
        handle.cancel();

        let result = handle.finish().await;

        assert!(matches!(result, Some(Err(PlaybackError::Cancelled))), "got {:?}", result);
        assert!(solver.was_killed());
        handle.cancel();
        assert!(handle.finish().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_playback_holds_until_resumed() {
        let settings = PlaybackSettings::new(0.0);
        let (sender, mut events) = mpsc::unbounded_channel();
        let config = PlaybackConfig {
            stall_timeout: Duration::from_secs(5),
            ..PlaybackConfig::default()
        };
        let driver = PlaybackDriver::new(
            GridWorld::from_map_string(CORRIDOR).unwrap(),
            config,
            Arc::clone(&settings),
            TokioClock::new(),
            ScriptedSource::new(vec![Step::Text("UU\n"), Step::Text("UU\nEND")]),
            ChannelObserver::new(sender),
        );
        let mut handle = PlaybackHandle::spawn(driver);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&PlaybackEvent::StateChanged(PlaybackState::Paused { generation: 1 })));
        assert!(!seen.iter().any(|event| matches!(event, PlaybackEvent::Moved { .. })));

        settings.set_speed(1.0);
        let report = handle.finish().await.unwrap().unwrap();

        assert_eq!(report.generations_played, 1);
        let mut moves = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, PlaybackEvent::Moved { .. }) {
                moves += 1;
            }
        }
        assert_eq!(moves, 2);
    }

    #[tokio::test]
    async fn plays_from_log_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai-out.txt");
        std::fs::write(&path, "LR\nUU\nEND").unwrap();
        let mut driver = PlaybackDriver::new(
            GridWorld::from_map_string(CORRIDOR).unwrap(),
            PlaybackConfig::default(),
            PlaybackSettings::new(2.0),
            ManualClock::new(),
            FileArtifact::new(&path),
            RecordingObserver::new(),
        );

        let report = driver.run().await.unwrap();

        assert_eq!(report, PlaybackReport { generations_played: 1, last_generation: Some(2), solved: false });
        assert_eq!(driver.observer().moves, vec![(Up, MoveOutcome::Walked), (Up, MoveOutcome::Walked)]);
    }

    /// Spawns a session on the tokio clock with a running fake solver.
    fn spawn_on_tokio_clock(
        level: &str,
        script: Vec<Step>,
        config: PlaybackConfig,
        speed: f32,
    ) -> (PlaybackHandle, FakeSolver) {
        let solver = FakeSolver::running();
        let driver = PlaybackDriver::new(
            GridWorld::from_map_string(level).unwrap(),
            config,
            PlaybackSettings::new(speed),
            TokioClock::new(),
            ScriptedSource::new(script),
            NullObserver,
        )
        .with_solver(Box::new(solver.clone()));
        (PlaybackHandle::spawn(driver), solver)
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_solved_linger() {
        let config = PlaybackConfig {
            solved_linger: Duration::from_secs(30),
            ..PlaybackConfig::default()
        };
        let (mut handle, solver) = spawn_on_tokio_clock("#pbx#", vec![Step::Text("R\n")], config, 1.0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_playing());
        let cancelled_at = tokio::time::Instant::now();

        handle.cancel();
        let result = tokio::time::timeout(Duration::from_secs(3), handle.finish())
            .await
            .expect("session kept lingering after cancel");

        assert!(matches!(result, Some(Err(PlaybackError::Cancelled))), "got {:?}", result);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
        assert!(solver.was_killed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_slow_move_delay() {
        let (mut handle, solver) =
            spawn_on_tokio_clock(CORRIDOR, vec![Step::Text("UD\n")], PlaybackConfig::default(), 1e-6);
        tokio::time::sleep(Duration::from_millis(200)).await;

        handle.cancel();
        let result = tokio::time::timeout(Duration::from_secs(3), handle.finish())
            .await
            .expect("session kept waiting between moves after cancel");

        assert!(matches!(result, Some(Err(PlaybackError::Cancelled))), "got {:?}", result);
        assert!(solver.was_killed());
    }

    struct PanicOnMove;

    impl PlaybackObserver for PanicOnMove {
        fn on_move(&mut self, _direction: Direction, _outcome: MoveOutcome, _world: &GridWorld) {
            panic!("observer failed");
        }
    }

    #[tokio::test]
    async fn panicking_session_is_reported_as_aborted() {
        let driver = PlaybackDriver::new(
            GridWorld::from_map_string(CORRIDOR).unwrap(),
            PlaybackConfig::default(),
            PlaybackSettings::new(1.0),
            ManualClock::new(),
            ScriptedSource::new(vec![Step::Text("UU\n")]),
            PanicOnMove,
        );
        let mut handle = PlaybackHandle::spawn(driver);

        // no Finished event ever arrives, so a caller has to notice the task is gone
        tokio::time::timeout(Duration::from_secs(3), async {
            while handle.is_playing() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("panicked session still reported as playing");
        let result = handle.finish().await;

        assert!(matches!(result, Some(Err(PlaybackError::Aborted(_)))), "got {:?}", result);
        assert!(handle.finish().await.is_none());
    }
}
