// Sokoban where the player writes the reward rules and an external solver searches for
// solutions under them.
// Modes: play (W/A/S/D or arrows, R reset, Q quit), replay (headless move string),
// solve (launch the solver and watch its generations), rules (edit saved rulesets),
// progress (show or reset solved levels).
// Tiles: '#' wall, 'p' player, 'b' box, 'x' target, 'B' box on target, 'P' player on target,
// '.' ground, ' ' empty.

use clap::{Parser, Subcommand};
use sokoban_rules::console_interface::{
    ConsoleInput, ConsoleTerminal, cleanup_terminal, handle_input, next_input, render_game,
    setup_terminal,
};
use sokoban_rules::core::parse_generation;
use sokoban_rules::level::{LevelMap, load_all_levels};
use sokoban_rules::models::GameRenderState;
use sokoban_rules::playback::{
    ChannelObserver, FileArtifact, PlaybackConfig, PlaybackDriver, PlaybackEvent, PlaybackHandle,
    PlaybackSettings, PlaybackState, SolverCommand, SolverProcess, TokioClock,
};
use sokoban_rules::progress::SavedProgress;
use sokoban_rules::rules::{
    ActionKind, DEFAULT_EXPLORATION_THRESHOLD, DEFAULT_GENERATIONS, RewardTable, RuleSource,
    Ruleset, RulesetStore, SolverParameters,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const PLAY_CONTROLS: &str = "Controls: WASD or Arrow keys to move, R to reset, Q to quit";
const SOLVE_CONTROLS: &str = "Controls: +/- speed, Space pause, M menu, Q stop";
const INPUT_POLL: Duration = Duration::from_millis(50);
const MAX_SPEED: f32 = 16.0;
const MIN_SPEED: f32 = 0.125;

#[derive(Parser)]
#[command(name = "sokoban_rules", about = "Sokoban with player-authored solver rewards")]
struct Cli {
    /// Directory holding the numbered level files.
    #[arg(long, default_value = "levels")]
    levels: PathBuf,
    #[arg(long, default_value = "save/progress.json")]
    progress: PathBuf,
    #[arg(long, default_value = "rulesets")]
    rulesets: PathBuf,
    /// JSON file overriding playback timings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where logs go while the terminal UI is active.
    #[arg(long, default_value = "sokoban_rules.log")]
    log_file: PathBuf,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Play a level with the keyboard.
    Play {
        /// Defaults to the first unsolved level.
        #[arg(long)]
        level: Option<usize>,
    },
    /// Apply a move string to a level and print the result.
    Replay {
        #[arg(long)]
        level: usize,
        #[arg(long)]
        moves: String,
    },
    /// Run the solver under a ruleset and watch its generations.
    Solve(SolveArgs),
    /// Manage saved rulesets.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Show or reset which levels are solved.
    Progress {
        #[command(subcommand)]
        command: ProgressCommand,
    },
}

#[derive(Subcommand)]
enum ProgressCommand {
    Show,
    /// Mark every level unsolved again.
    Reset,
}

#[derive(clap::Args)]
struct SolveArgs {
    #[arg(long)]
    level: Option<usize>,
    /// Solver executable, e.g. a Python interpreter.
    #[arg(long)]
    solver: PathBuf,
    /// Script passed as the solver's first argument.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Saved ruleset to reward the solver with. Without one the auto-saved rules are used.
    #[arg(long, conflicts_with = "solution")]
    ruleset: Option<String>,
    /// Use the reference rules shipped with the level as `<number>.solution`.
    #[arg(long)]
    solution: bool,
    #[arg(long, default_value_t = DEFAULT_GENERATIONS)]
    generations: u32,
    #[arg(long, default_value_t = DEFAULT_EXPLORATION_THRESHOLD)]
    exploration_threshold: f32,
    /// Directory for the parameters file and the solver output.
    #[arg(long, default_value = "ai")]
    work_dir: PathBuf,
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
}

#[derive(Subcommand)]
enum RulesCommand {
    List,
    /// Set the reward for an action code (0 empty space, 1 wall, 2 push, 3 win, 4 blocked push).
    Set {
        name: String,
        #[arg(value_parser = parse_action)]
        action: ActionKind,
        #[arg(allow_hyphen_values = true)]
        reward: i32,
    },
    Remove {
        name: String,
        #[arg(value_parser = parse_action)]
        action: ActionKind,
    },
    Delete {
        name: String,
    },
}

fn parse_action(value: &str) -> Result<ActionKind, String> {
    let code = value
        .parse::<u8>()
        .map_err(|_| format!("'{}' is not an action code", value))?;
    ActionKind::try_from(code).map_err(|err| err.to_string())
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sokoban_rules=info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let uses_terminal = matches!(cli.mode, Mode::Play { .. } | Mode::Solve(_));
    init_logging(uses_terminal.then_some(cli.log_file.as_path()))?;

    let config = match &cli.config {
        Some(path) => PlaybackConfig::load(path)?,
        None => PlaybackConfig::default(),
    };
    let mut progress = SavedProgress::load(&cli.progress)?;

    match &cli.mode {
        Mode::Play { level } => {
            let level = pick_level(&cli.levels, *level, &progress)?;
            let mut terminal = setup_terminal()?;
            let result = run_interactive(&level, &mut progress, &cli.progress, &mut terminal);
            cleanup_terminal()?;
            result?;
        }
        Mode::Replay { level, moves } => {
            let level = LevelMap::load(&cli.levels, *level)?;
            run_replay(&level, moves)?;
        }
        Mode::Solve(args) => {
            let level = pick_level(&cli.levels, args.level, &progress)?;
            let source = match &args.ruleset {
                _ if args.solution => RuleSource::LevelSolution {
                    levels_dir: &cli.levels,
                    level: level.number,
                },
                Some(name) => RuleSource::Named(name),
                None => RuleSource::AutoSave,
            };
            let rewards = RulesetStore::new(&cli.rulesets).select(source)?;
            let mut terminal = setup_terminal()?;
            let result = run_solve(
                &cli,
                args,
                &level,
                rewards,
                config,
                &mut progress,
                &mut terminal,
            )
            .await;
            cleanup_terminal()?;
            if let Some(message) = result? {
                println!("{}", message);
            }
        }
        Mode::Rules { command } => run_rules(&RulesetStore::new(&cli.rulesets), command)?,
        Mode::Progress { command } => run_progress(&cli, &mut progress, command)?,
    }

    Ok(())
}

fn pick_level(
    dir: &Path,
    number: Option<usize>,
    progress: &SavedProgress,
) -> Result<LevelMap, Box<dyn std::error::Error>> {
    if let Some(number) = number {
        return Ok(LevelMap::load(dir, number)?);
    }
    let mut levels = load_all_levels(dir);
    if levels.is_empty() {
        return Err(format!("no levels found in {}", dir.display()).into());
    }
    let index = progress.first_unsolved(levels.len()) - 1;
    Ok(levels.swap_remove(index))
}

fn level_title(level: &LevelMap) -> String {
    format!("Level {}: {}", level.number, level.name)
}

fn run_interactive(
    level: &LevelMap,
    progress: &mut SavedProgress,
    progress_path: &Path,
    terminal: &mut ConsoleTerminal,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = level.to_world()?;
    let mut render = GameRenderState {
        title: level_title(level),
        map: world.to_map_string(),
        won: false,
        error: None,
        last_change: None,
        status: level.instructions.lines().next().map(str::to_string),
    };
    render_game(terminal, &render, PLAY_CONTROLS)?;

    loop {
        match handle_input(INPUT_POLL)? {
            ConsoleInput::Quit => break,
            ConsoleInput::Reset => {
                world.reset()?;
                render.last_change = None;
                render.error = None;
            }
            ConsoleInput::Move(direction) => match world.make_move(direction) {
                Ok(outcome) => {
                    render.last_change = Some(outcome);
                    render.error = None;
                }
                Err(err) => render.error = Some(err.to_string()),
            },
            _ => continue,
        }

        render.map = world.to_map_string();
        render.won = world.is_solved();
        render_game(terminal, &render, PLAY_CONTROLS)?;

        if render.won {
            if progress.mark_solved(level.number) {
                progress.save(progress_path)?;
            }
            info!(level = level.number, "level solved by hand");
            // Keep showing the win screen until user inputs
            wait_for_key()?;
            break;
        }
    }

    Ok(())
}

fn wait_for_key() -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match handle_input(INPUT_POLL)? {
            ConsoleInput::Timeout => {}
            _ => return Ok(()),
        }
    }
}

fn run_replay(level: &LevelMap, moves: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = level.to_world()?;
    let (directions, invalid) = parse_generation(moves);
    for skipped in invalid {
        warn!(index = skipped.index, "skipping unrecognised move {:?}", skipped.symbol);
    }

    let mut accepted = 0;
    for direction in directions {
        if world.make_move(direction)?.is_accepted() {
            accepted += 1;
        }
        if world.is_solved() {
            break;
        }
    }

    println!("{}", world.to_map_string());
    println!(
        "{} moves accepted, {}/{} boxes on targets, solved: {}",
        accepted,
        world.boxes_on_targets(),
        world.box_count(),
        world.is_solved()
    );
    Ok(())
}

/// Returns a message describing how the session ended.
async fn run_solve(
    cli: &Cli,
    args: &SolveArgs,
    level: &LevelMap,
    rewards: RewardTable,
    config: PlaybackConfig,
    progress: &mut SavedProgress,
    terminal: &mut ConsoleTerminal,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut params = SolverParameters::new(level.number, &rewards);
    params.num_generations = args.generations;
    params.exploration_threshold = args.exploration_threshold;
    let params_path = args.work_dir.join("parameters.json");
    params.write_to(&params_path)?;

    let command = SolverCommand {
        program: args.solver.clone(),
        script: args.script.clone(),
        params_path,
        out_path: args.work_dir.join("ai-out.txt"),
        levels_dir: cli.levels.clone(),
    };
    let solver = SolverProcess::launch(&command).await?;

    let settings = PlaybackSettings::new(args.speed);
    let (sender, mut events) = mpsc::unbounded_channel();
    let driver = PlaybackDriver::new(
        level.to_world()?,
        config,
        Arc::clone(&settings),
        TokioClock::new(),
        FileArtifact::new(&command.out_path),
        ChannelObserver::new(sender),
    )
    .with_solver(Box::new(solver))
    .with_rewards(rewards);
    let mut handle = PlaybackHandle::spawn(driver);

    let mut render = GameRenderState {
        title: level_title(level),
        map: level.to_world()?.to_map_string(),
        won: false,
        error: None,
        last_change: None,
        status: Some("Waiting for solver".to_string()),
    };
    let mut generation = 0;
    let mut resume_speed = args.speed;

    let outcome = 'session: loop {
        while let Ok(event) = events.try_recv() {
            match event {
                PlaybackEvent::StateChanged(state) => {
                    render.status = Some(match state {
                        PlaybackState::AwaitingArtifact => "Waiting for solver".to_string(),
                        PlaybackState::Polling => format!("Generation {} | waiting for next", generation),
                        PlaybackState::PlayingGeneration { generation } => format!("Generation {}", generation),
                        PlaybackState::Paused { generation } => format!("Generation {} | paused", generation),
                        PlaybackState::Done => "Done".to_string(),
                        PlaybackState::Failed => "Failed".to_string(),
                    });
                }
                PlaybackEvent::GenerationStarted { generation: started, map } => {
                    generation = started;
                    render.map = map;
                    render.last_change = None;
                    render.error = None;
                }
                PlaybackEvent::Moved { outcome, map, .. } => {
                    render.map = map;
                    render.last_change = Some(outcome);
                }
                PlaybackEvent::InvalidMove { invalid, .. } => {
                    render.error = Some(format!("skipped move {:?}", invalid.symbol));
                }
                PlaybackEvent::Solved { generation } => {
                    render.won = true;
                    info!(level = level.number, generation, "level solved by solver");
                    if progress.mark_solved(level.number) {
                        progress.save(&cli.progress)?;
                    }
                }
                PlaybackEvent::GenerationFinished(summary) => {
                    render.status = Some(format!(
                        "Generation {} | reward {} | {} moves",
                        summary.generation, summary.reward, summary.moves_applied
                    ));
                }
                PlaybackEvent::Reset { map } => {
                    render.map = map;
                    render.won = false;
                }
                PlaybackEvent::Finished(result) => break 'session result,
            }
        }
        if !handle.is_playing() {
            // the task ended without delivering its report
            break match handle.finish().await {
                Some(result) => result.map_err(|err| err.to_string()),
                None => Err("playback ended without a report".to_string()),
            };
        }
        render_game(terminal, &render, SOLVE_CONTROLS)?;

        match next_input(INPUT_POLL).await? {
            ConsoleInput::Quit => handle.cancel(),
            ConsoleInput::SpeedUp => settings.set_speed((settings.speed().max(MIN_SPEED) * 2.0).min(MAX_SPEED)),
            ConsoleInput::SlowDown => settings.set_speed((settings.speed() / 2.0).max(MIN_SPEED)),
            ConsoleInput::TogglePause => {
                if settings.speed() > 0.0 {
                    resume_speed = settings.speed();
                    settings.set_speed(0.0);
                } else {
                    settings.set_speed(resume_speed);
                }
            }
            ConsoleInput::ToggleMenu => settings.set_menu_open(!settings.is_menu_open()),
            _ => {}
        }
    };
    let _ = handle.finish().await;

    let message = match outcome {
        Ok(report) => format!(
            "Played {} generations, solved: {}",
            report.generations_played, report.solved
        ),
        Err(reason) => format!("Playback ended: {}", reason),
    };
    render.status = Some(message.clone());
    render_game(terminal, &render, "Press any key to exit")?;
    while next_input(INPUT_POLL).await? == ConsoleInput::Timeout {}
    Ok(Some(message))
}

fn run_rules(store: &RulesetStore, command: &RulesCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        RulesCommand::List => {
            println!("Rulesets in {}", store.dir().display());
            for ruleset in store.load_all()? {
                println!("{}", ruleset.name);
                for rule in &ruleset.rules {
                    println!("  {:>4}  {}", rule.reward, rule.action.description());
                }
                for action in ruleset.rewards().unassigned() {
                    println!("     -  {}", action.description());
                }
            }
        }
        RulesCommand::Set { name, action, reward } => {
            let mut rewards = load_rewards(store, name)?;
            rewards.set(*action, *reward);
            store.save(&Ruleset::new(name.as_str(), &rewards))?;
        }
        RulesCommand::Remove { name, action } => {
            let mut rewards = load_rewards(store, name)?;
            if rewards.remove(*action).is_none() {
                warn!("ruleset '{}' had no reward for {:?}", name, action);
            }
            store.save(&Ruleset::new(name.as_str(), &rewards))?;
        }
        RulesCommand::Delete { name } => {
            if !store.delete(name)? {
                warn!("ruleset '{}' not found", name);
            }
        }
    }
    Ok(())
}

fn load_rewards(store: &RulesetStore, name: &str) -> Result<RewardTable, Box<dyn std::error::Error>> {
    Ok(store
        .load(name)?
        .map(|ruleset| ruleset.rewards())
        .unwrap_or_default())
}

fn run_progress(
    cli: &Cli,
    progress: &mut SavedProgress,
    command: &ProgressCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ProgressCommand::Show => {
            let levels = load_all_levels(&cli.levels);
            for level in &levels {
                let mark = if progress.is_solved(level.number) { "x" } else { " " };
                println!("[{}] {}", mark, level_title(level));
            }
            println!("Next unsolved: level {}", progress.first_unsolved(levels.len()));
        }
        ProgressCommand::Reset => {
            progress.reset();
            progress.save(&cli.progress)?;
            info!("progress reset");
        }
    }
    Ok(())
}
