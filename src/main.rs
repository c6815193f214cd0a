use std::{path::PathBuf, thread};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use env_logger::Env;
use log::{warn, LevelFilter};

use fll_sim::{
    config::{load_map, profile_key, save_profile, Catalog, ScriptFile},
    controller::{Command, CommandEvent, DriveBase},
    domain::{GameMap, MissionEventKind, MissionStatus, Robot},
    plot::plot_field,
    simulator::{SimEvent, Simulator},
};

#[derive(Parser)]
#[command(name = "fll-sim", about = "First Lego League robot simulator", version)]
struct Cli {
    /// Log debug messages, `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Directory with preset tables extending the built-in ones.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Runs a script on a map and reports the score.
    Run(RunArgs),
    /// Lists the available presets.
    Presets {
        #[arg(long)]
        json: bool,
    },
    /// Saves a profile with all presets inlined into `<config-dir>/profiles/`.
    SaveProfile(SaveProfileArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value = "intermediate")]
    profile: String,
    /// Robot preset replacing the profile's robot.
    #[arg(long)]
    robot: Option<String>,
    /// Simulation preset replacing the profile's settings.
    #[arg(long)]
    simulation: Option<String>,
    #[arg(long)]
    season: Option<String>,
    /// Map file, the demo field if omitted.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Script file, the demo run if omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Start position on the map.
    #[arg(long)]
    start: Option<String>,
    /// Simulated seconds to run at most.
    #[arg(long, default_value_t = 60.0)]
    duration: f64,
    /// Enables the match countdown of the season.
    #[arg(long)]
    competition: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// Paces the run by the real time factor of the simulation settings.
    #[arg(long)]
    realtime: bool,
    /// Draws the field and the driven path.
    #[arg(long)]
    plot: bool,
    /// Prints the final state as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SaveProfileArgs {
    /// Profile to start from.
    base: String,
    /// Display name of the new profile.
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    robot: Option<String>,
    #[arg(long)]
    simulation: Option<String>,
    #[arg(long)]
    pybricks: Option<String>,
    #[arg(long)]
    season: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = match &cli.config_dir {
        Some(dir) => Catalog::builtin()?
            .with_overrides_from(dir)
            .with_context(|| format!("load presets from {}", dir.display()))?,
        None => Catalog::builtin()?.clone(),
    };

    match cli.command {
        CliCommand::Run(args) => run(&catalog, args),
        CliCommand::Presets { json } => presets(&catalog, json),
        CliCommand::SaveProfile(args) => {
            let dir = cli.config_dir.unwrap_or_else(|| PathBuf::from("configs"));
            save(&catalog, args, dir)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn run(catalog: &Catalog, args: RunArgs) -> Result<()> {
    let profile = catalog
        .profile(&args.profile)
        .context("resolve profile")?;
    let robot_config = match &args.robot {
        Some(name) => catalog.robot(name)?,
        None => profile.robot.clone(),
    };
    let mut sim_config = match &args.simulation {
        Some(name) => catalog.simulation(name)?,
        None => profile.simulation.clone(),
    };
    if args.seed.is_some() {
        sim_config.seed = args.seed;
    }
    let season = catalog.season(args.season.as_deref().unwrap_or(&profile.season))?;

    let map = match &args.map {
        Some(path) => load_map(path).with_context(|| format!("load map {}", path.display()))?,
        None => GameMap::demo(),
    };
    let script = match &args.script {
        Some(path) => {
            ScriptFile::load(path).with_context(|| format!("load script {}", path.display()))?
        }
        None => ScriptFile::default(),
    };

    let pybricks = match &script.pybricks {
        Some(name) => catalog.pybricks(name)?,
        None => profile.pybricks.clone(),
    };
    let mut drive_base = DriveBase::new(pybricks, &robot_config);
    let commands = if script.steps.is_empty() {
        demo_commands(&drive_base)
    } else {
        script.commands(&mut drive_base)
    };

    let start = args
        .start
        .as_deref()
        .or(script.start.as_deref())
        .unwrap_or("home");
    if !map.start_positions().contains_key(start) {
        warn!("unknown start position '{start}', starting at the field centre");
    }
    let robot = Robot::new(map.starting_position(start), robot_config);

    let show_debug = sim_config.show_debug_info;
    let frame_delay = sim_config.frame_delay().filter(|_| args.realtime);
    let dt = sim_config.dt();
    let mut sim = Simulator::new(robot, map, sim_config);
    if args.competition || profile.feature("competition_timer") {
        sim = sim.with_competition(Some(season.time_limit));
    }
    sim.push_commands(commands);

    if !args.json {
        println!(
            "{} {} on {} ({}), seed {}",
            style("fll-sim").bold(),
            profile.name,
            season.name,
            season.theme,
            sim.seed()
        );
    }

    while !sim.is_stopped() && sim.time() < args.duration {
        let events = sim.step(dt);
        if !args.json {
            for event in &events {
                print_event(event, sim.time(), show_debug);
            }
        }
        if let Some(delay) = frame_delay {
            thread::sleep(delay);
        }
        if sim.controller().is_idle() && sim.robot().is_stopped() {
            break;
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sim.state())?);
    } else {
        print_summary(&sim, profile.feature("show_sensor_readings") || show_debug);
    }
    if args.plot {
        println!("{}", plot_field(sim.map(), sim.trajectory()));
    }
    Ok(())
}

/// Visits the red zone of the demo field from the home position.
fn demo_commands(drive_base: &DriveBase) -> Vec<Command> {
    vec![
        drive_base.straight(400.0),
        Command::Wait { duration: 2.5 },
        drive_base.turn(-90.0),
        drive_base.straight(250.0),
        drive_base.turn(90.0),
        drive_base.straight(300.0),
        Command::Stop,
    ]
}

fn print_event(event: &SimEvent, time: f64, debug: bool) {
    let stamp = style(format!("{time:>7.2}s")).dim();
    match event {
        SimEvent::Command(CommandEvent::Started(command)) if debug => {
            println!("{stamp} {} {command}", style("start").cyan())
        }
        SimEvent::Command(CommandEvent::Finished(command)) if debug => {
            println!("{stamp} {} {command}", style("done").cyan())
        }
        SimEvent::Command(CommandEvent::Stalled(command)) => {
            println!("{stamp} {} {command}", style("stalled").yellow())
        }
        SimEvent::Collision { obstacle } if debug => {
            println!("{stamp} {} {obstacle}", style("blocked by").yellow())
        }
        SimEvent::Mission(mission) => match &mission.kind {
            MissionEventKind::Completed { points } => println!(
                "{stamp} {} {} (+{points})",
                style("completed").green().bold(),
                mission.mission
            ),
            MissionEventKind::Failed { reason } => println!(
                "{stamp} {} {}: {reason}",
                style("failed").red(),
                mission.mission
            ),
            MissionEventKind::TimedOut => {
                println!("{stamp} {} {}", style("timed out").red(), mission.mission)
            }
            _ => {}
        },
        SimEvent::CompetitionOver { score } => {
            println!("{stamp} {} score {score}", style("time is up").bold())
        }
        _ => {}
    }
}

fn print_summary(sim: &Simulator, readings: bool) {
    let state = sim.state();
    println!();
    println!(
        "{} after {:.2} s: ({:.1}, {:.1}) heading {:.1}°, {:.0} mm driven",
        style("Robot").bold(),
        state.time,
        state.robot.x,
        state.robot.y,
        state.robot.heading,
        state.robot.distance_travelled
    );
    for mission in sim.map().missions() {
        let line = match mission.status() {
            MissionStatus::Completed => style(mission.to_string()).green(),
            MissionStatus::Failed | MissionStatus::Timeout => style(mission.to_string()).red(),
            _ => style(mission.to_string()),
        };
        println!("  {line}");
    }
    if readings {
        for (name, reading) in &state.sensors {
            println!("  {} {reading:?}", style(name).dim());
        }
    }
    println!(
        "{} {}/{}",
        style("Score").bold(),
        state.score,
        state.max_score
    );
}

fn presets(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.names())?);
        return Ok(());
    }
    println!("{}", style("Robots").bold());
    for (key, preset) in catalog.robots() {
        println!("  {:<16} {}", style(key).cyan(), preset.description);
    }
    println!("{}", style("Profiles").bold());
    for (key, profile) in catalog.profiles() {
        println!("  {:<16} {}", style(key).cyan(), profile.description);
    }
    println!("{}", style("Seasons").bold());
    for (key, season) in catalog.seasons() {
        println!(
            "  {:<16} {} ({}), {} x {} mm table, {} s",
            style(key).cyan(),
            season.name,
            season.theme,
            season.table_size[0],
            season.table_size[1],
            season.time_limit
        );
    }
    let names = catalog.names();
    println!("{} {}", style("Simulations").bold(), names.simulations.join(", "));
    println!("{} {}", style("Pybricks").bold(), names.pybricks.join(", "));
    Ok(())
}

fn save(catalog: &Catalog, args: SaveProfileArgs, dir: PathBuf) -> Result<()> {
    let mut profile = catalog.profile(&args.base)?;
    profile.name = args.name;
    if let Some(description) = args.description {
        profile.description = description;
    }
    if let Some(robot) = &args.robot {
        profile.robot = catalog.robot(robot)?;
    }
    if let Some(simulation) = &args.simulation {
        profile.simulation = catalog.simulation(simulation)?;
    }
    if let Some(pybricks) = &args.pybricks {
        profile.pybricks = catalog.pybricks(pybricks)?;
    }
    if let Some(season) = args.season {
        catalog.season(&season)?;
        profile.season = season;
    }
    let key = profile_key(&profile.name);
    let path = save_profile(&dir, &key, &profile)?;
    println!(
        "{} profile '{key}' to {}",
        style("saved").green(),
        path.display()
    );
    Ok(())
}
