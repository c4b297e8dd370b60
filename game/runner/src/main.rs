use std::path::PathBuf;

use clap::{App, Arg};

use common::info;
use config::SimConfig;
use logging::LoggerBuilder;
use simulation::Engine;

fn main() {
    let args = App::new(env!("CARGO_PKG_NAME"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("RON config file to load (defaults to built-in gameplay constants)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .help("RNG seed for reset()")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("ticks")
                .short("t")
                .long("ticks")
                .help("number of ticks to run")
                .takes_value(true)
                .default_value("1000"),
        )
        .get_matches();

    let logger = LoggerBuilder::with_env().expect("bad TV_LOG value").init().expect("failed to init logger");
    let _ = logger;

    let cfg = match args.value_of("config") {
        Some(path) => match config::load_file(PathBuf::from(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => SimConfig::default(),
    };

    let seed: u64 = args.value_of("seed").unwrap().parse().expect("seed must be an integer");
    let ticks: u64 = args.value_of("ticks").unwrap().parse().expect("ticks must be an integer");

    let mut engine = Engine::new(cfg);
    engine.reset(seed);
    info!("reset complete, driving the scripted controller"; "seed" => seed, "ticks" => ticks);

    for tick in 0..ticks {
        let out = engine.step_scripted().expect("step_scripted failed");
        if tick % 100 == 0 {
            let alive = (0..engine.config().teams.max_agents()).filter(|&a| !engine.is_terminated(a)).count();
            info!("tick summary";
                "tick" => engine.current_step(),
                "alive" => alive,
                "invalid_actions" => out.action_invalid,
                "reward_sum" => out.rewards.iter().sum::<f32>(),
            );
        }
    }

    info!("run complete"; "final_step" => engine.current_step());
}
