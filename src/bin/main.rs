use std::path::Path;
use std::str::FromStr;

use collusion::{
    Error,
    config::Config,
    environment::{CartPole, Environment},
    learning::learning_agent::DqnAgent,
    simulation::run_all,
    training::train,
};
use log::info;
use serde::Serialize;
use strum_macros::{Display, EnumString};

const DEFAULT_CONFIG: &str = "collusion.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Mode {
    Market,
    Control,
    All,
}

#[derive(Serialize)]
struct RewardSeries<'a> {
    episode_number: Vec<u32>,
    average_reward_number: Vec<f64>,
    scores: &'a [f64],
}

/// Runs both tasks when no mode is given.
fn parse_mode(arg: Option<String>) -> collusion::Result<Mode> {
    match arg {
        Some(arg) => Mode::from_str(&arg).map_err(|_| Error::UnknownMode(arg)),
        None => Ok(Mode::All),
    }
}

fn main() -> collusion::Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let mode = parse_mode(args.next())?;
    let config = match args.next() {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    info!("mode: {mode}");

    if matches!(mode, Mode::Market | Mode::All) {
        let (results, table) = run_all(&config.market)?;
        for result in &results {
            let last = result.prices.nrows() - 1;
            info!("run {} final prices {:?}", result.run, result.prices.row(last));
        }
        std::fs::write("market_results.json", serde_json::to_string(&table)?)?;
        info!("wrote market_results.json");
    }

    if matches!(mode, Mode::Control | Mode::All) {
        let control = &config.control;
        let mut env = CartPole::new(control.max_episode_steps, control.seed.wrapping_add(1));
        let mut agent = DqnAgent::new(control, env.observation_size(), env.n_actions())?;
        let mut sink: Vec<(u32, f64)> = vec![];
        let report = train(&mut env, &mut agent, control.episodes, &mut sink);
        info!(
            "trained {} episodes: best reward {}, average reward {:.2}",
            report.episodes, report.best_reward, report.average_reward
        );
        let (episode_number, average_reward_number) = sink.into_iter().unzip();
        let series = RewardSeries {
            episode_number,
            average_reward_number,
            scores: &report.scores,
        };
        std::fs::write("control_rewards.json", serde_json::to_string(&series)?)?;
        info!("wrote control_rewards.json");
    }
    Ok(())
}
