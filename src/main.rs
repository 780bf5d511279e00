mod bots;
mod impls;
mod persistent;

use std::path::PathBuf;

use clap::Parser;
use simplelog::LevelFilter;

use bots::shop::fsm::Controller;
use bots::shop::rate::Rate;
use bots::shop::{Flow, Settings};
use persistent::Storage;

#[derive(Parser, Debug)]
#[command(version, about = "Gamepass price calculator and shop bot")]
struct Conf {
    /// Bot token from @BotFather
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// File the shop and ticket channels are kept in
    #[arg(long, env = "SHOP_CONFIG_PATH", default_value = "shop-config.ron")]
    config_path: PathBuf,
    #[arg(long, env = "SHOP_FLOW", value_enum, default_value_t = Flow::Both)]
    flow: Flow,
    /// USD per 1,000 Robux
    #[arg(long, env = "SHOP_RATE", default_value = "7", value_parser = parse_rate)]
    rate: Rate,
    /// Channel name /calculate results point buyers to
    #[arg(long, env = "SHOP_REFERRAL_CHANNEL", default_value = "tickets")]
    referral_channel: String,
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

fn parse_rate(s: &str) -> Result<Rate, String> {
    let value: f64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    Rate::new(value).ok_or_else(|| format!("rate must be a positive number, got {value}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let conf = Conf::parse();
    init_logger(conf.log_level);
    let Some(token) = conf.token.filter(|t| !t.trim().is_empty()) else {
        log::error!("TELEGRAM_BOT_TOKEN is not set, the bot cannot connect");
        anyhow::bail!("missing bot token");
    };
    let settings = Settings {
        flow: conf.flow,
        rate: conf.rate,
        referral_channel: conf.referral_channel,
    };
    let controller = Controller::new(settings, Storage::new(conf.config_path));
    bots::shop::bot::run(token, controller).await
}

fn init_logger(level: LevelFilter) {
    use simplelog::*;
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("cannot init logger: {}", e);
    }
}
