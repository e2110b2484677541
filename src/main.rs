use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use discord_relay::application::relay::{
    BrokerOptions, LivenessTracker, OutgoingBatcher, RelayBroker,
};
use discord_relay::application::services::CommandRouter;
use discord_relay::domain::entities::ChatEvent;
use discord_relay::domain::traits::ChatClient;
use discord_relay::infrastructure::adapters::console::{ConsoleAdapter, CONSOLE_CHANNEL};
use discord_relay::infrastructure::adapters::DiscordAdapter;
use discord_relay::infrastructure::config::Config;
use discord_relay::infrastructure::http;

#[derive(Parser)]
#[command(name = "discord-relay")]
#[command(about = "Relays chat between a Discord channel and a polling game server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "relay.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_relay(cli.config, cli.token);
        }
        Commands::Version => {
            println!("discord-relay v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(cli.config);
        }
    }
}

fn run_relay(config_path: String, token_override: Option<String>) {
    // Load config
    let mut config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    };

    if let Some(token) = token_override {
        config.bot.token = Some(token);
    }

    println!("{0}\nStarting relay. Press Ctrl-C to exit.\n{0}", "=".repeat(37));

    let rt = tokio::runtime::Runtime::new().unwrap();

    if config.discord_enabled() && config.bot.token.is_some() {
        if let Err(e) = config.validate() {
            tracing::error!("Invalid configuration: {}", e);
            return;
        }
        rt.block_on(run_discord(config));
    } else {
        tracing::info!("No Discord token configured, running console adapter (dev mode)");
        rt.block_on(run_console(config));
    }
}

async fn run_discord(config: Config) {
    let token = config.bot.token.clone().unwrap_or_default();
    let mut adapter = DiscordAdapter::new(token);

    if let Err(e) = adapter.fetch_bot_info().await {
        tracing::error!("Failed to fetch bot info: {}", e);
        return;
    }
    let info = adapter.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let adapter = Arc::new(adapter);
    let chat: Arc<dyn ChatClient> = adapter.clone();
    let channel_id = config.relay.channel_id.clone();
    let (broker, router, batcher) = build_core(chat, &config, info.id, channel_id.clone());

    spawn_endpoint(Arc::clone(&broker), config.relay.port);
    if let Some(batcher) = batcher {
        tokio::spawn(batcher.run());
    }

    let (events_tx, events_rx) = mpsc::channel::<ChatEvent>(256);
    tokio::spawn({
        let adapter = Arc::clone(&adapter);
        async move { adapter.run(channel_id, events_tx).await }
    });

    event_loop(broker, router, events_rx).await;
}

async fn run_console(config: Config) {
    let adapter = Arc::new(ConsoleAdapter::new());
    let chat: Arc<dyn ChatClient> = adapter.clone();
    let info = adapter.bot_info();

    let channel_id = if config.relay.channel_id.is_empty() {
        CONSOLE_CHANNEL.to_string()
    } else {
        config.relay.channel_id.clone()
    };
    let (broker, router, batcher) = build_core(chat, &config, info.id, channel_id);

    spawn_endpoint(Arc::clone(&broker), config.relay.port);
    if let Some(batcher) = batcher {
        tokio::spawn(batcher.run());
    }

    let (events_tx, events_rx) = mpsc::channel::<ChatEvent>(256);
    tokio::spawn({
        let adapter = Arc::clone(&adapter);
        async move { adapter.run(events_tx).await }
    });

    event_loop(broker, router, events_rx).await;
}

fn build_core(
    chat: Arc<dyn ChatClient>,
    config: &Config,
    bot_user_id: String,
    channel_id: String,
) -> (Arc<RelayBroker>, CommandRouter, Option<Arc<OutgoingBatcher>>) {
    let batcher = config
        .relay
        .batch_outgoing
        .then(|| Arc::new(OutgoingBatcher::new(Arc::clone(&chat), channel_id.clone())));

    let options = BrokerOptions {
        channel_id: channel_id.clone(),
        bot_user_id,
        use_display_names: config.relay.use_display_names,
        clean_invite_links: config.relay.clean_invite_links,
    };
    let broker = Arc::new(RelayBroker::new(
        Arc::clone(&chat),
        options,
        LivenessTracker::new(),
        batcher.clone(),
    ));
    let router = CommandRouter::new(
        Arc::clone(&broker),
        chat,
        config.bot.prefix.as_str(),
        channel_id,
        config.relay.allow_logins,
    );

    (broker, router, batcher)
}

fn spawn_endpoint(broker: Arc<RelayBroker>, port: u16) {
    tokio::spawn(async move {
        if let Err(e) = http::serve(broker, port).await {
            tracing::error!("Poll endpoint failed: {}", e);
        }
    });
}

async fn event_loop(
    broker: Arc<RelayBroker>,
    router: CommandRouter,
    mut events: mpsc::Receiver<ChatEvent>,
) {
    while let Some(event) = events.recv().await {
        broker.on_chat_event(&event);
        // Commands keep working even while content relay is gated
        router.handle(&event).await;
    }
}

fn init_config(path: String) {
    if std::path::Path::new(&path).exists() {
        tracing::warn!("Config file {} already exists, not overwriting", path);
        return;
    }
    match Config::default().save(&path) {
        Ok(()) => println!("Wrote default config to {}", path),
        Err(e) => tracing::error!("Failed to write config: {}", e),
    }
}
