use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use cinwiki::config::AppConfig;
use cinwiki::core::bot::{CinWikiBot, query_from_message};
use cinwiki::core::fetcher::WikiFetcher;
use cinwiki::model::activity::{Activity, ChannelAccount, Reply};
use cinwiki::utils::input::input_trim;
use cinwiki::utils::logging::init_logging;
use cinwiki::wire::client::{CourseLookup, QueryClient};
use cinwiki::wire::framing::Framing;
use cinwiki::wire::server::QueryServer;

#[derive(Parser, Debug)]
#[command(name = "cinwiki", version, about = "CInWiki course lookup server and chat front-end")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CINWIKI_CONFIG")]
    config: Option<PathBuf>,

    /// Query server host, for both serving and connecting
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    port: Option<u16>,

    /// Wiki page prefix; the course code is appended
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true, value_enum)]
    framing: Option<Framing>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the query server
    Serve,
    /// Look up one course through the query server
    Lookup {
        code: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Chat with the bot on the terminal
    Chat {
        /// Name used in the greeting
        #[arg(long, default_value = "aluno")]
        name: String,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref()).context("loading configuration")?;
        if let Some(host) = &self.host {
            config.set_host(host);
        }
        if let Some(port) = self.port {
            config.set_port(port);
        }
        if let Some(base_url) = &self.base_url {
            config.fetcher.base_url = base_url.clone();
        }
        if let Some(framing) = self.framing {
            config.set_framing(framing);
        }
        config.validate().context("invalid command-line overrides")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = match cli.command {
        Command::Serve => "info",
        _ => "warn",
    };
    init_logging(default_filter)?;
    let config = cli.load_config()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Lookup { code, json } => lookup(config, &code, json).await,
        Command::Chat { name } => chat(config, &name).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let fetcher = WikiFetcher::new(&config.fetcher).context("building HTTP client")?;
    log::info!("fetching pages from {}", fetcher.base_url());

    let server = QueryServer::bind(config.server, Arc::new(fetcher)).await?;
    server.run().await;
    Ok(())
}

async fn lookup(config: AppConfig, code: &str, json: bool) -> anyhow::Result<()> {
    let query = query_from_message(code)?;
    let client = QueryClient::new(config.client);
    let record = client
        .find(&query)
        .await
        .with_context(|| format!("looking up {}", query))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if record.is_complete() {
        println!("{}\n{}", record.name, record.instructor);
        println!("{}", query.page_url(&config.fetcher.base_url));
    } else {
        println!("{} não encontrada", query);
    }
    Ok(())
}

async fn chat(config: AppConfig, name: &str) -> anyhow::Result<()> {
    let bot = CinWikiBot::new(QueryClient::new(config.client), config.fetcher.base_url);

    let me = ChannelAccount::new("user", name);
    let greeting = Activity::ConversationUpdate {
        members_added: vec![me],
        recipient: ChannelAccount::new("bot", "CInWiki-BOT"),
    };
    print_replies(&bot.on_turn(&greeting).await)?;

    while let Some(text) = input_trim("> ")? {
        if text.is_empty() {
            break;
        }
        print_replies(&bot.on_turn(&Activity::Message { text }).await)?;
    }
    Ok(())
}

fn print_replies(replies: &[Reply]) -> anyhow::Result<()> {
    for reply in replies {
        match reply {
            Reply::Text(text) => println!("{}", text),
            Reply::Card(card) => {
                println!("┌ {}", card.title);
                println!("│ {}", card.subtitle);
                for button in &card.buttons {
                    println!("└ {}: {}", button.title, button.value);
                }
                log::debug!("card: {}", serde_json::to_string(card)?);
            }
        }
    }
    Ok(())
}
