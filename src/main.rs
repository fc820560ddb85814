use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nftmarket_client::config::{ClientConfig, ConfigError};
use nftmarket_client::net::client::AuthHttpClient;
use nftmarket_client::net::error::ApiError;
use nftmarket_client::net::transport::ReqwestTransport;
use nftmarket_client::net::types::{NftListKind, RegisterRequest, Role, User, UserPatch};
use nftmarket_client::routes::RouteTable;
use nftmarket_client::routes::guard::RouteDecision;
use nftmarket_client::services::auth::AuthService;
use nftmarket_client::services::bootstrap::SessionBootstrapper;
use nftmarket_client::state::auth::Session;
use nftmarket_client::state::nfts::NftFeed;
use nftmarket_client::state::token_store::TokenStore;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(ApiError),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: Value },
    #[error("not logged in; run `nftmarket login` first")]
    NotLoggedIn,
    #[error("invalid --field `{0}`; expected key=value")]
    InvalidField(String),
    #[error("unknown profile field `{0}` (expected username, email, first_name or last_name)")]
    UnknownField(String),
    #[error("nothing to update; pass at least one --field")]
    EmptyPatch,
    #[error("no route matches `{0}`")]
    UnknownRoute(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => Self::Rejected { status, body },
            other => Self::Api(other),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nftmarket", about = "NFT marketplace session and listing CLI")]
struct Cli {
    /// API root, e.g. http://127.0.0.1:8000/api
    #[arg(long, env = "MARKET_API_BASE_URL")]
    base_url: Option<String>,

    /// Where the access credential is persisted between runs.
    #[arg(long, env = "MARKET_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Where the refresh cookie is persisted between runs.
    #[arg(long, env = "MARKET_COOKIE_FILE")]
    cookie_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the session and print the current user.
    Whoami,
    Login {
        username: String,
        #[arg(long, env = "MARKET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Register(RegisterArgs),
    /// List a user's NFTs.
    Nfts(NftsArgs),
    Profile(ProfileCommand),
    /// Print the guard decision for a client route.
    Route { path: String },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "MARKET_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Args, Debug)]
struct NftsArgs {
    username: String,
    #[arg(long, value_enum, default_value_t = KindArg::Owned)]
    kind: KindArg,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: Option<u32>,
    /// Follow `next` links until the listing is exhausted.
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Owned,
    Created,
}

impl From<KindArg> for NftListKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Owned => Self::Owned,
            KindArg::Created => Self::Created,
        }
    }
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    /// Update profile fields, e.g. `--field first_name=Alice`.
    Set {
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

/// Everything a command needs, built once from config and flags.
struct CliContext {
    config: ClientConfig,
    auth: AuthService,
    bootstrap: SessionBootstrapper,
}

impl CliContext {
    fn new(cli: &Cli) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base_url) = &cli.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(token_file) = &cli.token_file {
            config.token_file.clone_from(token_file);
        }
        if let Some(cookie_file) = &cli.cookie_file {
            config.cookie_file.clone_from(cookie_file);
        }

        let tokens = TokenStore::file(&config.token_file);
        let transport = ReqwestTransport::with_cookie_file(&config, &config.cookie_file)?;
        let client = AuthHttpClient::new(Arc::new(transport), tokens);
        let session = Session::new();
        tracing::debug!(
            base_url = %config.base_url,
            token_file = %config.token_file.display(),
            cookie_file = %config.cookie_file.display(),
            "cli context ready"
        );
        Ok(Self {
            auth: AuthService::new(client.clone(), session.clone()),
            bootstrap: SessionBootstrapper::new(client, session),
            config,
        })
    }

    /// Resolve the session and require a user.
    async fn current_user(&self) -> Result<User, CliError> {
        self.bootstrap.run().await.ok_or(CliError::NotLoggedIn)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext::new(&cli)?;

    match cli.command {
        Command::Whoami => run_whoami(&ctx).await,
        Command::Login { username, password } => run_login(&ctx, &username, &password).await,
        Command::Logout => {
            ctx.auth.logout().await;
            println!("logged out");
            Ok(())
        }
        Command::Register(args) => run_register(&ctx, args).await,
        Command::Nfts(args) => run_nfts(&ctx, args).await,
        Command::Profile(profile) => run_profile(&ctx, profile).await,
        Command::Route { path } => run_route(&ctx, &path).await,
    }
}

async fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let user = ctx.current_user().await?;
    print_json(&serde_json::to_value(&user)?)?;
    println!("home: {}", ctx.auth.role_home());
    Ok(())
}

async fn run_login(ctx: &CliContext, username: &str, password: &str) -> Result<(), CliError> {
    let user = ctx.auth.login(username, password).await?;
    print_json(&serde_json::to_value(&user)?)?;
    println!("home: {}", ctx.auth.role_home());
    Ok(())
}

async fn run_register(ctx: &CliContext, args: RegisterArgs) -> Result<(), CliError> {
    let request = RegisterRequest {
        username: args.username,
        email: args.email,
        password: args.password,
        role: args.role,
        first_name: args.first_name,
        last_name: args.last_name,
    };
    let user = ctx.auth.register(&request).await?;
    print_json(&serde_json::to_value(&user)?)
}

async fn run_nfts(ctx: &CliContext, args: NftsArgs) -> Result<(), CliError> {
    let kind = NftListKind::from(args.kind);
    let page_size = args.page_size.unwrap_or(ctx.config.page_size);

    if !args.all {
        let page = ctx.auth.fetch_nfts(&args.username, kind, args.page, page_size).await?;
        return print_json(&serde_json::to_value(&page)?);
    }

    let mut feed = NftFeed::new(args.username, kind, page_size);
    while feed.can_load_more() {
        if ctx.auth.load_more(&mut feed).await? == 0 {
            break;
        }
    }
    tracing::debug!(loaded = feed.items().len(), total = feed.total(), "listing exhausted");
    print_json(&serde_json::to_value(feed.items())?)
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Set { fields } => {
            let patch = build_patch(fields)?;
            ctx.current_user().await?;
            let user = ctx.auth.update_profile(&patch).await?;
            print_json(&serde_json::to_value(&user)?)
        }
    }
}

async fn run_route(ctx: &CliContext, path: &str) -> Result<(), CliError> {
    ctx.bootstrap.run().await;
    let table = RouteTable::default();
    let decision = table
        .decide(path, &ctx.auth.session().snapshot())
        .ok_or_else(|| CliError::UnknownRoute(path.to_owned()))?;
    match decision {
        RouteDecision::Loading => println!("loading"),
        RouteDecision::RedirectTo(target) => println!("redirect {target}"),
        RouteDecision::Render => println!("render"),
    }
    Ok(())
}

fn parse_field(raw: &str) -> Result<(String, String), CliError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| CliError::InvalidField(raw.to_owned()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidField(raw.to_owned()));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn build_patch(fields: Vec<(String, String)>) -> Result<UserPatch, CliError> {
    let mut patch = UserPatch::default();
    for (key, value) in fields {
        match key.as_str() {
            "username" => patch.username = Some(value),
            "email" => patch.email = Some(value),
            "first_name" => patch.first_name = Some(value),
            "last_name" => patch.last_name = Some(value),
            _ => return Err(CliError::UnknownField(key)),
        }
    }
    if patch.is_empty() {
        return Err(CliError::EmptyPatch);
    }
    Ok(patch)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
