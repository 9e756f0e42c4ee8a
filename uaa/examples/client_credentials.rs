use clap::Parser;
use uaa::{Api, Config, Credentials, TokenFormat};
use uaa_tokens::{ClientId, ClientSecret};

#[derive(Debug, Parser)]
struct Opts {
    /// The UAA to talk to
    #[arg(short, long, env = "UAA_TARGET")]
    target: String,

    /// The client ID of the client
    #[arg(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify the client to the UAA
    #[arg(short = 's', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// The format of issued tokens, `opaque` or `jwt`
    #[arg(short = 'f', long, env, default_value = "jwt")]
    token_format: TokenFormat,

    /// The identity zone to make requests in
    #[arg(short, long, env)]
    zone_id: Option<String>,

    /// Dump each request and response to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Do not verify the UAA's TLS certificate
    #[arg(long, env)]
    skip_ssl_validation: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut config = Config::new()
        .with_verbose(opts.verbose)
        .with_skip_ssl_validation(opts.skip_ssl_validation);
    if let Some(zone_id) = opts.zone_id {
        config = config.with_zone_id(zone_id);
    }

    let api = Api::new(
        &opts.target,
        Credentials::client_credentials(opts.client_id, opts.client_secret, opts.token_format),
        config,
    )
    .await?;

    tracing::info!(health = %api.health().await?, target = %api.endpoint(), "checked server");

    let token = api.token().await?;
    tracing::info!(
        token = format_args!("{:#?}", token.access_token()),
        expiry = token.expiry().map(|e| e.0),
        scope = token.scope(),
        "first access token"
    );

    for key in api.token_keys().await? {
        tracing::info!(kid = %key.kid, alg = %key.alg, "token signing key");
    }

    Ok(())
}
