use tracefed_api::build_router;
use tracefed_api::state::AppState;
use tracefed_config::ProxyConfig;

const USAGE: &str = "usage: tracefed [flags]

  -config.file <path>   load configuration from <path>
  -config.example       print an example configuration and exit
  -config.verify        load and validate the configuration, then exit
  -config.expand-env    expand ${VAR} references in the config file
  -version              print version information and exit
";

/// Command-line flags. The external contract is Go-flag-style single-dash
/// long names, which rules out the usual derive-based parsers; a second
/// leading dash is accepted too, as Go's flag package does.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config_file: Option<String>,
    config_example: bool,
    config_verify: bool,
    expand_env: bool,
    version: bool,
}

#[derive(Debug)]
enum ArgsError {
    Help,
    Invalid(String),
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, ArgsError> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let Some(flag) = arg.strip_prefix('-') else {
            return Err(ArgsError::Invalid(format!("unexpected argument {arg:?}")));
        };
        let flag = flag.strip_prefix('-').unwrap_or(flag);
        let (name, inline) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (flag, None),
        };
        match name {
            "config.file" => {
                let value = match inline {
                    Some(value) => value,
                    None => args.next().ok_or_else(|| {
                        ArgsError::Invalid("flag -config.file requires a value".to_string())
                    })?,
                };
                parsed.config_file = Some(value);
            }
            "config.example" => parsed.config_example = bool_flag(name, inline)?,
            "config.verify" => parsed.config_verify = bool_flag(name, inline)?,
            "config.expand-env" => parsed.expand_env = bool_flag(name, inline)?,
            "version" => parsed.version = bool_flag(name, inline)?,
            "h" | "help" => return Err(ArgsError::Help),
            _ => return Err(ArgsError::Invalid(format!("unknown flag {arg:?}"))),
        }
    }
    Ok(parsed)
}

/// Boolean flags are set by presence; `-flag=true` / `-flag=false` also work.
fn bool_flag(name: &str, inline: Option<String>) -> Result<bool, ArgsError> {
    match inline.as_deref() {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ArgsError::Invalid(format!(
            "invalid boolean value {other:?} for -{name}"
        ))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Subscriber goes up before anything can log.
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(ArgsError::Help) => {
            print!("{USAGE}");
            return Ok(());
        }
        Err(ArgsError::Invalid(message)) => {
            eprintln!("{message}");
            eprint!("{USAGE}");
            std::process::exit(1);
        }
    };

    if args.version {
        println!("tracefed, version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.config_example {
        print!("{}", ProxyConfig::example_yaml());
        return Ok(());
    }

    let Some(config_path) = args.config_file.as_deref() else {
        eprintln!("-config.file is required (or use -config.example)");
        std::process::exit(1);
    };

    let config = match ProxyConfig::load(config_path, args.expand_env) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = config_path, error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    if args.config_verify {
        println!(
            "configuration ok: {} backend instance(s) configured",
            config.instances.len()
        );
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backends = config.instances.len(),
        query_timeout = ?config.query_timeout,
        max_concurrent_queries = config.max_concurrent_queries,
        max_bytes_per_trace = config.max_bytes_per_trace,
        "starting TraceFed proxy"
    );
    for instance in &config.instances {
        tracing::info!(
            backend = instance.display_name(),
            endpoint = %instance.endpoint,
            tenant = ?instance.tenant_id,
            "configured backend"
        );
    }

    let bind_address = format!("{}:{}", config.http_listen_address, config.http_listen_port);
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        return;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn single_dash_flags_parse() {
        let args = parse(&["-config.file", "/etc/tracefed.yaml", "-config.expand-env"]).unwrap();
        assert_eq!(args.config_file.as_deref(), Some("/etc/tracefed.yaml"));
        assert!(args.expand_env);
        assert!(!args.config_verify);
    }

    #[test]
    fn double_dash_and_inline_values_accepted() {
        let args = parse(&["--config.file=/tmp/a.yaml", "--config.verify"]).unwrap();
        assert_eq!(args.config_file.as_deref(), Some("/tmp/a.yaml"));
        assert!(args.config_verify);
    }

    #[test]
    fn boolean_flags_take_explicit_values() {
        let args = parse(&["-config.example=true", "-version=false"]).unwrap();
        assert!(args.config_example);
        assert!(!args.version);

        assert!(matches!(
            parse(&["-config.verify=maybe"]),
            Err(ArgsError::Invalid(_))
        ));
    }

    #[test]
    fn version_flag_parses() {
        let args = parse(&["-version"]).unwrap();
        assert!(args.version);
    }

    #[test]
    fn missing_value_and_unknown_flags_rejected() {
        assert!(matches!(
            parse(&["-config.file"]),
            Err(ArgsError::Invalid(_))
        ));
        assert!(matches!(parse(&["-no.such.flag"]), Err(ArgsError::Invalid(_))));
        assert!(matches!(parse(&["stray"]), Err(ArgsError::Invalid(_))));
    }

    #[test]
    fn help_is_its_own_outcome() {
        assert!(matches!(parse(&["-h"]), Err(ArgsError::Help)));
        assert!(matches!(parse(&["-help"]), Err(ArgsError::Help)));
    }
}
