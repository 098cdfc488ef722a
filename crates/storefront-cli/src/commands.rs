use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use storefront_core::api::{ApiRequest, AuthFallback};
use storefront_core::models::Registration;
use storefront_core::{Config, SessionManager};
use tracing::warn;

use crate::cli::{Commands, RequestArgs};

/// Environment variable holding the password for non-interactive use
const PASSWORD_ENV: &str = "STOREFRONT_PASSWORD";

pub async fn run(command: Commands, session: &SessionManager, config: &mut Config) -> Result<ExitCode> {
    match command {
        Commands::Login { username } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(name) => name,
                None => prompt_username()?,
            };
            let password = read_password()?;
            let ok = session.login(&username, &password).await;
            if ok {
                remember_username(config, &username);
            }
            report_session(session, ok)
        }
        Commands::Register { username, email } => {
            let password = read_password()?;
            let ok = session
                .register(&Registration {
                    username: username.clone(),
                    email,
                    password,
                })
                .await;
            if ok {
                remember_username(config, &username);
            }
            report_session(session, ok)
        }
        Commands::Logout => {
            session.logout();
            print_json(&serde_json::to_value(session.state())?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Whoami => {
            let profile = session.fetch_profile().await;
            let found = profile.is_some();
            print_json(&json!({
                "profile": profile,
                "session": session.state(),
            }))?;
            Ok(if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Status => {
            let stored = session
                .api()
                .store()
                .snapshot()
                .context("Failed to read stored session")?;
            print_json(&json!({
                "base_url": session.api().base_url(),
                "phase": session.state().phase(),
                "username": stored.username,
                "has_access_token": stored.access.is_some(),
                "has_refresh_token": stored.refresh.is_some(),
                "is_privileged": stored.is_privileged,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Request(args) => {
            let request = build_request(args)?;
            let body = session.api().send(&request).await?;
            print_json(&body.unwrap_or(Value::Null))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Products => {
            let products = session.api().list_products().await?;
            print_json(&serde_json::to_value(products)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cart => {
            let cart = session.api().fetch_cart().await?;
            print_json(&serde_json::to_value(cart)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Orders => {
            let orders = session.api().list_orders().await?;
            print_json(&serde_json::to_value(orders)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_request(args: RequestArgs) -> Result<ApiRequest> {
    let method = args
        .method
        .to_ascii_uppercase()
        .parse::<reqwest::Method>()
        .context("Invalid HTTP method")?;
    if !matches!(method.as_str(), "GET" | "POST" | "PUT" | "PATCH" | "DELETE") {
        anyhow::bail!("Unsupported HTTP method: {}", method);
    }

    let mut request = ApiRequest::new(method, args.path);
    if let Some(data) = args.data {
        let body: Value = serde_json::from_str(&data).context("--data is not valid JSON")?;
        request = request.body(body);
    }
    for raw in args.headers {
        let (name, value) = parse_header(&raw)?;
        request = request.header(name, value);
    }
    if args.no_anonymous_fallback {
        request = request.auth_fallback(AuthFallback::Fail);
    }
    Ok(request)
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Header must look like NAME:VALUE, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header name is empty in {:?}", raw);
    }
    Ok((name, value.trim()))
}

fn report_session(session: &SessionManager, ok: bool) -> Result<ExitCode> {
    let state = session.state();
    if ok {
        print_json(&serde_json::to_value(&state)?)?;
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Error: {}", state.error);
        Ok(ExitCode::FAILURE)
    }
}

fn remember_username(config: &mut Config, username: &str) {
    config.last_username = Some(username.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn print_json(value: &Value) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, path: &str) -> RequestArgs {
        RequestArgs {
            method: method.to_string(),
            path: path.to_string(),
            data: None,
            headers: Vec::new(),
            no_anonymous_fallback: false,
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-Trace: abc").unwrap(), ("X-Trace", "abc"));
        assert_eq!(parse_header("Accept:a:b").unwrap(), ("Accept", "a:b"));
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_build_request() {
        let mut raw = args("patch", "/cart/items/3/");
        raw.data = Some(r#"{"quantity": 2}"#.to_string());
        raw.headers = vec!["X-Trace: abc".to_string()];
        raw.no_anonymous_fallback = true;

        let request = build_request(raw).unwrap();
        assert_eq!(request.method(), &reqwest::Method::PATCH);
        assert_eq!(request.body_value(), Some(&json!({"quantity": 2})));
        assert_eq!(request.headers().get("X-Trace").map(String::as_str), Some("abc"));
        assert_eq!(request.fallback(), AuthFallback::Fail);
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        assert!(build_request(args("HEAD", "/x/")).is_err());

        let mut raw = args("POST", "/x/");
        raw.data = Some("{not json".to_string());
        assert!(build_request(raw).is_err());
    }
}
