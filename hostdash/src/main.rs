//! Entry point for the hostdash TUI. Parses args, resolves the profile and runs the App.

mod app;
mod logging;
mod profiles;
mod ui;

use anyhow::Context;
use app::App;
use hostdash_client::session::{Session, Tokens};
use hostdash_client::{ApiClient, ClientConfig};
use profiles::{load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile};
use std::env;
use std::io::{self, Write};
use tracing::{info, warn};

const USAGE: &str = "[--profile NAME|-P NAME] [--tls-ca CERT_PEM|-t CERT_PEM] [--save] [--dry-run] [http(s)://HOST:PORT/api]";

#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    save: bool,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "hostdash".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} {USAGE}"));
            }
            "--tls-ca" | "-t" => {
                parsed.tls_ca = it.next();
            }
            "--profile" | "-P" => {
                parsed.profile = it.next();
            }
            "--save" => {
                parsed.save = true;
            }
            "--dry-run" => {
                parsed.dry_run = true;
            }
            _ if arg.starts_with("--tls-ca=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.tls_ca = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option {arg}. Usage: {prog} {USAGE}"));
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. Usage: {prog} {USAGE}"));
                }
            }
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let Some(entry) = resolve_profile(&parsed)? else {
        return Ok(());
    };

    if parsed.dry_run {
        println!("hostdash: would connect to {}", entry.url);
        return Ok(());
    }

    match logging::init(&profiles::config_dir()) {
        Ok(path) => info!(log = %path.display(), "hostdash starting"),
        Err(e) => eprintln!("hostdash: logging disabled: {e:#}"),
    }

    let mut config = ClientConfig::new(entry.url.clone()).with_timeout(entry.timeout());
    if let Some(ca) = entry.tls_ca.as_ref() {
        config = config.with_tls_ca(ca);
    }
    let client = ApiClient::with_session(config, session_from_env())
        .with_context(|| format!("connecting to {}", entry.url))?;

    let mut app = App::new(client, entry.poll_interval());
    app.run().await
}

/// Tokens handed in through the environment skip the login screen.
fn session_from_env() -> Session {
    match env::var("HOSTDASH_ACCESS_TOKEN") {
        Ok(access) if !access.trim().is_empty() => Session::with_tokens(Tokens {
            access: access.trim().to_string(),
            refresh: env::var("HOSTDASH_REFRESH_TOKEN")
                .ok()
                .filter(|r| !r.trim().is_empty()),
        }),
        _ => Session::default(),
    }
}

/// Apply the profile rules: auto-save new names, confirm overwrites, prompt
/// when nothing was given. `None` means the user aborted.
fn resolve_profile(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
    };
    let mut profiles_mut = profiles_file.clone();

    let entry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                match profiles_mut.profiles.get(name) {
                    None => {
                        profiles_mut.profiles.insert(name.clone(), entry.clone());
                        persist(&profiles_mut);
                    }
                    Some(existing) if !existing.same_target(&entry) => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ));
                        if overwrite {
                            let updated = ProfileEntry {
                                poll_secs: existing.poll_secs,
                                timeout_secs: existing.timeout_secs,
                                ..entry.clone()
                            };
                            profiles_mut.profiles.insert(name.clone(), updated);
                            persist(&profiles_mut);
                        }
                    }
                    Some(_) => {}
                }
                // keep the stored tuning for this run
                if let Some(stored) = profiles_mut.profiles.get(name) {
                    if stored.same_target(&entry) {
                        return Ok(Some(stored.clone()));
                    }
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| (1..=names.len()).contains(idx))
                .and_then(|idx| profiles_mut.profiles.get(&names[idx - 1]));
            match picked {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter API URL (http://HOST:PORT/api or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let ca_opt = Some(ca.trim().to_string()).filter(|c| !c.is_empty());
            let entry = ProfileEntry::new(url.trim().to_string(), ca_opt);
            profiles_mut.profiles.insert(name, entry.clone());
            persist(&profiles_mut);
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

fn persist(profiles: &profiles::ProfilesFile) {
    if let Err(e) = save_profiles(profiles) {
        warn!(error = %e, "saving profiles failed");
        eprintln!("hostdash: could not save profiles: {e}");
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
