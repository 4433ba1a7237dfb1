// swatch - headless swatchsheet: color conversion, local history, sheet sync

mod exit_codes;
mod headless;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use swatchsheet_api::{ApiClient, ApiError, AuthSession, CookieJar, MemoryCookieJar};
use swatchsheet_config::{
    clear_stored_state, fetch_state, FileStore, KeyValueStore, Settings, StoreError,
};
use swatchsheet_core::{hex_to_hsl, hex_to_rgb, is_dark, normalize_hex, Action};
use swatchsheet_popup::{PopupSession, PopupStore};
use swatchsheet_protocol::{RouterLink, RouterMessage};
use swatchsheet_router::{prepare_submission, BackgroundRouter, RouterConfig};

use exit_codes::{
    EXIT_API, EXIT_ERROR, EXIT_INVALID_COLOR, EXIT_NO_SESSION, EXIT_STORAGE, EXIT_SUCCESS,
    EXIT_USAGE,
};
use headless::Headless;

#[derive(Parser)]
#[command(name = "swatch")]
#[command(about = "Pick, convert and sync colors to a spreadsheet (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Storage file (default: <config dir>/swatchsheet/storage.json)
    #[arg(long, global = true, env = "SWATCH_STORE")]
    store: Option<PathBuf>,

    /// Settings file (default: <config dir>/swatchsheet/settings.json)
    #[arg(long, global = true, env = "SWATCH_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a hex color as RGB and HSL
    #[command(after_help = "\
Examples:
  swatch convert '#FF8800'
  swatch convert 336699 --json")]
    Convert {
        /// Color as RRGGBB, with or without '#'
        hex: String,

        #[arg(long)]
        json: bool,
    },

    /// Recently picked colors
    #[command(subcommand)]
    History(HistoryCommands),

    /// Report a picked color the way the in-page picker does
    #[command(after_help = "\
Examples:
  swatch pick '#FF8800'
  swatch pick 336699 --url https://example.com --sync")]
    Pick {
        hex: String,

        /// Page the color was picked from
        #[arg(long)]
        url: Option<String>,

        /// Also write the color to the selected sheet and wait for the result
        #[arg(long)]
        sync: bool,
    },

    /// Stored popup state
    #[command(subcommand)]
    State(StateCommands),

    /// Settings file
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Print the history, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Record colors as picked, in order
    Add {
        #[arg(required = true)]
        hex: Vec<String>,
    },
    Remove {
        hex: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum StateCommands {
    /// Print the stored state as JSON
    Show,
    /// Delete the stored state (what sign-out does)
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the settings file location
    Path,
    /// Print the effective settings as JSON
    Show,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nprotocol: swatchsheet-protocol ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let ctx = Context::new(cli.store, cli.settings);

    let result = match cli.command {
        Commands::Convert { hex, json } => cmd_convert(&hex, json),
        Commands::History(cmd) => match cmd {
            HistoryCommands::List { json } => cmd_history_list(&ctx, json),
            HistoryCommands::Add { hex } => cmd_history_add(&ctx, &hex),
            HistoryCommands::Remove { hex } => cmd_history_remove(&ctx, &hex),
            HistoryCommands::Clear => cmd_history_clear(&ctx),
        },
        Commands::Pick { hex, url, sync } => cmd_pick(&ctx, &hex, url, sync),
        Commands::State(cmd) => match cmd {
            StateCommands::Show => cmd_state_show(&ctx),
            StateCommands::Clear => cmd_state_clear(&ctx),
        },
        Commands::Settings(cmd) => match cmd {
            SettingsCommands::Path => {
                println!("{}", ctx.settings_path.display());
                Ok(())
            }
            SettingsCommands::Show => print_json(&ctx.settings),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn invalid_color(input: &str) -> Self {
        Self::new(EXIT_INVALID_COLOR, format!("not a hex color: {:?}", input))
            .with_hint("use six hex digits, e.g. #FF8800")
    }

    pub fn api(err: ApiError) -> Self {
        let hint = match &err {
            ApiError::Network(_) => Some("check api.baseUrl in the settings file".to_string()),
            ApiError::Http(401, _) => Some("the access token expired; open the popup to sign in again".to_string()),
            _ => None,
        };
        Self { code: EXIT_API, message: err.to_string(), hint }
    }

    pub fn storage(err: StoreError) -> Self {
        Self::new(EXIT_STORAGE, err.to_string())
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Context
// ============================================================================

struct Context {
    settings: Settings,
    settings_path: PathBuf,
    store: Arc<FileStore>,
}

impl Context {
    fn new(store: Option<PathBuf>, settings: Option<PathBuf>) -> Self {
        let (settings, settings_path) = match settings {
            Some(path) => (Settings::load_from(&path), path),
            None => (Settings::load(), Settings::config_path()),
        };
        let store = Arc::new(store.map(FileStore::new).unwrap_or_else(FileStore::open_default));
        log::debug!("Using store {}", store.path().display());
        Self { settings, settings_path, store }
    }

    fn backend(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    fn popup_store(&self) -> PopupStore {
        PopupStore::rehydrate(self.backend(), &self.settings)
    }

    fn api(&self) -> Result<ApiClient, CliError> {
        ApiClient::new(self.settings.api_base_url.clone(), self.settings.api_timeout()).map_err(CliError::api)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_convert(input: &str, json: bool) -> Result<(), CliError> {
    let hex = normalize_hex(input).ok_or_else(|| CliError::invalid_color(input))?;
    let rgb = hex_to_rgb(&hex);
    let hsl = hex_to_hsl(&hex);
    let dark = is_dark(&hex);

    if json {
        print_json(&serde_json::json!({ "hex": hex, "rgb": rgb, "hsl": hsl, "dark": dark }))
    } else {
        println!("hex   {}", hex);
        println!("rgb   {}", rgb);
        println!("hsl   {}", hsl);
        println!("text  {}", if dark { "light" } else { "dark" });
        Ok(())
    }
}

fn cmd_history_list(ctx: &Context, json: bool) -> Result<(), CliError> {
    let store = ctx.popup_store();
    let recent = &store.state().color_history.recent;
    if json {
        return print_json(recent);
    }
    if recent.is_empty() {
        eprintln!("No colors picked yet");
    }
    for hex in recent {
        println!("{}", hex);
    }
    Ok(())
}

fn cmd_history_add(ctx: &Context, colors: &[String]) -> Result<(), CliError> {
    // Validate everything before touching the store.
    let colors = colors
        .iter()
        .map(|c| normalize_hex(c).ok_or_else(|| CliError::invalid_color(c)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut store = ctx.popup_store();
    for hex in colors {
        store.dispatch(Action::AddColorHistory(hex));
    }
    Ok(())
}

fn cmd_history_remove(ctx: &Context, input: &str) -> Result<(), CliError> {
    let hex = normalize_hex(input).ok_or_else(|| CliError::invalid_color(input))?;
    let mut store = ctx.popup_store();
    if !store.state().color_history.contains(&hex) {
        return Err(CliError::new(EXIT_USAGE, format!("{} is not in the history", hex)));
    }
    store.dispatch(Action::RemoveColorHistory(hex));
    Ok(())
}

fn cmd_history_clear(ctx: &Context) -> Result<(), CliError> {
    ctx.popup_store().dispatch(Action::ClearColorHistory);
    Ok(())
}

/// Same path as a real pick: the router records it, the next popup start
/// collects it into the history, and `--sync` does the sheet write the
/// router would do in the background, but waits for it.
fn cmd_pick(ctx: &Context, input: &str, url: Option<String>, sync: bool) -> Result<(), CliError> {
    let hex = normalize_hex(input).ok_or_else(|| CliError::invalid_color(input))?;

    let router = BackgroundRouter::new(
        Arc::new(Headless),
        ctx.backend(),
        None,
        RouterConfig::from_settings(&ctx.settings),
    );
    let reply = router.send(RouterMessage::ColorPicked { color: hex.clone(), url: url.clone() });
    if !reply.is_some_and(|r| r.success) {
        return Err(CliError::new(EXIT_ERROR, "router did not accept the color"));
    }

    let auth = AuthSession::new(
        CookieJar::Platform(Arc::new(MemoryCookieJar::new())),
        ctx.settings.auth_cookie_name.clone(),
        ctx.settings.file_cookie_name.clone(),
    );
    let session = PopupSession::start(&ctx.settings, ctx.backend(), ctx.api()?, auth, None);
    println!("{}", session.state().color);

    if !sync {
        return Ok(());
    }

    let Some((creds, row)) = prepare_submission(ctx.store.as_ref(), &hex, url.as_deref()) else {
        return Err(CliError::new(EXIT_NO_SESSION, "no signed-in user or no selected sheet")
            .with_hint("sign in and select a sheet in the popup first"));
    };
    ctx.api()?.add_color(&creds, &row).map_err(CliError::api)?;
    eprintln!("Synced {} to {}", row.hex, row.sheet_name);
    Ok(())
}

fn cmd_state_show(ctx: &Context) -> Result<(), CliError> {
    match fetch_state(ctx.store.as_ref()) {
        Some(state) => print_json(&state),
        None => Err(CliError::new(EXIT_ERROR, "no stored state")),
    }
}

fn cmd_state_clear(ctx: &Context) -> Result<(), CliError> {
    clear_stored_state(ctx.store.as_ref()).map_err(CliError::storage)
}
