use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use artqr::config::{load_config, Config};
use artqr::content::{ContentKind, Encryption};
use artqr::contrast::{ContrastReport, Rgb};
use artqr::logo::load_logo;
use artqr::redirect::{self, Navigator, Outcome, RedirectMachine, RedirectTarget};
use artqr::render::{QrStylingSink, RenderSink};
use artqr::session::{FieldUpdate, Session};
use artqr::style::{
    Background, CornerDotType, CornerSquareType, DotType, ErrorCorrectionLevel, Extension,
};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// artqr: styled QR codes for links, Wi-Fi, contacts and email.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when it is missing.
    #[arg(short, long, global = true, default_value = "artqr.toml")]
    config: PathBuf,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Link to a web page.
    Url {
        /// Address; `https://` is added when missing.
        text: String,
        /// Route the scan through the redirect page first.
        #[arg(long)]
        preload: bool,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Join a Wi-Fi network.
    Wifi {
        #[arg(long)]
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
        /// wpa, wep or none.
        #[arg(long, default_value = "wpa")]
        encryption: Encryption,
        #[arg(long)]
        hidden: bool,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Contact card (vCard 3.0).
    Vcard {
        #[arg(long, default_value = "")]
        first: String,
        #[arg(long, default_value = "")]
        last: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Pre-filled email.
    Email {
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the redirect page for a URL such as `https://host/go?to=...`.
    Go {
        /// Page URL or bare query string. Without a target the page goes home.
        #[arg(default_value = "")]
        page: String,
    },
    /// Check the contrast between two hex colors.
    Contrast { foreground: Rgb, background: Background },
}

#[derive(Args, Debug, Default)]
struct StyleArgs {
    /// Dot color, e.g. `#2563eb`.
    #[arg(long)]
    dot_color: Option<Rgb>,
    /// Background color or `transparent`.
    #[arg(long)]
    background: Option<Background>,
    /// dots, rounded, classy, classy-rounded, square, extra-rounded.
    #[arg(long)]
    dot_type: Option<DotType>,
    /// dot, square, extra-rounded.
    #[arg(long)]
    corner_square_type: Option<CornerSquareType>,
    /// dot, square.
    #[arg(long)]
    corner_dot_type: Option<CornerDotType>,
    /// L, M, Q or H.
    #[arg(long)]
    ecl: Option<ErrorCorrectionLevel>,
    /// Image file placed in the middle of the code.
    #[arg(long)]
    logo: Option<PathBuf>,
    /// Caption under the code.
    #[arg(long)]
    label: Option<String>,
}

#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// png, jpeg, webp or svg. Defaults to the configured format.
    #[arg(long)]
    format: Option<Extension>,
    /// Output directory. Defaults to the configured one.
    #[arg(long)]
    out: Option<PathBuf>,
    /// File name without extension. Defaults to a timestamp.
    #[arg(long)]
    name: Option<String>,
    /// Print the resolved renderer options as JSON.
    #[arg(long)]
    print_options: bool,
    /// Do not draw the code in the terminal.
    #[arg(long)]
    no_display: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Url {
            text,
            preload,
            style,
            output,
        } => {
            let updates = vec![
                FieldUpdate::Kind(ContentKind::Url),
                FieldUpdate::Url(text),
                FieldUpdate::Preload(preload),
            ];
            generate(&config, updates, style, output)
        }
        Command::Wifi {
            ssid,
            password,
            encryption,
            hidden,
            style,
            output,
        } => {
            let updates = vec![
                FieldUpdate::Kind(ContentKind::Wifi),
                FieldUpdate::WifiSsid(ssid),
                FieldUpdate::WifiPassword(password),
                FieldUpdate::WifiEncryption(encryption),
                FieldUpdate::WifiHidden(hidden),
            ];
            generate(&config, updates, style, output)
        }
        Command::Vcard {
            first,
            last,
            phone,
            email,
            style,
            output,
        } => {
            let updates = vec![
                FieldUpdate::Kind(ContentKind::VCard),
                FieldUpdate::FirstName(first),
                FieldUpdate::LastName(last),
                FieldUpdate::Phone(phone),
                FieldUpdate::ContactEmail(email),
            ];
            generate(&config, updates, style, output)
        }
        Command::Email {
            to,
            subject,
            body,
            style,
            output,
        } => {
            let updates = vec![
                FieldUpdate::Kind(ContentKind::Email),
                FieldUpdate::EmailTo(to),
                FieldUpdate::EmailSubject(subject),
                FieldUpdate::EmailBody(body),
            ];
            generate(&config, updates, style, output)
        }
        Command::Go { page } => go(&config, &page),
        Command::Contrast {
            foreground,
            background,
        } => {
            let report = ContrastReport::check(foreground, background.effective());
            let verdict = if report.low_contrast { "low contrast" } else { "ok" };
            println!("{:.2}:1 ({verdict})", report.ratio);
            Ok(())
        }
    }
}

/// Loads the config file if present, otherwise falls back to defaults.
fn resolve_config(cli: &Cli) -> Result<Config> {
    if cli.config.exists() {
        load_config(&cli.config)
            .with_context(|| format!("could not load {}", cli.config.display()))
    } else {
        log::info!("{} not found, using built-in defaults", cli.config.display());
        Ok(Config::default())
    }
}

fn style_updates(style: StyleArgs) -> Result<Vec<FieldUpdate>> {
    let mut updates = Vec::new();
    if let Some(v) = style.dot_color {
        updates.push(FieldUpdate::DotColor(v));
    }
    if let Some(v) = style.background {
        updates.push(FieldUpdate::Background(v));
    }
    if let Some(v) = style.dot_type {
        updates.push(FieldUpdate::DotType(v));
    }
    if let Some(v) = style.corner_square_type {
        updates.push(FieldUpdate::CornerSquareType(v));
    }
    if let Some(v) = style.corner_dot_type {
        updates.push(FieldUpdate::CornerDotType(v));
    }
    if let Some(v) = style.ecl {
        updates.push(FieldUpdate::ErrorCorrection(v));
    }
    if let Some(path) = style.logo {
        let data_url =
            load_logo(&path).with_context(|| format!("could not load logo {}", path.display()))?;
        updates.push(FieldUpdate::Logo(Some(data_url)));
    }
    if let Some(v) = style.label {
        updates.push(FieldUpdate::Label(Some(v)));
    }
    Ok(updates)
}

fn generate(
    config: &Config,
    content: Vec<FieldUpdate>,
    style: StyleArgs,
    output: OutputArgs,
) -> Result<()> {
    let mut session = Session::new(
        config.app.origin.clone(),
        config.style.clone(),
        config.render.layout(),
    );
    session.apply(FieldUpdate::Extension(config.render.format));
    for update in content.into_iter().chain(style_updates(style)?) {
        session.apply(update);
    }
    if let Some(format) = output.format {
        session.apply(FieldUpdate::Extension(format));
    }

    // Low contrast is already reported through `log::warn!` by the resolver.
    let resolved = session.resolve();
    if output.print_options {
        println!("{}", serde_json::to_string_pretty(&resolved.options)?);
    }

    let sink = QrStylingSink::new(resolved.options);
    if !output.no_display {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        sink.append(&mut lock).context("could not draw the code")?;
    }
    let directory = output.out.unwrap_or_else(|| config.render.output_dir.clone());
    let path = sink
        .download(session.extension(), Some(directory.as_path()), output.name.as_deref())
        .context("could not export the code")?;
    println!("{}", path.display());
    Ok(())
}

/// Prints the progress bar on stderr and the final destination on stdout.
struct TerminalNavigator {
    home: String,
}

impl Navigator for TerminalNavigator {
    fn navigate(&mut self, url: &str) {
        println!("{url}");
    }

    fn go_home(&mut self) {
        println!("{}", self.home);
    }

    fn progress(&mut self, percent: f64) {
        let filled = (percent / 5.0).round() as usize;
        eprint!(
            "\r[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(20 - filled.min(20)),
            percent.round()
        );
        std::io::stderr().flush().ok();
    }

    fn redirecting(&mut self, display: &str) {
        eprintln!("\nRedirecting to {display}");
    }
}

fn go(config: &Config, page: &str) -> Result<()> {
    let target = RedirectTarget::from_page_url(page);
    let machine = RedirectMachine::new(target);
    let mut navigator = TerminalNavigator {
        home: config.home_url(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start the timer runtime")?;
    let outcome = runtime.block_on(async {
        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        redirect::run(machine, &mut navigator, token).await
    });

    if outcome == Outcome::Cancelled {
        eprintln!("\nCancelled.");
    }
    Ok(())
}
