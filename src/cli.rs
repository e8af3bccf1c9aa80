use clap::builder::{styling::AnsiColor, Styles};
use clap::{Parser, Subcommand};

const ABOUT: &str = "Daily umbrella and sunscreen reminders by email";

const LONG_ABOUT: &str = "
Checks the weather for every subscriber and sends an email at 8:00 AM local time when rain is
expected or the daily high passes the heat threshold.

Settings live in config.toml under the platform config directory (created on first run). The
weather API key and SMTP credentials are read from the environment or a .env file:
WEATHER_API_KEY, EMAIL_ADDRESS, EMAIL_PASSWORD.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles = STYLES, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the evaluator until Ctrl+C
    Serve,

    /// Evaluate every active subscriber now and send any alerts
    CheckNow,

    /// Subscribe an email address to a location
    Subscribe {
        email: String,
        city: String,
        #[arg(long, short)]
        zipcode: Option<String>,
        #[arg(long, short, default_value = "US")]
        country: String,
    },

    /// Stop sending alerts to an email address
    Unsubscribe { email: String },

    /// Show whether an email address is subscribed
    Status { email: String },

    /// List active subscribers
    List,

    /// Fetch and analyze today's weather for a location without sending anything
    Preview {
        city: String,
        #[arg(long, short)]
        zipcode: Option<String>,
        #[arg(long, short, default_value = "US")]
        country: String,
    },

    /// Send a test email to check SMTP settings
    TestEmail {
        #[arg(long)]
        to: String,
    },

    /// Show the timezone and next 8:00 AM for a UTC offset in seconds
    NextRun {
        #[arg(long, allow_hyphen_values = true)]
        offset: i32,
    },
}
