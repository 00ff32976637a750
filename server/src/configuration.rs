use clap::Parser;

/// CLI surface for the print server. The only argument spec §6 requires
/// is the listen port; the device backend and pricing overrides are
/// additive operational knobs (see `SPEC_FULL.md`'s ambient-stack
/// section) in the same `clap::Parser` + `env` style the teacher's
/// `App` used.
#[derive(Parser)]
#[command(name = "print-server")]
pub struct App {
    /// Address to accept client connections on.
    #[arg(env = "PRINT_SERVER_LISTEN", default_value = "0.0.0.0:9100")]
    pub listen: String,

    /// Backend used to reach printer devices.
    #[arg(long, env = "PRINT_SERVER_BACKEND", value_enum, default_value = "pty")]
    pub backend: Backend,

    /// `printf`-style pattern with one `{}` placeholder for the printer
    /// id, used when `--backend pty`. Mirrors `printer_management.c`'s
    /// `tty_path`.
    #[arg(long, env = "PRINT_SERVER_TTY_PATTERN", default_value = "/dev/pts/{}")]
    pub tty_pattern: String,

    /// Lines printed per page before a form-feed newline is emitted
    /// (spec §6's `lines_per_page` constant).
    #[arg(
        long,
        env = "PRINT_SERVER_LINES_PER_PAGE",
        default_value_t = printd::DEFAULT_LINES_PER_PAGE
    )]
    pub lines_per_page: u32,

    /// Billed cost per page (spec §6's `page_price` constant).
    #[arg(
        long,
        env = "PRINT_SERVER_PAGE_PRICE",
        default_value_t = printd::DEFAULT_PAGE_PRICE
    )]
    pub page_price: f64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Backend {
    /// Talk to real pseudoterminal character devices.
    Pty,
    /// In-memory sink for local development without real devices.
    Simulated,
}
