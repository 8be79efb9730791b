//! Settings are read from a TOML file and overridden from `KEYTURN__*`
//! environment variables, e.g. `KEYTURN__TOKEN__ACCESS_SECRET`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
