use clap::Subcommand;

use super::rules::CheckUrlArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve(ServeArgs),

    /// Report whether a URL is exempt from anti-forgery validation
    CheckUrl(CheckUrlArgs),

    /// Print the loaded anti-CSRF rules as JSON
    Rules,
}
