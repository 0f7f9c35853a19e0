//! Local preference commands. Nothing here touches the backend.
#![allow(clippy::print_stdout)]

use bazaar_core::{AccentColor, ThemeMode};
use bazaar_storefront::Storefront;
use clap::Subcommand;

use super::{CommandError, CommandResult, ensure_stored};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show or set the theme (`light`, `dark`, or `toggle`)
    Theme { mode: Option<String> },
    /// Show or set the accent color (`#rgb`, `#rrggbb`, or `reset`)
    Color { color: Option<String> },
    /// Show recent searches
    History {
        /// Forget all recent searches and viewed products
        #[arg(long)]
        clear: bool,
    },
}

pub fn prefs(storefront: &Storefront, action: PrefsAction) -> CommandResult {
    let prefs = storefront.preferences();

    match action {
        PrefsAction::Theme { mode: None } => println!("{}", prefs.theme()),
        PrefsAction::Theme { mode: Some(mode) } if mode == "toggle" => {
            println!("{}", prefs.toggle_theme());
        }
        PrefsAction::Theme { mode: Some(mode) } => {
            let mode = mode
                .parse::<ThemeMode>()
                .map_err(CommandError::InvalidArgument)?;
            ensure_stored(storefront, prefs.set_theme(mode))?;
            println!("{mode}");
        }
        PrefsAction::Color { color: None } => match prefs.accent_color() {
            Some(color) => println!("{color}"),
            None => println!("default"),
        },
        PrefsAction::Color { color: Some(color) } if color == "reset" => {
            ensure_stored(storefront, prefs.reset_accent_color())?;
            println!("default");
        }
        PrefsAction::Color { color: Some(color) } => {
            let color = AccentColor::parse(&color)
                .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
            ensure_stored(storefront, prefs.set_accent_color(&color))?;
            println!("{color}");
        }
        PrefsAction::History { clear: true } => {
            let cleared = prefs.clear_recent_searches() & prefs.clear_recently_viewed();
            ensure_stored(storefront, cleared)?;
            println!("History cleared.");
        }
        PrefsAction::History { clear: false } => {
            for query in prefs.recent_searches() {
                println!("{query}");
            }
        }
    }
    Ok(())
}
