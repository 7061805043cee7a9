//! Built-in plugins.
//!
//! A plugin contributes global commands while it is loaded and may react to
//! clock ticks. Only plugins compiled into the binary exist; `/load` and the
//! `plugins_autoload` option pick them by name from [`AVAILABLE`].

use chrono::NaiveDate;

use crate::{
    Session,
    command::{ArgGrammar, Args, CommandSpec},
    error::CommandError,
    tabs::TabKind,
    transport::{capability, domain_part},
};

/// Extension loaded into a running session.
pub trait Plugin: Send {
    /// Name used by `/load` and `plugins_autoload`.
    fn name(&self) -> &'static str;

    /// Global commands registered while the plugin is loaded.
    fn commands(&self) -> &'static [CommandSpec<Session>] {
        &[]
    }

    /// Called on every clock tick.
    fn on_tick(&mut self, _session: &mut Session) {}
}

type Constructor = fn() -> Box<dyn Plugin>;

/// Plugins that can be loaded, by name.
pub const AVAILABLE: &[(&str, Constructor)] = &[
    ("day_change", || Box::new(DayChange::default())),
    ("uptime", || Box::new(Uptime)),
];

/// Names of the loadable plugins, sorted.
pub fn available() -> impl Iterator<Item = &'static str> {
    AVAILABLE.iter().map(|(name, _)| *name)
}

/// New instance of the plugin called `name`.
pub fn instantiate(name: &str) -> Option<Box<dyn Plugin>> {
    AVAILABLE.iter().find(|(n, _)| *n == name).map(|(_, build)| build())
}

/// `/uptime`: ask our server how long it has been running.
struct Uptime;

impl Plugin for Uptime {
    fn name(&self) -> &'static str {
        "uptime"
    }

    fn commands(&self) -> &'static [CommandSpec<Session>] {
        &[CommandSpec {
            name: "uptime",
            usage: "",
            short: "Server uptime",
            desc: "Ask the server how long it has been running.",
            grammar: ArgGrammar::Ignored,
            handler: uptime,
        }]
    }
}

fn uptime(session: &mut Session, _: &Args) -> Result<(), CommandError> {
    session.require_capability(capability::LAST_ACTIVITY)?;
    let server = session.link.jid().map(domain_part).unwrap_or_default().to_string();
    session.query_last_activity(server);
    Ok(())
}

/// Marks midnight in every conversation tab.
#[derive(Default)]
struct DayChange {
    today: Option<NaiveDate>,
}

impl Plugin for DayChange {
    fn name(&self) -> &'static str {
        "day_change"
    }

    fn on_tick(&mut self, session: &mut Session) {
        let today = session.now().date_naive();
        let previous = self.today.replace(today);
        if previous.is_none_or(|day| day == today) {
            return;
        }
        let line = format!("Day changed to {}", today.format("%Y-%m-%d"));
        let now = session.now();
        for tab in session.tabs.iter_mut().filter(|tab| tab.kind() != TabKind::Informational) {
            tab.add_info(now, line.clone());
        }
        session.mark_dirty();
    }
}
