//! Command dispatch.
//!
//! A [`CommandDispatcher`] holds one table of global commands and one table
//! per [`TabKind`]. A tab-kind command shadows a global command of the same
//! name while a tab of that kind is focused.
//!
//! Dispatch happens in two steps. [`CommandDispatcher::prepare`] resolves the
//! handler and parses the arguments into an owned [`Invocation`], which no
//! longer borrows the dispatcher; [`Invocation::run`] then hands the context
//! (the session that owns the dispatcher) to the handler.

mod args;
pub(crate) mod global;
pub(crate) mod tab;

use std::{collections::BTreeMap, fmt, fmt::Write as _};

pub use args::{ArgGrammar, Args, shell_split, split_command};

use crate::{Session, error::CommandError, tabs::TabKind};

/// Dispatcher holding every built-in command.
pub(crate) fn standard() -> CommandDispatcher<Session> {
    let mut dispatcher = CommandDispatcher::new();
    global::register(&mut dispatcher);
    tab::register(&mut dispatcher);
    dispatcher
}

/// Command handler.
pub type Handler<C> = fn(&mut C, &Args) -> Result<(), CommandError>;

/// Command descriptor.
pub struct CommandSpec<C> {
    /// Name, without prefix.
    pub name: &'static str,
    /// Argument synopsis, e.g. `<jid> [text]`.
    pub usage: &'static str,
    /// One-line summary.
    pub short: &'static str,
    /// Full help text.
    pub desc: &'static str,
    /// Argument grammar.
    pub grammar: ArgGrammar,
    /// Handler.
    pub handler: Handler<C>,
}

impl<C> Clone for CommandSpec<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for CommandSpec<C> {}

impl<C> fmt::Debug for CommandSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("grammar", &self.grammar)
            .finish_non_exhaustive()
    }
}

/// A resolved command with parsed arguments.
pub struct Invocation<C> {
    name: &'static str,
    handler: Handler<C>,
    args: Args,
}

impl<C> Invocation<C> {
    /// Command name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parsed arguments.
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Run the handler.
    pub fn run(self, ctx: &mut C) -> Result<(), CommandError> {
        (self.handler)(ctx, &self.args)
    }
}

impl<C> fmt::Debug for Invocation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation").field("name", &self.name).field("args", &self.args).finish()
    }
}

/// Command tables with tab-then-global resolution.
pub struct CommandDispatcher<C> {
    global: BTreeMap<&'static str, CommandSpec<C>>,
    by_kind: BTreeMap<TabKind, BTreeMap<&'static str, CommandSpec<C>>>,
}

impl<C> Default for CommandDispatcher<C> {
    fn default() -> Self {
        Self { global: BTreeMap::new(), by_kind: BTreeMap::new() }
    }
}

impl<C> fmt::Debug for CommandDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("global", &self.global.keys().collect::<Vec<_>>())
            .field("by_kind", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> CommandDispatcher<C> {
    /// Empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global command, replacing any previous one of that name.
    pub fn register_global(&mut self, spec: CommandSpec<C>) {
        self.global.insert(spec.name, spec);
    }

    /// Remove a global command, returning it.
    pub fn unregister_global(&mut self, name: &str) -> Option<CommandSpec<C>> {
        self.global.remove(name)
    }

    /// Whether `name` is bound globally or for any tab kind.
    pub fn is_registered(&self, name: &str) -> bool {
        self.global.contains_key(name) || self.by_kind.values().any(|t| t.contains_key(name))
    }

    /// Register a command for tabs of `kind`.
    pub fn register_tab(&mut self, kind: TabKind, spec: CommandSpec<C>) {
        self.by_kind.entry(kind).or_default().insert(spec.name, spec);
    }

    /// Resolve `name` for a focused tab of `kind`.
    pub fn lookup(&self, kind: TabKind, name: &str) -> Option<&CommandSpec<C>> {
        self.by_kind.get(&kind).and_then(|table| table.get(name)).or_else(|| self.global.get(name))
    }

    /// Resolve and parse `line`, the text after `prefix`.
    ///
    /// The prefix only shapes error messages.
    pub fn prepare(
        &self,
        kind: TabKind,
        line: &str,
        prefix: &str,
    ) -> Result<Invocation<C>, CommandError> {
        let (name, rest) = split_command(line);
        let spec = self.lookup(kind, name).ok_or_else(|| CommandError::UnknownCommand {
            prefix: prefix.to_string(),
            name: name.to_string(),
        })?;
        let args = spec.grammar.parse(rest).map_err(|source| CommandError::Argument {
            prefix: prefix.to_string(),
            command: spec.name.to_string(),
            source,
        })?;

        tracing::debug!(command = spec.name, ?kind, "dispatching command");
        Ok(Invocation { name: spec.name, handler: spec.handler, args })
    }

    /// Names visible from a tab of `kind`, sorted, without duplicates.
    pub fn names(&self, kind: TabKind) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.global.keys().copied().collect();
        if let Some(table) = self.by_kind.get(&kind) {
            names.extend(table.keys().copied());
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Help for one command as seen from a tab of `kind`.
    pub fn help(&self, kind: TabKind, name: &str, prefix: &str) -> Option<String> {
        let spec = self.lookup(kind, name)?;
        let usage = if spec.usage.is_empty() {
            format!("{prefix}{}", spec.name)
        } else {
            format!("{prefix}{} {}", spec.name, spec.usage)
        };
        Some(format!("Usage: {usage}\n{}", spec.desc))
    }

    /// Summary of every command visible from a tab of `kind`.
    pub fn overview(&self, kind: TabKind, prefix: &str) -> String {
        let mut out = String::from("Global commands:");
        for spec in self.global.values() {
            let _ = write!(out, "\n  {prefix}{}: {}", spec.name, spec.short);
        }
        if let Some(table) = self.by_kind.get(&kind).filter(|t| !t.is_empty()) {
            let _ = write!(out, "\nCommands for this tab:");
            for spec in table.values() {
                let _ = write!(out, "\n  {prefix}{}: {}", spec.name, spec.short);
            }
        }
        let _ = write!(out, "\nType {prefix}help <command> for details.");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    fn record(log: &mut Log, args: &Args) -> Result<(), CommandError> {
        log.0.push(args.iter().collect::<Vec<_>>().join("|"));
        Ok(())
    }

    fn record_tab(log: &mut Log, _: &Args) -> Result<(), CommandError> {
        log.0.push("tab".into());
        Ok(())
    }

    fn spec(name: &'static str, handler: Handler<Log>) -> CommandSpec<Log> {
        CommandSpec {
            name,
            usage: "[x]",
            short: "test",
            desc: "Test command.",
            grammar: ArgGrammar::Quoted { min: 1, max: 2, defaults: &[None] },
            handler,
        }
    }

    #[test]
    fn tab_command_shadows_global() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_global(spec("close", record));
        dispatcher.register_tab(TabKind::MultiPartyRoom, spec("close", record_tab));

        let mut log = Log::default();
        dispatcher.prepare(TabKind::MultiPartyRoom, "close a", "/").unwrap().run(&mut log).unwrap();
        dispatcher.prepare(TabKind::Direct, "close a", "/").unwrap().run(&mut log).unwrap();
        assert_eq!(log.0, ["tab", "a"]);
    }

    #[test]
    fn unknown_and_arity_errors() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_global(spec("foo", record));

        let err = dispatcher.prepare(TabKind::Direct, "bar", "/").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand { prefix: "/".into(), name: "bar".into() });

        let err = dispatcher.prepare(TabKind::Direct, "foo", "!").unwrap_err();
        assert!(matches!(err, CommandError::Argument { ref command, .. } if command == "foo"));
        assert_eq!(err.to_string(), "!foo: expected at least 1 argument(s), got 0");
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_global(spec("foo", record));
        assert!(dispatcher.prepare(TabKind::Direct, "FOO x", "/").is_err());
    }

    #[test]
    fn help_uses_prefix() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_global(spec("foo", record));
        assert_eq!(
            dispatcher.help(TabKind::Direct, "foo", "/").as_deref(),
            Some("Usage: /foo [x]\nTest command.")
        );
        assert!(dispatcher.overview(TabKind::Direct, "/").contains("/foo: test"));
    }
}
