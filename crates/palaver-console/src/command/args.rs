//! Command line tokenising and argument grammars.

use crate::error::ArgumentError;

/// How a command wants its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgGrammar {
    /// Shell-like words with `"..."` grouping.
    ///
    /// At least `min` words are required. Words past `max` are folded into
    /// the last slot; `usize::MAX` accepts any number of words. With `max`
    /// zero there is no slot and every word is dropped. Missing optional
    /// slot `min + i` takes `defaults[i]`.
    Quoted {
        /// Required words.
        min: usize,
        /// Slots; the last one absorbs any surplus.
        max: usize,
        /// Defaults for the optional slots, in order.
        defaults: &'static [Option<&'static str>],
    },
    /// The rest of the line, untouched, as a single argument.
    Raw,
    /// No arguments; trailing text is discarded.
    Ignored,
}

impl ArgGrammar {
    /// Quoted grammar without defaults.
    pub const fn quoted(min: usize, max: usize) -> Self {
        Self::Quoted { min, max, defaults: &[] }
    }

    /// Parse the text after the command name.
    pub fn parse(&self, rest: &str) -> Result<Args, ArgumentError> {
        match *self {
            Self::Ignored => Ok(Args::default()),
            Self::Raw => Ok(Args { values: vec![Some(rest.to_string())] }),
            Self::Quoted { min, max, defaults } => quoted(rest, min, max, defaults),
        }
    }
}

/// Parsed arguments. Optional slots without a value or default are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: Vec<Option<String>>,
}

impl Args {
    /// Arguments from explicit values.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { values: values.into_iter().map(|v| Some(v.into())).collect() }
    }

    /// Argument in slot `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no slots.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present values, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter_map(|v| v.as_deref())
    }

    /// Raw argument, or the empty string.
    pub fn raw(&self) -> &str {
        self.get(0).unwrap_or_default()
    }
}

fn quoted(
    rest: &str,
    min: usize,
    max: usize,
    defaults: &[Option<&str>],
) -> Result<Args, ArgumentError> {
    let mut words = shell_split(rest);
    if words.len() < min {
        return Err(ArgumentError { min, got: words.len() });
    }

    match max {
        0 => words.clear(),
        max if words.len() > max => {
            let tail = words.split_off(max - 1).join(" ");
            words.push(tail);
        },
        _ => {},
    }

    let mut values: Vec<Option<String>> = words.into_iter().map(Some).collect();
    for (i, default) in defaults.iter().enumerate() {
        let slot = min + i;
        if slot >= values.len() {
            values.resize(slot + 1, None);
        }
        if values[slot].is_none() {
            values[slot] = default.map(str::to_string);
        }
    }
    Ok(Args { values })
}

/// Split on whitespace, grouping `"..."` into one word.
///
/// Inside quotes `\"` is a literal quote. Only double quotes group; an
/// unterminated quote runs to the end of the line.
pub fn shell_split(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if in_quotes && chars.peek() == Some(&'"') => {
                word.push('"');
                chars.next();
            },
            '"' => {
                in_quotes = !in_quotes;
                in_word = true;
            },
            c if c.is_whitespace() && !in_quotes => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            },
            c => {
                word.push(c);
                in_word = true;
            },
        }
    }
    if in_word {
        words.push(word);
    }
    words
}

/// Split a prefixed line into command name and the text after it.
///
/// The name ends at the first whitespace; the rest starts after that single
/// separator.
pub fn split_command(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(pos) => {
            let sep = line[pos..].chars().next().map_or(1, char::len_utf8);
            (&line[..pos], &line[pos + sep..])
        },
        None => (line, ""),
    }
}
