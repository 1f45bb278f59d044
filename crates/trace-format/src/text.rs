use std::io::{BufRead, Lines};

use anyhow::{Context, Error, bail, ensure};

use crate::generic::{Activity, EventResult, Parser, TraceEvent};

/// A parser for line-oriented text traces.
///
/// Each line holds an activity keyword, optionally followed by an integer
/// parameter and, for `EXEC`, a program name. Commas and whitespace both
/// separate tokens, so `EXEC program1, 50` and `EXEC, 50, program1` describe
/// the same event. Blank lines and lines starting with `#` are skipped.
pub struct TextTraceParser;

impl TextTraceParser {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for TextTraceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for TextTraceParser {
    type Iter<R: BufRead> = TextTraceIterator<R>;

    fn parse<R: BufRead>(&mut self, input: R) -> Result<Self::Iter<R>, Error> {
        Ok(TextTraceIterator {
            lines: input.lines(),
            line_number: 0,
        })
    }
}

pub struct TextTraceIterator<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> Iterator for TextTraceIterator<R> {
    type Item = EventResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;

            let parsed = line
                .map_err(Error::from)
                .and_then(|line| parse_line(&line))
                .with_context(|| format!("Invalid trace line {}", self.line_number));

            match parsed {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn parse_line(line: &str) -> Result<Option<TraceEvent>, Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty());

    let Some(keyword) = tokens.next() else {
        // A line made of separators only
        return Ok(None);
    };
    let activity = Activity::try_from_keyword(keyword)?;

    let mut parameter = None;
    let mut program = None;
    for token in tokens {
        if let Ok(value) = token.parse::<i64>() {
            ensure!(parameter.is_none(), "{activity} takes at most one parameter");
            ensure!(value >= 0, "Parameter of {activity} must not be negative: {value}");
            parameter = Some(u32::try_from(value).with_context(|| {
                format!("Parameter of {activity} is out of range: {value}")
            })?);
        } else {
            ensure!(program.is_none(), "Unexpected token `{token}`");
            program = Some(token.to_owned());
        }
    }

    let parameter = parameter.unwrap_or(0);
    match (activity, program) {
        (Activity::Exec, Some(program)) => Ok(Some(TraceEvent::exec(program, parameter))),
        (Activity::Exec, None) => bail!("EXEC requires a program name"),
        (_, Some(program)) => bail!("{activity} does not take a program name (found `{program}`)"),
        (_, None) => Ok(Some(TraceEvent::new(activity, parameter))),
    }
}
