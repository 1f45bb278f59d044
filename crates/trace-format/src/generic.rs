use std::{fmt::Display, io::BufRead};

use anyhow::{Error, anyhow};

/// The kind of work a single trace line describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Cpu,
    Syscall,
    EndIo,
    Fork,
    Exec,
    IfChild,
    IfParent,
    EndIf,
}

impl Activity {
    /// Returns the keyword used for this activity in text traces.
    pub fn keyword(&self) -> &'static str {
        match self {
            Activity::Cpu => "CPU",
            Activity::Syscall => "SYSCALL",
            Activity::EndIo => "END_IO",
            Activity::Fork => "FORK",
            Activity::Exec => "EXEC",
            Activity::IfChild => "IF_CHILD",
            Activity::IfParent => "IF_PARENT",
            Activity::EndIf => "ENDIF",
        }
    }

    /// Looks up the activity for a keyword. Matching ignores ASCII case.
    pub fn try_from_keyword(keyword: &str) -> Result<Self, Error> {
        match keyword.to_ascii_uppercase().as_str() {
            "CPU" => Ok(Activity::Cpu),
            "SYSCALL" => Ok(Activity::Syscall),
            "END_IO" => Ok(Activity::EndIo),
            "FORK" => Ok(Activity::Fork),
            "EXEC" => Ok(Activity::Exec),
            "IF_CHILD" => Ok(Activity::IfChild),
            "IF_PARENT" => Ok(Activity::IfParent),
            "ENDIF" => Ok(Activity::EndIf),
            _ => Err(anyhow!("Activity `{keyword}` was not recognized")),
        }
    }

    /// Branch markers only structure a fork and are never executed themselves.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            Activity::IfChild | Activity::IfParent | Activity::EndIf
        )
    }
}

impl Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single parsed line of a trace.
///
/// `parameter` is the burst length for [`Activity::Cpu`] and the
/// interrupt/device number for [`Activity::Syscall`] and [`Activity::EndIo`].
/// Other activities carry it along without interpreting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    activity: Activity,
    parameter: u32,
    program: Option<String>,
}

impl TraceEvent {
    pub fn new(activity: Activity, parameter: u32) -> Self {
        Self {
            activity,
            parameter,
            program: None,
        }
    }

    pub fn exec<S: Into<String>>(program: S, parameter: u32) -> Self {
        Self {
            activity: Activity::Exec,
            parameter,
            program: Some(program.into()),
        }
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn parameter(&self) -> u32 {
        self.parameter
    }

    /// The program name, only present on [`Activity::Exec`] events.
    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.program {
            Some(program) => write!(f, "{} {}, {}", self.activity, program, self.parameter),
            None => write!(f, "{}, {}", self.activity, self.parameter),
        }
    }
}

/// Shared iterator item type for [`Parser`] implementations.
pub type EventResult = Result<TraceEvent, Error>;

/// Common trait for parsers of traces
pub trait Parser {
    type Iter<R: BufRead>: Iterator<Item = EventResult>;

    /// Parses a trace of some specific format.
    fn parse<R: BufRead>(&mut self, input: R) -> Result<Self::Iter<R>, Error>;
}
