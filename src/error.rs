use std::{error::Error, fmt, io};

// 待ち時間切れがどちらの入口で起きたか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Eat,
    Leave,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Eat => write!(f, "sit down"),
            Phase::Leave => write!(f, "leave the table"),
        }
    }
}

#[derive(Debug)]
pub enum SimError {
    // ひとりで食べるなというルールは 2 人未満では満たせない
    TooFewStudents(i64),
    InvalidCount(String),
    UnknownOption(String),
    InvalidSetting { name: &'static str, value: String },
    Io(io::Error),
    Spawn { id: usize, source: io::Error },
    StudentPanicked(usize),
    TaskFailed(usize, String),
    TimedOut { id: usize, phase: Phase },
    HallClosed,
}

pub type Result<T> = std::result::Result<T, SimError>;

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::TooFewStudents(n) => write!(
                f,
                "at least 2 students are needed so that nobody dines alone (got {n})"
            ),
            SimError::InvalidCount(s) => write!(f, "invalid number of students: {s:?}"),
            SimError::UnknownOption(s) => write!(f, "unknown option: {s}"),
            SimError::InvalidSetting { name, value } => {
                write!(f, "invalid value for {name}: {value:?}")
            }
            SimError::Io(e) => write!(f, "i/o error: {e}"),
            SimError::Spawn { id, source } => {
                write!(f, "failed to spawn student {id}: {source}")
            }
            SimError::StudentPanicked(id) => write!(f, "student {id} panicked"),
            SimError::TaskFailed(id, reason) => write!(f, "student {id} failed: {reason}"),
            SimError::TimedOut { id, phase } => {
                write!(f, "student {id} gave up waiting to {phase}")
            }
            SimError::HallClosed => write!(f, "the dining hall is closed"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimError::Io(e) => Some(e),
            SimError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        SimError::Io(e)
    }
}
