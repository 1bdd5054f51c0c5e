//! The exception value and the process-wide current-exception slot.
//!
//! Every failure path in the compiler and the runtime feeds one
//! thread-local slot. The first failure fixes the identifier and message;
//! every later report only appends a call-stack frame, so the slot always
//! describes the upstream cause with the full chain of call sites that
//! propagated it. Catch sites copy the slot into a first-class
//! [`Exception`] value and clear it.
//!
//! Identifiers follow the stable `matte:<category>` taxonomy.

use std::cell::RefCell;
use std::fmt;

/// Stable exception identifiers.
pub mod ids {
    pub const BAD_ALLOC: &str = "matte:bad-alloc";
    pub const INVALID_INPUT_ARG: &str = "matte:invalid-input-arg";
    pub const INVALID_FILE: &str = "matte:invalid-file";
    pub const UNDEFINED_FUNCTION: &str = "matte:undefined-function";
    pub const UNDEFINED_SYMBOL: &str = "matte:undefined-symbol";
    pub const SIZE_MISMATCH: &str = "matte:size-mismatch";
    pub const ITERATOR: &str = "matte:iterator";
    pub const COMPILER: &str = "matte:compiler";
}

/// ANSI fragments used by exception display.
pub const ANSI_NORM: &str = "\x1b[0m";
pub const ANSI_BOLD: &str = "\x1b[01m";
pub const ANSI_RED: &str = "\x1b[01;31m";

/// One call-stack entry of an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub func: String,
    pub line: u64,
}

/// A first-class exception: identifier, message, accreted call stack and
/// chained causes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exception {
    pub id: String,
    pub msg: String,
    pub stack: Vec<Frame>,
    pub causes: Vec<Exception>,
}

impl Exception {
    pub fn new(id: impl Into<String>, msg: impl Into<String>) -> Exception {
        Exception { id: id.into(), msg: msg.into(), stack: Vec::new(), causes: Vec::new() }
    }

    /// Append a call-site frame. Frames accumulate outward as the
    /// exception propagates up the call chain.
    pub fn add_call(&mut self, file: &str, func: &str, line: u64) {
        self.stack.push(Frame { file: file.into(), func: func.into(), line });
    }

    /// Append a copy of `cause` to the cause chain. This is the
    /// `addCause` method reachable from user code.
    pub fn add_cause(&mut self, cause: &Exception) {
        self.causes.push(cause.clone());
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{ANSI_RED}error:{ANSI_NORM} {ANSI_BOLD}{}:{ANSI_NORM}\n {}\n",
            self.id, self.msg
        )?;
        writeln!(f, "call stack:")?;
        for (i, frame) in self.stack.iter().enumerate() {
            writeln!(
                f,
                " [{i}] {ANSI_BOLD}{}:{}{ANSI_NORM} within function '{ANSI_BOLD}{}{ANSI_NORM}'",
                frame.file, frame.line, frame.func
            )?;
        }
        Ok(())
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Exception>> = const { RefCell::new(None) };
}

/// Report a failure. The first report of a run creates the exception with
/// `id` and `msg`; any report appends a `(file, func, line)` frame.
pub fn add(file: &str, func: &str, line: u64, id: &str, msg: impl Into<String>) {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        let e = slot.get_or_insert_with(|| Exception::new(id, msg.into()));
        e.add_call(file, func, line);
    });
}

/// Whether a failure is pending.
pub fn check() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Copy of the pending exception, if any. The slot stays populated; the
/// emitted runtime clears it only when a `catch` consumes the value.
pub fn get() -> Option<Exception> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Take and clear the pending exception.
pub fn take() -> Option<Exception> {
    CURRENT.with(|slot| slot.borrow_mut().take())
}

/// Drop any pending exception.
pub fn clear() {
    CURRENT.with(|slot| *slot.borrow_mut() = None);
}

/// Report a failure in the current-exception slot, stamping the current
/// source location. Usage: `error!("matte:size-mismatch", "operand sizes
/// do not match")`.
#[macro_export]
macro_rules! error {
    ($id:expr, $($fmt:tt)+) => {
        $crate::except::add(file!(), module_path!(), line!() as u64, $id, format!($($fmt)+))
    };
}
