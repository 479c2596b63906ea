use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

use crate::{cases::Case, Chopper};

/// A panic caught while running a candidate.
#[derive(Debug)]
pub struct Fault {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Backtrace,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Failure<'a> {
    /// The candidate answered but the answer was wrong.
    Mismatch { case: &'a Case, actual: isize },
    /// The candidate panicked.
    Panicked { case: &'a Case, fault: Fault },
}

impl Failure<'_> {
    pub fn case(&self) -> &Case {
        match self {
            Failure::Mismatch { case, .. } | Failure::Panicked { case, .. } => case,
        }
    }
}

/// Runs `chopper` over `cases`, stopping at the first failure.
///
/// Returns the number of cases that passed. Panics raised by `chopper` are caught and turned
/// into [`Failure::Panicked`], so the caller can go on with the next candidate.
pub fn run<'a>(
    chopper: &dyn Chopper,
    cases: impl IntoIterator<Item = &'a Case>,
) -> Result<usize, Failure<'a>> {
    let mut passed = 0;
    for case in cases {
        let actual = catch_fault(|| chopper.chop(case.target, &case.sequence))
            .map_err(|fault| Failure::Panicked { case, fault })?;
        if !case.accepts(actual) {
            return Err(Failure::Mismatch { case, actual });
        }
        passed += 1;
    }
    Ok(passed)
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static LAST_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Installs a panic hook that records panics on threads currently inside [`catch_fault`] and
/// defers to the previous hook everywhere else.
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.with(Cell::get) {
                return previous(info);
            }
            let fault = Fault {
                message: payload_message(info.payload()),
                location: info.location().map(|l| l.to_string()),
                backtrace: Backtrace::force_capture(),
            };
            LAST_FAULT.with(|slot| *slot.borrow_mut() = Some(fault));
        }));
    });
}

fn catch_fault<R>(f: impl FnOnce() -> R) -> Result<R, Fault> {
    install_hook();
    LAST_FAULT.with(|slot| slot.borrow_mut().take());
    CAPTURING.with(|c| c.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(false));

    result.map_err(|payload| {
        LAST_FAULT
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| Fault {
                message: payload_message(&*payload),
                location: None,
                backtrace: Backtrace::disabled(),
            })
    })
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
