//! Lazy class initialisation (JVMS §5.5).
//!
//! An instruction that needs its class initialised does not run the
//! initialiser itself. It rewinds its frame and parks it in
//! [`FrameState::AwaitingInitialisation`]; the interpreter loop then schedules
//! the initialiser on the same thread and re-executes the instruction once
//! the class is ready.

use std::rc::Rc;

use runtime::object::ClassRef;
use tracing::debug;

use crate::frame::{Frame, FrameState};

/// Returns `true` when the instruction may go ahead. When it returns `false` the
/// frame has been rewound and the instruction must return without side effects.
pub fn trigger(frame: &mut Frame, class: &ClassRef) -> bool {
    if !class.read().needs_initialisation() {
        return true;
    }

    debug!(
        "{} waits for {} to initialise",
        frame.method().name(),
        class.read().name()
    );

    frame.rewind();
    frame.set_state(FrameState::AwaitingInitialisation(Rc::clone(class)));
    false
}
