//! The attach lifecycle.

use super::Plugin;
use crate::{
    hub::{HookData, names},
    session::DebugSession,
};
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::attach";

/// Keeps the engine's debuggee set in line with the attach state.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttachManager;

impl Plugin for AttachManager {
    fn name(&self) -> &'static str {
        "AttachManager"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        log::debug!(target: LOG_TARGET, "Setting up AttachManager");
        let hub = session.hub();

        hub.on(names::ON_DEBUGGER_ATTACHED, self.name(), |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger attached");
            session.host().add_all_globals_as_debuggees();
            Ok(())
        });

        hub.on(names::ON_DEBUGGER_DETACHED, self.name(), |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger detached");
            session.host().remove_all_debuggees();
            Ok(())
        });

        hub.on(names::ON_NEW_GLOBAL_OBJECT, self.name(), |session, data| {
            if !session.is_attached() {
                return Ok(());
            }
            if let HookData::Global(global) = data {
                log::debug!(target: LOG_TARGET, "Added global object {global} as debuggee");
                session.host().add_debuggee(*global);
            }
            Ok(())
        });

        hub.on(names::ON_UNCAUGHT_EXCEPTION, self.name(), |_, data| {
            if let HookData::Exception(description) = data {
                log::error!(target: LOG_TARGET, "Uncaught exception: {description}");
            }
            Ok(())
        });
    }
}
