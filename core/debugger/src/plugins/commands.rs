//! The session commands: `initialize`, `attach`, `disconnect`,
//! `configurationDone` and `threads`.

use super::Plugin;
use crate::{
    dap::{
        Capabilities, DisconnectArguments, InitializeRequestArguments, Thread,
        ThreadsResponseBody, to_body,
    },
    hub::{HookData, names},
    session::{DebugSession, THREAD_ID},
};
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::commands";

/// Registers the commands that are not owned by a feature plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct DapCommands;

impl Plugin for DapCommands {
    fn name(&self) -> &'static str {
        "DapCommonCommand"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        let hub = session.hub();
        hub.register_hook_name(names::ON_INITIALIZE, self.name());
        hub.register_hook_name(names::ON_CONFIGURATION_DONE, self.name());

        session.register_command("initialize", |_, request| {
            let args: InitializeRequestArguments = request.parse_arguments()?;
            log::info!(
                target: LOG_TARGET,
                "Handling initialize command from {} (adapter {})",
                args.client_name.or(args.client_id).as_deref().unwrap_or("unknown client"),
                args.adapter_id.as_deref().unwrap_or("unknown")
            );
            let capabilities = Capabilities {
                supports_configuration_done_request: true,
                supports_loaded_sources_request: true,
            };
            Ok(Some(to_body(&capabilities)?))
        });

        session.register_command("attach", |session, _| {
            log::info!(target: LOG_TARGET, "Handling attach command");
            session.set_attached(true);
            session.push_event("initialized", None);
            Ok(None)
        });

        session.register_command("disconnect", |session, request| {
            let args: DisconnectArguments = request.parse_arguments()?;
            log::info!(target: LOG_TARGET, "Handling disconnect command");
            if args.terminate_debuggee == Some(true) {
                log::warn!(target: LOG_TARGET, "Ignoring terminateDebuggee, the debuggee is not owned by the bridge");
            }
            session.set_attached(false);
            session.end_waiting();
            Ok(None)
        });

        session.register_command("configurationDone", |session, _| {
            log::info!(target: LOG_TARGET, "Handling configurationDone command");
            session.trigger(names::ON_CONFIGURATION_DONE, &HookData::None);
            Ok(None)
        });

        session.register_command("threads", |session, _| {
            log::info!(target: LOG_TARGET, "Handling threads command");
            session.trigger(names::ON_INITIALIZE, &HookData::None);
            let body = ThreadsResponseBody {
                threads: vec![Thread {
                    id: THREAD_ID,
                    name: session.config().thread_name.clone(),
                }],
            };
            Ok(Some(to_body(&body)?))
        });
    }
}
