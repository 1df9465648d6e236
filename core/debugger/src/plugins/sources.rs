//! The source table: `loadedSources`, `source` and `loadedSource` events.

use super::Plugin;
use crate::{
    dap::{
        LoadedSourceEventBody, LoadedSourcesResponseBody, Source, SourceArguments,
        SourceResponseBody, to_body,
    },
    error::DapError,
    hub::{HookData, names},
    session::DebugSession,
};
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::sources";

/// Maintains the append-only table of loaded sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourcesManager;

impl Plugin for SourcesManager {
    fn name(&self) -> &'static str {
        "SourcesManager"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        log::debug!(target: LOG_TARGET, "Setting up SourcesManager");
        let hub = session.hub();

        hub.on(names::ON_NEW_SCRIPT, self.name(), |session, data| {
            if !session.is_attached() {
                return Ok(());
            }
            let HookData::Script { script, .. } = data else {
                return Ok(());
            };

            let host = session.host();
            let url = host.script_url(*script);
            log::debug!(target: LOG_TARGET, "New script loaded: {url}");
            let reference = session.register_source(&url, &host.script_source(*script).text);

            let body = LoadedSourceEventBody {
                reason: "new".to_string(),
                source: Source::reference(url, reference),
            };
            session.push_event("loadedSource", Some(to_body(&body)?));
            Ok(())
        });

        hub.on(names::ON_DEBUGGER_DETACHED, self.name(), |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger detached");
            session.reset_sources();
            Ok(())
        });

        hub.on(names::ON_DEBUGGER_ATTACHED, self.name(), |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger attached");
            session.reset_sources();
            for source in session.host().find_sources() {
                session.register_source(&source.url, &source.text);
            }
            Ok(())
        });

        session.register_command("loadedSources", |session, _| {
            if let Err(err) = session.require_attached() {
                log::error!(target: LOG_TARGET, "Debugger not attached, cannot handle loadedSources command");
                return Err(err);
            }

            log::info!(target: LOG_TARGET, "Handling loadedSources command");
            let origin = &session.config().origin;
            let sources = session
                .sources()
                .iter()
                .enumerate()
                .map(|(index, entry)| Source {
                    origin: Some(origin.clone()),
                    ..Source::reference(entry.path.clone(), index as i64 + 1)
                })
                .collect();
            Ok(Some(to_body(&LoadedSourcesResponseBody { sources })?))
        });

        session.register_command("source", |session, request| {
            if let Err(err) = session.require_attached() {
                log::error!(target: LOG_TARGET, "Debugger not attached, cannot handle source command");
                return Err(err);
            }

            let args: SourceArguments = request.parse_arguments()?;
            let reference = args.reference().unwrap_or(0);
            let content = usize::try_from(reference - 1)
                .ok()
                .and_then(|index| session.sources().get(index).map(|entry| entry.text.clone()));
            let Some(content) = content else {
                log::error!(target: LOG_TARGET, "Invalid source reference: {reference}");
                return Err(DapError::InvalidSourceReference(reference));
            };

            log::info!(target: LOG_TARGET, "Handling source command for reference: {reference}");
            Ok(Some(to_body(&SourceResponseBody { content })?))
        });
    }
}
