//! Breakpoints.
//!
//! Breakpoints are recorded per source and resolved against the compiled
//! scripts of that source. A script may contain nested function scripts
//! that the engine compiles independently, so resolution walks the whole
//! script tree breadth first and binds each line to the first offset found.
//! Because scripts compile lazily, every newly compiled script of a known
//! source is resolved again.

use super::Plugin;
use crate::{
    dap::{
        Breakpoint, BreakpointEventBody, SetBreakpointsArguments, SetBreakpointsResponseBody,
        Source, to_body,
    },
    error::DapError,
    hub::{HookData, names},
    native::{DebugHost, ScriptId},
    session::DebugSession,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::breakpoints";

const NO_OFFSET: &str = "No offset found";
const BREAKPOINT_SET: &str = "Breakpoint set";

/// Lines per record before ids collide with the next record's.
const IDS_PER_RECORD: usize = 1000;

/// The state of one requested breakpoint line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointLine {
    /// The requested line.
    pub line: u32,
    /// `true` once bound to an offset.
    pub verified: bool,
    /// Why the line is or is not verified.
    pub message: String,
}

impl BreakpointLine {
    fn unresolved(line: u32) -> Self {
        Self {
            line,
            verified: false,
            message: NO_OFFSET.to_string(),
        }
    }
}

/// The breakpoints requested for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRecord {
    /// The source name sent by the client, if any.
    pub name: Option<String>,
    /// The source url.
    pub url: String,
    /// The requested lines, in request order.
    pub lines: Vec<BreakpointLine>,
}

/// The protocol id of line `line_index` of record `record_index` (0-based).
pub fn breakpoint_id(record_index: usize, line_index: usize) -> i64 {
    ((record_index + 1) * IDS_PER_RECORD + line_index) as i64
}

/// Owns the breakpoint table.
#[derive(Debug, Default)]
pub struct BreakpointManager {
    records: RefCell<Vec<BreakpointRecord>>,
}

impl BreakpointManager {
    /// A snapshot of the breakpoint table.
    pub fn records(&self) -> Vec<BreakpointRecord> {
        self.records.borrow().clone()
    }

    /// Replaces the lines of the record keyed by `(name, url)`, or by `url`
    /// alone when no name is given, creating it if needed. Returns the
    /// 0-based record index.
    fn create_or_update(&self, name: Option<&str>, url: &str, lines: &[u32]) -> usize {
        let lines: Vec<BreakpointLine> = lines.iter().copied().map(BreakpointLine::unresolved).collect();
        if lines.len() >= IDS_PER_RECORD {
            log::warn!(
                target: LOG_TARGET,
                "{} breakpoints requested for {url}, ids will collide with the next source",
                lines.len()
            );
        }

        let mut records = self.records.borrow_mut();
        let existing = records
            .iter()
            .position(|record| name.is_none_or(|name| record.name.as_deref() == Some(name)) && record.url == url);
        match existing {
            Some(index) => {
                records[index].lines = lines;
                index
            }
            None => {
                records.push(BreakpointRecord {
                    name: name.map(str::to_string),
                    url: url.to_string(),
                    lines,
                });
                records.len() - 1
            }
        }
    }

    /// Resolves every record of `url` against `scripts`, or against every
    /// script loaded from `url` when `scripts` is `None`.
    ///
    /// The installed breakpoints of those scripts are replaced by the lines
    /// of all the url's records. Returns the indices of the resolved records,
    /// empty if there is no record or no script.
    fn resolve(&self, host: &dyn DebugHost, url: &str, scripts: Option<Vec<ScriptId>>) -> Vec<usize> {
        let indices: Vec<usize> = self
            .records
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, record)| record.url == url)
            .map(|(index, _)| index)
            .collect();
        if indices.is_empty() {
            return indices;
        }

        let scripts = scripts.unwrap_or_else(|| host.find_scripts(url));
        if scripts.is_empty() {
            return Vec::new();
        }
        log::trace!(target: LOG_TARGET, "Found {} scripts for path: {url}", scripts.len());

        walk_script_tree(host, &scripts, |script| {
            host.clear_breakpoints(script);
            true
        });

        for &index in &indices {
            let lines: Vec<u32> = self.records.borrow()[index].lines.iter().map(|l| l.line).collect();
            let resolved: Vec<BreakpointLine> = lines
                .into_iter()
                .map(|line| install_line(host, url, &scripts, line))
                .collect();
            if let Some(record) = self.records.borrow_mut().get_mut(index) {
                record.lines = resolved;
            }
        }
        indices
    }

    /// The protocol view of every line of a record.
    fn describe(&self, session: &DebugSession, index: usize, pending_reason: bool) -> Vec<Breakpoint> {
        let records = self.records.borrow();
        let Some(record) = records.get(index) else {
            return Vec::new();
        };
        let reference = session.source_reference(&record.url);

        record
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| Breakpoint {
                id: Some(breakpoint_id(index, i)),
                verified: line.verified,
                reason: (pending_reason && !line.verified).then(|| "pending".to_string()),
                message: (!pending_reason || !line.verified).then(|| line.message.clone()),
                source: Some(Source::reference(record.url.clone(), reference)),
                line: Some(i64::from(line.line)),
            })
            .collect()
    }

    fn on_new_script(&self, session: &DebugSession, script: ScriptId) {
        let host = session.host();
        let url = host.script_url(script);
        let indices = self.resolve(host, &url, Some(vec![script]));
        if indices.is_empty() {
            return;
        }

        log::debug!(target: LOG_TARGET, "Re-resolved breakpoints for script: {url}");
        let breakpoints = indices.into_iter().flat_map(|index| self.describe(session, index, false));
        for breakpoint in breakpoints {
            let body = BreakpointEventBody {
                reason: "changed".to_string(),
                breakpoint,
            };
            match to_body(&body) {
                Ok(body) => session.push_event("breakpoint", Some(body)),
                Err(err) => log::error!(target: LOG_TARGET, "Failed to build breakpoint event: {err}"),
            }
        }
    }
}

/// Installs `line` on the first script of the `scripts` trees offering an
/// offset for it.
fn install_line(host: &dyn DebugHost, url: &str, scripts: &[ScriptId], line: u32) -> BreakpointLine {
    let mut state = BreakpointLine::unresolved(line);
    log::debug!(target: LOG_TARGET, "Setting breakpoint at {url}:{line}");

    walk_script_tree(host, scripts, |script| {
        let Some(&offset) = host.possible_breakpoint_offsets(script, line).first() else {
            return true;
        };
        match host.set_breakpoint(script, offset) {
            Ok(()) => {
                log::debug!(target: LOG_TARGET, "Set breakpoint at offset {offset} of {script}");
                state.verified = true;
                state.message = BREAKPOINT_SET.to_string();
            }
            Err(err) => {
                log::error!(target: LOG_TARGET, "Failed to set breakpoint at {url}:{line}: {err}");
                state.message = err.to_string();
            }
        }
        false
    });
    state
}

/// Visits `roots` and their nested scripts breadth first until `visit`
/// returns `false`.
fn walk_script_tree(host: &dyn DebugHost, roots: &[ScriptId], mut visit: impl FnMut(ScriptId) -> bool) {
    let mut queue: VecDeque<ScriptId> = roots.iter().copied().collect();
    while let Some(script) = queue.pop_front() {
        if !visit(script) {
            return;
        }
        queue.extend(host.child_scripts(script));
        log::trace!(target: LOG_TARGET, "Queue length: {}", queue.len());
    }
}

impl Plugin for BreakpointManager {
    fn name(&self) -> &'static str {
        "BreakpointManager"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        log::debug!(target: LOG_TARGET, "Setting up BreakpointManager");
        let hub = session.hub();
        hub.register_hook_name(names::ON_BREAKPOINT, self.name());

        let manager = Rc::clone(&self);
        hub.on(names::ON_NEW_SCRIPT, self.name(), move |session, data| {
            if !session.is_attached() {
                return Ok(());
            }
            if let HookData::Script { script, .. } = data {
                manager.on_new_script(session, *script);
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        hub.on(names::ON_DEBUGGER_DETACHED, self.name(), move |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger detached");
            session.host().clear_all_breakpoints();
            manager.records.borrow_mut().clear();
            Ok(())
        });

        hub.on(names::ON_BREAKPOINT, self.name(), |session, data| {
            if let Some(frame) = data.frame() {
                session.stop_in_frame(frame, "breakpoint", "Paused on breakpoint");
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        session.register_command("setBreakpoints", move |session, request| {
            let args: SetBreakpointsArguments = request.parse_arguments()?;
            let Some(path) = args.source.path.as_deref().filter(|path| !path.is_empty()) else {
                log::error!(target: LOG_TARGET, "Invalid source path or name");
                return Err(DapError::MissingSourcePath);
            };
            log::debug!(target: LOG_TARGET, "Handling setBreakpoints command for source: {path}");

            let lines: Vec<u32> = args
                .breakpoints
                .iter()
                .map(|bp| u32::try_from(bp.line).unwrap_or(0))
                .collect();
            let index = manager.create_or_update(args.source.name.as_deref(), path, &lines);
            manager.resolve(session.host(), path, None);

            let breakpoints = manager.describe(session, index, true);
            Ok(Some(to_body(&SetBreakpointsResponseBody { breakpoints })?))
        });
    }
}
