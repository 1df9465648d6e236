//! Feature plugins.
//!
//! A plugin owns one feature of the bridge. Installing it registers its
//! hook subscribers on the [`EventHub`](crate::EventHub) and its commands on
//! the [`ProtocolHandler`](crate::ProtocolHandler). Plugins never call each
//! other; they communicate only through hooks and the shared session.

pub mod attach;
pub mod breakpoints;
pub mod commands;
pub mod frames;
pub mod inspector;
pub mod sources;

use crate::session::DebugSession;
use std::rc::Rc;

pub use attach::AttachManager;
pub use breakpoints::BreakpointManager;
pub use commands::DapCommands;
pub use frames::FrameManager;
pub use inspector::InspectorManager;
pub use sources::SourcesManager;

/// A feature module of the bridge.
pub trait Plugin {
    /// The name used as the subscriber source in the hub.
    fn name(&self) -> &'static str;

    /// Registers the plugin's hooks and commands.
    fn install(self: Rc<Self>, session: &DebugSession);
}

/// The plugins of one debugger.
///
/// The managers owning per-session tables are kept by type so the host
/// application can inspect them.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    breakpoints: Rc<BreakpointManager>,
    frames: Rc<FrameManager>,
    inspector: Rc<InspectorManager>,
}

impl PluginSet {
    /// Every plugin, in dependency order.
    ///
    /// Hooks run in registration order, so a plugin reacting to the same hook
    /// as an earlier one observes the earlier plugin's effects.
    pub fn plugins(&self) -> Vec<Rc<dyn Plugin>> {
        let plugins: [Rc<dyn Plugin>; 6] = [
            Rc::new(AttachManager),
            Rc::new(SourcesManager),
            self.breakpoints.clone(),
            self.frames.clone(),
            self.inspector.clone(),
            Rc::new(DapCommands),
        ];
        plugins.into()
    }

    /// Installs every plugin on `session`.
    pub fn install(&self, session: &DebugSession) {
        for plugin in self.plugins() {
            log::debug!(target: "dapbridge", "Loading plugin {}", plugin.name());
            plugin.install(session);
        }
    }

    /// The breakpoint records.
    pub fn breakpoints(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    /// The frame decorations.
    pub fn frames(&self) -> &FrameManager {
        &self.frames
    }

    /// The variable-reference table.
    pub fn inspector(&self) -> &InspectorManager {
        &self.inspector
    }
}
