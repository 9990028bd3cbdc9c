//! Addon kinds and the registration context.
//!
//! An addon is a registered factory capable of producing extension (or
//! extension-group) instances on demand. Registration callbacks receive
//! an opaque [`RegisterCtx`] and hand created instances back through
//! it; the runtime drains the context afterwards.

use crate::Extension;
use serde::{Deserialize, Serialize};

/// The kind of thing an addon produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddonKind {
    /// Produces extension instances.
    Extension,
    /// Produces extension-group instances.
    ExtensionGroup,
    /// Produces protocol implementations.
    Protocol,
}

impl AddonKind {
    /// A short lowercase tag, used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::ExtensionGroup => "extension_group",
            Self::Protocol => "protocol",
        }
    }
}

impl std::fmt::Display for AddonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registration callback, invoked at most once when its addon is
/// instantiated.
pub type RegisterFn = Box<dyn FnOnce(&mut RegisterCtx) + Send>;

/// An extension instance handed over during registration, together
/// with the group it should be hosted in.
pub struct InstalledExtension {
    /// Hosting extension group.
    pub group: String,
    /// Extension name within the group.
    pub name: String,
    /// The created instance.
    pub extension: Box<dyn Extension>,
}

/// Opaque context a registration callback writes its products into.
///
/// The callback side only appends; the runtime side drains.
pub struct RegisterCtx {
    app_uri: String,
    installed: Vec<InstalledExtension>,
}

impl RegisterCtx {
    /// Creates a context for registrations into the given app.
    #[must_use]
    pub fn new(app_uri: impl Into<String>) -> Self {
        Self {
            app_uri: app_uri.into(),
            installed: Vec::new(),
        }
    }

    /// URI of the app the addon is being registered into.
    #[must_use]
    pub fn app_uri(&self) -> &str {
        &self.app_uri
    }

    /// Hands a created extension instance over to the runtime.
    pub fn install_extension(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        extension: Box<dyn Extension>,
    ) {
        self.installed.push(InstalledExtension {
            group: group.into(),
            name: name.into(),
            extension,
        });
    }

    /// Number of instances handed over so far.
    #[must_use]
    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }

    /// Drains the handed-over instances, runtime side.
    pub fn drain_installed(&mut self) -> Vec<InstalledExtension> {
        std::mem::take(&mut self.installed)
    }
}
