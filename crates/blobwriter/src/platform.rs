//! Host platform detection and native-transport selection.

use std::fmt;
use std::sync::Arc;

use blobwriter_transport::{NativeTransport, UnavailableTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
    Desktop,
    Web,
}

impl Platform {
    /// The native platform this binary was compiled for. `Web` is never
    /// detected; browser hosts pass it to [`select_transport`] themselves.
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }

    /// Browsers have no local server to talk to.
    pub fn supports_native_transport(&self) -> bool {
        !matches!(self, Platform::Web)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Desktop => "desktop",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the transport for `platform`.
///
/// Returns `native` when the platform can host one and it was supplied,
/// otherwise an [`UnavailableTransport`] that makes the orchestrator go
/// straight to the bridge writer.
pub fn select_transport(
    platform: Platform,
    native: Option<Arc<dyn NativeTransport>>,
) -> Arc<dyn NativeTransport> {
    match native {
        Some(transport) if platform.supports_native_transport() => transport,
        _ => Arc::new(UnavailableTransport::new(platform.name())),
    }
}
