//! Process-wide bridge installation.
//!
//! Native engine callbacks are plain C function pointers and carry no
//! closure state, so the [`crate::ffi`] trampolines find the bridge here.
//! Only one bridge can be installed at a time.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use tonbridge_core::{BridgeError, BridgeResult};

use crate::bridge::Bridge;

static INSTALLED: RwLock<Option<Arc<Bridge>>> = RwLock::new(None);

fn read() -> RwLockReadGuard<'static, Option<Arc<Bridge>>> {
    INSTALLED.read().unwrap_or_else(|e| {
        warn!("Installed bridge lock poisoned, recovering");
        e.into_inner()
    })
}

fn write() -> RwLockWriteGuard<'static, Option<Arc<Bridge>>> {
    INSTALLED.write().unwrap_or_else(|e| {
        warn!("Installed bridge lock poisoned, recovering");
        e.into_inner()
    })
}

/// Make `bridge` the target of native engine callbacks.
///
/// # Errors
///
/// Returns [`BridgeError::AlreadyInstalled`] if a bridge is installed.
pub fn install(bridge: Arc<Bridge>) -> BridgeResult<()> {
    let mut slot = write();
    if slot.is_some() {
        return Err(BridgeError::AlreadyInstalled);
    }
    *slot = Some(bridge);
    info!("Installed process-wide bridge");
    Ok(())
}

/// The installed bridge, if any.
///
/// The lock is released before this returns, so callers never hold it
/// while dispatching.
#[must_use]
pub fn installed() -> Option<Arc<Bridge>> {
    read().clone()
}

/// Whether a bridge is installed.
#[must_use]
pub fn is_installed() -> bool {
    read().is_some()
}

/// Remove the installed bridge and shut it down.
///
/// Returns the number of correlation entries that were still live. Native
/// callbacks that arrive afterwards are dropped.
///
/// # Errors
///
/// Returns [`BridgeError::NotInstalled`] if no bridge is installed.
pub fn uninstall() -> BridgeResult<usize> {
    let bridge = write().take().ok_or(BridgeError::NotInstalled)?;
    info!("Uninstalled process-wide bridge");
    Ok(bridge.shutdown())
}
