//! Process-wide activation lifecycle.
//!
//! Hosts that drive injection through separate init / read / finalize calls
//! use these free functions. They share one [`Injector`], built from the
//! default config the first time any of them runs unless [`install`] put one
//! in place first.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::controller::Injector;

static SESSION: Lazy<Mutex<Option<Injector>>> = Lazy::new(|| Mutex::new(None));

/// Run `f` against the session injector, creating it on first use.
pub fn with_injector<R>(f: impl FnOnce(&mut Injector) -> R) -> R {
    let mut session = SESSION.lock();
    let injector = session.get_or_insert_with(Injector::default);
    f(injector)
}

/// Replace the session injector, returning the previous one.
pub fn install(injector: Injector) -> Option<Injector> {
    SESSION.lock().replace(injector)
}

/// Activate with a primary bundle and a JSON array of extra bundles.
pub fn initialize(primary: &str, extra_json: &str) -> String {
    with_injector(|injector| injector.initialize(primary, extra_json))
}

/// Last computed status.
pub fn current_status() -> String {
    with_injector(|injector| injector.current_status().to_string())
}

/// Tear down the session's injection.
pub fn finalize() {
    with_injector(Injector::finalize)
}
