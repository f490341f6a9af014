use crate::sdk::metrics::{Meter, MeterProvider};
use std::borrow::Cow;
use std::sync::{PoisonError, RwLock};

lazy_static::lazy_static! {
    /// The global `Meter` provider singleton.
    static ref GLOBAL_METER_PROVIDER: RwLock<MeterProvider> = RwLock::new(MeterProvider::default());
}

/// Sets the given [`MeterProvider`] instance as the current global provider.
///
/// Meters obtained from the previous provider keep recording into it.
pub fn set_meter_provider(new_provider: MeterProvider) {
    let mut global_provider = GLOBAL_METER_PROVIDER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *global_provider = new_provider;
}

/// Returns a clone of the current global provider. Until one is set this is
/// a provider without readers, whose instruments record nothing.
pub fn meter_provider() -> MeterProvider {
    GLOBAL_METER_PROVIDER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// The meter of the scope `name` from the global provider.
pub fn meter<T: Into<Cow<'static, str>>>(name: T) -> Meter {
    meter_provider().meter(name)
}
