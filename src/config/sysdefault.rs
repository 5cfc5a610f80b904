//! System default configuration provider

use super::Configuration;
use figment::{providers::Serialized, Metadata, Provider};

/// A [`figment::Provider`](https://docs.rs/figment/latest/figment/trait.Provider.html) that holds
/// the hard-wired defaults
pub(super) struct SystemDefault {}

impl SystemDefault {
    const META_NAME: &'static str = "default";
}

impl Provider for SystemDefault {
    fn metadata(&self) -> Metadata {
        Metadata::named(Self::META_NAME)
    }

    fn data(
        &self,
    ) -> std::result::Result<
        figment::value::Map<figment::Profile, figment::value::Dict>,
        figment::Error,
    > {
        Serialized::defaults(Configuration::system_default()).data()
    }
}

#[cfg(test)]
mod test {
    use crate::config::{Configuration, Manager};
    use pretty_assertions::assert_eq;

    #[test]
    fn system_default() {
        let mut mgr = Manager::empty();
        mgr.apply_system_default();
        let cfg = mgr.get::<Configuration>().unwrap();
        assert_eq!(&cfg, Configuration::system_default());
    }
}
