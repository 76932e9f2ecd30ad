use crate::{
    hub::{HubOptions, PolkaHub},
    persist::Storage,
    provider::Provider,
    selected::SelectedAccount,
};
use polkahub_config::HubConfig;

/// A hub and its selection, bound to one application surface
///
/// Dropping the context tears the hub down.
pub struct HubContext {
    pub id: String,
    pub hub: PolkaHub,
    pub selected: SelectedAccount,
}

impl HubContext {
    pub fn mount(
        id: impl Into<String>,
        plugins: Vec<Provider>,
        options: HubOptions,
        storage: &Storage,
        config: &HubConfig,
    ) -> Self {
        let id = id.into();
        tracing::debug!("mounting hub context {id}");

        let hub = PolkaHub::new(plugins, options);
        let selected = SelectedAccount::new(
            &hub,
            storage.persistence(&config.storage_keys.selected_account),
            config,
        );

        Self { id, hub, selected }
    }
}

impl Drop for HubContext {
    fn drop(&mut self) {
        tracing::debug!("unmounting hub context {}", self.id);
        self.hub.destroy();
    }
}
