use anyhow::{Context, Result};
use polkahub::prelude::*;
use std::path::PathBuf;

/// The providers a terminal can offer, over file-backed storage
pub struct CliApp {
    pub config: HubConfig,
    pub storage_dir: PathBuf,
    pub read_only: ReadOnlyProvider,
    pub multisig: MultisigProvider,
    pub proxy: ProxyProvider,
    pub context: HubContext,
}

impl CliApp {
    /// `storage_dir` falls back to the config, then to the platform data dir
    pub fn new(config: HubConfig, storage_dir: Option<PathBuf>) -> Result<Self> {
        let storage_dir = match storage_dir.or_else(|| config.storage_dir.clone()) {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("no storage dir configured and no platform data dir")?
                .join("polkahub"),
        };
        tracing::debug!("using storage at {}", storage_dir.display());

        let storage = Storage::directory(&storage_dir);
        let keys = &config.storage_keys;

        let read_only = ReadOnlyProvider::new(
            storage.persistence(&keys.read_only),
            ReadOnlyOptions { fake_signer: true },
        );
        let multisig = MultisigProvider::new(
            storage.persistence(&keys.multisig),
            MultisigOptions::from(&config),
        );
        let proxy = ProxyProvider::new(storage.persistence(&keys.proxy), ProxyOptions::from(&config));

        let context = HubContext::mount(
            "cli",
            vec![
                read_only.clone().into(),
                multisig.clone().into(),
                proxy.clone().into(),
            ],
            HubOptions::default(),
            &storage,
            &config,
        );

        Ok(Self {
            config,
            storage_dir,
            read_only,
            multisig,
            proxy,
            context,
        })
    }

    pub fn provider(&self, id: &str) -> Result<Provider> {
        self.context
            .hub
            .plugin(id)
            .with_context(|| format!("unknown provider {id}"))
    }

    /// An account as its provider would hand it out
    pub async fn account(&self, provider: &str, address: AccountAddress) -> Result<Account> {
        let serialized = SerializableAccount::new(provider, address.clone());
        self.provider(provider)?
            .deserialize(&serialized)
            .await
            .with_context(|| format!("{provider} doesn't know {address}"))
    }
}
