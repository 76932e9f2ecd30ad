use crate::{
    account::{Account, SerializableAccount},
    hub::PolkaHub,
    persist::PersistenceProvider,
    provider::Provider,
    task::{self, TaskGuard},
};
use futures::{
    future::{pending, select, Either},
    pin_mut, StreamExt,
};
use futures_signals::signal::{Mutable, Signal, SignalExt};
use parking_lot::Mutex;
use polkahub_config::HubConfig;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

#[derive(Debug, Clone, Default)]
pub enum SelectedState {
    #[default]
    Uninitialized,
    /// a persisted selection is being restored
    Restoring,
    None,
    Selected(Account),
}

impl SelectedState {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Selected(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::None | Self::Selected(_))
    }
}

/// The account the user is working with, persisted across restarts
///
/// Every change supersedes whatever earlier selection work is still in flight.
/// Once selected, the account is watched through its provider and deselected
/// when the provider stops listing it.
#[derive(Clone)]
pub struct SelectedAccount {
    inner: Arc<SelectedInner>,
}

struct SelectedInner {
    hub: PolkaHub,
    persist: Arc<dyn PersistenceProvider>,
    state: Mutable<SelectedState>,
    generation: Mutex<Generation>,
    restore_timeout: Duration,
}

#[derive(Default)]
struct Generation {
    id: u64,
    task: Option<TaskGuard>,
}

enum Save {
    Keep,
    Clear,
    Account(SerializableAccount),
}

impl SelectedAccount {
    pub fn new(hub: &PolkaHub, persist: Arc<dyn PersistenceProvider>, config: &HubConfig) -> Self {
        let persisted = persist.load();
        let inner = Arc::new(SelectedInner {
            hub: hub.clone(),
            persist,
            state: Mutable::new(SelectedState::Uninitialized),
            generation: Mutex::new(Generation::default()),
            restore_timeout: config.restore_timeout(),
        });

        let persisted = persisted.and_then(|s| {
            serde_json::from_str::<Option<SerializableAccount>>(&s)
                .unwrap_or_else(|e| {
                    tracing::warn!("ignoring unreadable selected account: {e}");
                    None
                })
        });

        match persisted {
            None => inner.state.set(SelectedState::None),
            Some(serialized) => {
                inner.state.set(SelectedState::Restoring);
                let mut generation = inner.generation.lock();
                generation.id += 1;
                generation.task = Some(task::spawn(restore(
                    Arc::downgrade(&inner),
                    generation.id,
                    hub.clone(),
                    serialized,
                )));
            }
        }

        Self { inner }
    }

    pub fn set_account(&self, account: Option<Account>) {
        let inner = &self.inner;
        let mut generation = inner.generation.lock();
        generation.id += 1;
        generation.task = None;

        let Some(account) = account else {
            inner.save(Save::Clear);
            inner.state.set(SelectedState::None);
            return;
        };

        let provider = inner.hub.plugin(account.provider.as_str());
        match &provider {
            Some(provider) => {
                inner.save(Save::Account(provider.serialize(&account)));
                inner.state.set(SelectedState::Selected(account.clone()));
            }
            None => {
                tracing::warn!(
                    "selected {} but provider {} isn't registered",
                    account.address,
                    account.provider
                );
                inner.state.set(SelectedState::None);
            }
        }

        generation.task = Some(task::spawn(track(
            Arc::downgrade(inner),
            generation.id,
            inner.hub.clone(),
            account,
            provider,
        )));
    }

    pub fn state(&self) -> SelectedState {
        self.inner.state.get_cloned()
    }

    pub fn state_signal(&self) -> impl Signal<Item = SelectedState> {
        self.inner.state.signal_cloned()
    }

    pub fn selected(&self) -> Option<Account> {
        self.inner.state.lock_ref().account().cloned()
    }

    pub fn selected_signal(&self) -> impl Signal<Item = Option<Account>> {
        self.inner.state.signal_ref(|state| state.account().cloned())
    }

    /// Waits until restoration (if any) has finished
    pub async fn resolved(&self) -> SelectedState {
        self.inner
            .state
            .signal_ref(|state| state.is_resolved())
            .wait_for(true)
            .await;
        self.state()
    }
}

impl SelectedInner {
    fn save(&self, save: Save) {
        match save {
            Save::Keep => {}
            Save::Clear => self.persist.save(None),
            Save::Account(account) => match serde_json::to_string(&account) {
                Ok(s) => self.persist.save(Some(&s)),
                Err(e) => tracing::warn!("can't persist selected account: {e}"),
            },
        }
    }

    /// Applies the change only if no newer selection happened meanwhile
    fn commit(&self, generation: u64, state: SelectedState, save: Save) -> bool {
        let current = self.generation.lock();
        if current.id != generation {
            return false;
        }
        self.save(save);
        self.state.set(state);
        true
    }
}

async fn restore(
    weak: Weak<SelectedInner>,
    generation: u64,
    hub: PolkaHub,
    serialized: SerializableAccount,
) {
    let Some(timeout) = weak.upgrade().map(|inner| inner.restore_timeout) else {
        return;
    };

    let provider = hub.wait_for_plugin(serialized.provider.clone(), timeout).await;
    let account = match &provider {
        Some(provider) => provider.deserialize(&serialized).await,
        None => {
            tracing::warn!(
                "provider {} of the selected account didn't show up in time",
                serialized.provider
            );
            None
        }
    };

    let Some(inner) = weak.upgrade() else {
        return;
    };
    let Some(account) = account else {
        inner.commit(generation, SelectedState::None, Save::Keep);
        return;
    };

    tracing::debug!("restored selected account {}", account.address);
    if !inner.commit(generation, SelectedState::Selected(account.clone()), Save::Keep) {
        return;
    }
    drop(inner);

    track(weak, generation, hub, account, provider).await;
}

/// Follows the provider of a selected account: deselects (without forgetting)
/// while the provider is gone and reselects when it comes back
async fn track(
    weak: Weak<SelectedInner>,
    generation: u64,
    hub: PolkaHub,
    account: Account,
    mut current: Option<Provider>,
) {
    let mut plugin = hub.plugin_signal(account.provider.clone()).to_stream().boxed();

    loop {
        let next = match &current {
            None => plugin.next().await,
            Some(provider) => {
                let removed = wait_for_removal(provider, &account);
                pin_mut!(removed);
                match select(plugin.next(), removed).await {
                    Either::Left((next, _)) => next,
                    Either::Right(((), _)) => {
                        tracing::debug!("selected account {} was removed", account.address);
                        if let Some(inner) = weak.upgrade() {
                            inner.commit(generation, SelectedState::None, Save::Clear);
                        }
                        return;
                    }
                }
            }
        };

        let Some(next) = next else {
            return;
        };
        if same_provider(&current, &next) {
            continue;
        }

        let Some(inner) = weak.upgrade() else {
            return;
        };
        let (state, save) = match &next {
            Some(provider) => (
                SelectedState::Selected(account.clone()),
                Save::Account(provider.serialize(&account)),
            ),
            None => (SelectedState::None, Save::Keep),
        };
        if !inner.commit(generation, state, save) {
            return;
        }
        current = next;
    }
}

fn same_provider(a: &Option<Provider>, b: &Option<Provider>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.ptr_eq(b),
        (None, None) => true,
        _ => false,
    }
}

// The first list is the one the account was picked from, so it never counts
async fn wait_for_removal(provider: &Provider, account: &Account) {
    let mut accounts = provider.accounts().skip(1);

    while let Some(item) = accounts.next().await {
        match item {
            Ok(accounts) => {
                if !accounts.iter().any(|a| provider.accounts_eq(a, account)) {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!("can't check selected account against {}: {e}", provider.id());
            }
        }
    }

    pending::<()>().await
}
