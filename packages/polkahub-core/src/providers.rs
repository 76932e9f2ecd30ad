pub mod ledger;
pub mod multisig;
pub mod pjs_wallet;
pub mod proxy;
pub mod read_only;
pub mod vault;
pub mod wallet_connect;

use crate::{
    account::{Account, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    provider::Provider,
    task,
};
use futures::{
    future::{ready, BoxFuture},
    stream::BoxStream,
    Future, FutureExt, StreamExt,
};
use futures_signals::{
    map_ref,
    signal::{Mutable, Signal, SignalExt},
};
use polkahub_signer::Signer;
use std::{sync::Arc, time::Duration};

/// Accounts stream for providers that only ever have one group
pub(crate) fn single_group<S>(id: ProviderId, accounts: S) -> BoxStream<'static, Result<Vec<AccountGroup>>>
where
    S: Signal<Item = Vec<Account>> + Send + 'static,
{
    accounts
        .to_stream()
        .map(move |accounts| Ok(vec![AccountGroup::new(id.clone(), accounts)]))
        .boxed()
}

/// Waits until a provider with this id is in the list, giving up after `timeout`
pub(crate) async fn wait_for_provider(
    plugins: &Mutable<Vec<Provider>>,
    id: &ProviderId,
    timeout: Duration,
) -> Option<Provider> {
    let id = id.clone();
    let mut found = plugins
        .signal_ref(move |plugins| plugins.iter().find(|p| p.id() == id).cloned())
        .to_stream()
        .filter_map(ready);

    task::timeout(timeout, found.next()).await.flatten()
}

/// The signer of an account held by another provider
/// Any failure along the way means no signer, never an error
pub(crate) async fn resolve_parent_signer(
    plugins: &Mutable<Vec<Provider>>,
    parent: &SerializableAccount,
    timeout: Duration,
) -> Option<Arc<dyn Signer>> {
    let Some(provider) = wait_for_provider(plugins, &parent.provider, timeout).await else {
        tracing::warn!(
            "parent provider {} for {} never showed up",
            parent.provider,
            parent.address
        );
        return None;
    };

    match provider.deserialize(parent).await {
        Some(account) => account.signer,
        None => {
            tracing::warn!(
                "parent account {} can't be restored by {}",
                parent.address,
                parent.provider
            );
            None
        }
    }
}

/// Groups of a derived provider, which only has accounts once they've been resolved
pub(crate) fn resolved_group(
    id: ProviderId,
    accounts: &Mutable<Option<Vec<Account>>>,
) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
    accounts
        .signal_cloned()
        .to_stream()
        .filter_map(ready)
        .map(move |accounts| Ok(vec![AccountGroup::new(id.clone(), accounts)]))
        .boxed()
}

/// Re-resolves the accounts of a derived provider whenever its own list or the
/// provider set changes. A newer change cancels the resolution still in flight.
pub(crate) fn resolve_on_change<T, S, F, Fut>(
    infos: S,
    plugins: &Mutable<Vec<Provider>>,
    accounts: Mutable<Option<Vec<Account>>>,
    resolve: F,
) -> BoxFuture<'static, Result<()>>
where
    T: Clone + Send + Sync + 'static,
    S: Signal<Item = Vec<T>> + Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Vec<Account>> + Send + 'static,
{
    let changes = map_ref! {
        let infos = infos,
        let _plugins = plugins.signal_ref(|_| ()) => infos.clone()
    };

    changes
        .map_future(resolve)
        .for_each(move |resolved| {
            if let Some(resolved) = resolved {
                accounts.set(Some(resolved));
            }
            ready(())
        })
        .map(Ok)
        .boxed()
}
