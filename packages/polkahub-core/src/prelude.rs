// common types, re-exported by the main prelude
pub use crate::{
    account::{
        Account, AccountDetails, AccountGroup, AvailableAccounts, ProviderId, SerializableAccount,
    },
    context::HubContext,
    error::{HubError, Result},
    hub::{Balance, HubOptions, Identity, PolkaHub},
    persist::{FilePersistence, MemoryPersistence, PersistedState, PersistenceProvider, Storage},
    provider::{AccountProvider, Provider},
    providers::{
        ledger::{LedgerAccountInfo, LedgerBackend, LedgerDevice, LedgerProvider, NetworkInfo},
        multisig::{MultisigInfo, MultisigOptions, MultisigProvider},
        pjs_wallet::{
            ExtensionHost, InjectedAccount, InjectedExtension, PjsWalletOptions,
            PjsWalletProvider,
        },
        proxy::{ProxyInfo, ProxyOptions, ProxyProvider},
        read_only::{ReadOnlyOptions, ReadOnlyProvider},
        vault::{GenesisHash, MetadataProver, VaultAccountInfo, VaultOptions, VaultProvider},
        wallet_connect::{
            ConnectModal, PolkadotChain, WalletConnectClient, WalletConnectProvider,
            WalletConnectStatus,
        },
    },
    qr::{assemble_frames, create_frames},
    selected::{SelectedAccount, SelectedState},
};
